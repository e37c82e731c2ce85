use stream_api::PubSubClient;

use crate::error::PreflightError;

/// Check that every topic exists and is subscribable.
///
/// All-or-nothing: the first failing topic aborts startup and no worker is
/// spawned, not even for topics that already passed.
pub async fn check_topics(client: &dyn PubSubClient, topics: &[String]) -> Result<(), PreflightError> {
    for topic in topics {
        tracing::info!(%topic, "looking up topic");
        let info = client
            .get_topic_info(topic)
            .await
            .map_err(|source| PreflightError::Lookup {
                topic: topic.clone(),
                source,
            })?;

        if !info.can_subscribe {
            return Err(PreflightError::NotSubscribable(topic.clone()));
        }
        tracing::debug!(%topic, "topic is subscribable");
    }
    Ok(())
}
