use std::collections::HashSet;
use std::sync::Arc;

use stream_api::ReplayId;

use crate::config::{ReconnectConfig, StreamConfig};
use crate::credentials::Credentials;
use crate::error::EngineError;
use crate::replay::ReplayPolicy;

/// Immutable startup context shared by every component.
///
/// Constructed once from [`StreamConfig`] before any network call; all
/// consistency checks that do not need the remote service happen here.
#[derive(Debug)]
pub struct StreamContext {
    version: String,
    integration_name: String,
    credentials: Arc<Credentials>,
    replay: ReplayPolicy,
    topics: Vec<String>,
    num_requested: u32,
    fan_in_capacity: usize,
    reconnect: ReconnectConfig,
}

impl StreamContext {
    pub fn from_config(config: &StreamConfig) -> Result<Self, EngineError> {
        if config.is_template {
            return Err(EngineError::Config(
                "is_template = true: fill in the template before starting".into(),
            ));
        }

        let credentials = Credentials::resolve(&config.event_stream.auth)?;

        let sub = &config.subscription;
        let replay_id = match sub.replay_id.as_deref() {
            Some(encoded) => {
                let id = ReplayId::from_base64(encoded)
                    .map_err(|e| EngineError::Config(format!("subscription.replay_id: {e}")))?;
                if id.is_empty() {
                    return Err(EngineError::Config("subscription.replay_id is empty".into()));
                }
                Some(id)
            }
            None => None,
        };
        let replay = ReplayPolicy::new(sub.replay_preset, replay_id)?;

        if sub.topics.is_empty() {
            return Err(EngineError::Config("subscription.topics is empty".into()));
        }
        let mut seen = HashSet::new();
        for topic in &sub.topics {
            if topic.trim().is_empty() {
                return Err(EngineError::Config("subscription.topics contains an empty name".into()));
            }
            if !seen.insert(topic.as_str()) {
                return Err(EngineError::Config(format!(
                    "subscription.topics lists '{topic}' more than once"
                )));
            }
        }

        if sub.num_requested == 0 {
            return Err(EngineError::Config("subscription.num_requested must be positive".into()));
        }
        if sub.fan_in_capacity == 0 {
            return Err(EngineError::Config("subscription.fan_in_capacity must be positive".into()));
        }
        sub.reconnect
            .validate()
            .map_err(|e| EngineError::Config(format!("subscription.reconnect: {e}")))?;

        Ok(Self {
            version: config.version.clone(),
            integration_name: config.event_stream.integration_name.clone(),
            credentials: Arc::new(credentials),
            replay,
            topics: sub.topics.clone(),
            num_requested: sub.num_requested,
            fan_in_capacity: sub.fan_in_capacity,
            reconnect: sub.reconnect.clone(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn integration_name(&self) -> &str {
        &self.integration_name
    }

    pub fn credentials(&self) -> &Arc<Credentials> {
        &self.credentials
    }

    pub fn replay(&self) -> &ReplayPolicy {
        &self.replay
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn num_requested(&self) -> u32 {
        self.num_requested
    }

    pub fn fan_in_capacity(&self) -> usize {
        self.fan_in_capacity
    }

    pub fn reconnect(&self) -> &ReconnectConfig {
        &self.reconnect
    }
}
