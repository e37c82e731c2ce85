use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use stream_api::PubSubClient;

use crate::context::StreamContext;
use crate::error::EngineError;
use crate::preflight;
use crate::receiver::{NormalizingReceiver, RECEIVER_ID};
use crate::worker::{SubscriptionWorker, TopicSubscription};

/// Per-topic join handle.
struct WorkerSlot {
    topic: String,
    handle: JoinHandle<TopicSubscription>,
}

/// The running engine: one subscription worker per topic plus the
/// receiver end of their shared fan-in channel.
pub struct Engine {
    workers: Vec<WorkerSlot>,
    receiver: Option<NormalizingReceiver>,
    token: CancellationToken,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("topics", &self.topics())
            .field("receiver_taken", &self.receiver.is_none())
            .finish()
    }
}

impl Engine {
    /// Bring the engine up.
    ///
    /// 1. Authenticate and fetch user info.
    /// 2. Preflight every topic (all-or-nothing).
    /// 3. Spawn one worker per topic, all feeding one fan-in channel.
    ///
    /// Any failure returns before a single worker is spawned.
    pub async fn bootstrap(
        ctx: Arc<StreamContext>,
        client: Arc<dyn PubSubClient>,
        token: CancellationToken,
    ) -> Result<Self, EngineError> {
        // --- 1. Auth ---
        tracing::info!(integration = %ctx.integration_name(), "populating auth token");
        client.authenticate().await?;
        tracing::info!("populating user info");
        client.fetch_user_info().await?;

        // --- 2. Preflight ---
        preflight::check_topics(client.as_ref(), ctx.topics()).await?;

        // --- 3. Workers ---
        let (fan_in_tx, fan_in_rx) = mpsc::channel(ctx.fan_in_capacity());
        let replay = ctx.replay();
        let mut workers = Vec::with_capacity(ctx.topics().len());
        for topic in ctx.topics() {
            let subscription =
                TopicSubscription::new(topic.clone(), replay.preset(), replay.replay_id().cloned());
            let worker = SubscriptionWorker::new(
                subscription,
                client.clone(),
                fan_in_tx.clone(),
                ctx.reconnect().clone(),
                ctx.num_requested(),
                token.child_token(),
            );
            workers.push(WorkerSlot {
                topic: topic.clone(),
                handle: worker.spawn(),
            });
            tracing::info!(%topic, "spawned subscription worker");
        }
        // Only workers hold senders: the receiver sees the channel close
        // once all of them have stopped.
        drop(fan_in_tx);

        Ok(Engine {
            workers,
            receiver: Some(NormalizingReceiver::new(RECEIVER_ID, fan_in_rx)),
            token,
        })
    }

    /// Hand the receiver to the downstream pipeline. `None` after the
    /// first call.
    pub fn take_receiver(&mut self) -> Option<NormalizingReceiver> {
        self.receiver.take()
    }

    pub fn topics(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.topic.as_str()).collect()
    }

    /// Cancel every worker and wait for all of them.
    ///
    /// Returns the last known subscription state per topic; checkpoints
    /// are not persisted anywhere else.
    pub async fn shutdown(self) -> Vec<TopicSubscription> {
        self.token.cancel();
        let mut finished = Vec::with_capacity(self.workers.len());
        for slot in self.workers {
            match slot.handle.await {
                Ok(sub) => finished.push(sub),
                Err(e) => tracing::error!(topic = %slot.topic, error = %e, "worker task failed"),
            }
        }
        tracing::info!(workers = finished.len(), "engine shut down");
        finished
    }
}
