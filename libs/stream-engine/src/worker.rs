use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use stream_api::{
    EventStream, PubSubClient, RawEvent, ReplayId, ReplayPreset, StreamError, SubscribeRequest,
};

use crate::backoff::Backoff;
use crate::config::ReconnectConfig;

// ═══════════════════════════════════════════════════════════════
//  TopicSubscription: per-topic resumable state
// ═══════════════════════════════════════════════════════════════

/// Where a subscription worker is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Subscribing,
    Streaming,
    Reconnecting,
    Stopped,
}

/// Subscription state owned by exactly one worker.
///
/// Once a checkpoint exists, every subscribe call resumes from it with
/// the `Custom` preset, whatever preset was configured.
#[derive(Debug, Clone)]
pub struct TopicSubscription {
    topic: String,
    replay_preset: ReplayPreset,
    checkpoint: Option<ReplayId>,
    state: WorkerState,
}

impl TopicSubscription {
    pub fn new(topic: String, replay_preset: ReplayPreset, checkpoint: Option<ReplayId>) -> Self {
        Self {
            topic,
            replay_preset,
            checkpoint,
            state: WorkerState::Subscribing,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn checkpoint(&self) -> Option<&ReplayId> {
        self.checkpoint.as_ref()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn effective_preset(&self) -> ReplayPreset {
        if self.checkpoint.is_some() {
            ReplayPreset::Custom
        } else {
            self.replay_preset
        }
    }

    pub fn subscribe_request(&self, num_requested: u32) -> SubscribeRequest {
        SubscribeRequest {
            topic: self.topic.clone(),
            preset: self.effective_preset(),
            replay_id: self.checkpoint.clone(),
            num_requested,
        }
    }
}

/// A raw event on its way from a worker to the normalizer.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub topic: Arc<str>,
    pub event: RawEvent,
}

// ═══════════════════════════════════════════════════════════════
//  SubscriptionWorker
// ═══════════════════════════════════════════════════════════════

/// How a stream segment ended.
enum SegmentEnd {
    Closed,
    Failed(StreamError),
    FanInClosed,
    Cancelled,
}

struct Segment {
    delivered: u64,
    end: SegmentEnd,
}

/// Resumable subscribe loop for one topic.
///
/// `Subscribing → Streaming → Reconnecting → Subscribing → …` until the
/// token is cancelled or the fan-in receiver is gone. Stream errors are
/// logged and retried with backoff; they never end the loop.
pub struct SubscriptionWorker {
    subscription: TopicSubscription,
    topic: Arc<str>,
    client: Arc<dyn PubSubClient>,
    fan_in: mpsc::Sender<Delivery>,
    backoff: Backoff,
    num_requested: u32,
    token: CancellationToken,
}

impl SubscriptionWorker {
    pub fn new(
        subscription: TopicSubscription,
        client: Arc<dyn PubSubClient>,
        fan_in: mpsc::Sender<Delivery>,
        reconnect: ReconnectConfig,
        num_requested: u32,
        token: CancellationToken,
    ) -> Self {
        let topic: Arc<str> = Arc::from(subscription.topic());
        Self {
            subscription,
            topic,
            client,
            fan_in,
            backoff: Backoff::new(reconnect),
            num_requested,
            token,
        }
    }

    pub fn spawn(self) -> JoinHandle<TopicSubscription> {
        tokio::spawn(self.run())
    }

    /// Run until cancelled; returns the final subscription state.
    pub async fn run(mut self) -> TopicSubscription {
        loop {
            self.subscription.state = WorkerState::Subscribing;
            let request = self.subscription.subscribe_request(self.num_requested);
            tracing::info!(
                topic = %self.topic,
                preset = %request.preset,
                replay_id = ?request.replay_id,
                "subscribing"
            );

            let opened = tokio::select! {
                _ = self.token.cancelled() => break,
                opened = self.client.subscribe(request) => opened,
            };

            let segment = match opened {
                Ok(stream) => {
                    self.subscription.state = WorkerState::Streaming;
                    self.stream(stream).await
                }
                Err(e) => Segment {
                    delivered: 0,
                    end: SegmentEnd::Failed(e),
                },
            };

            let failed = match segment.end {
                SegmentEnd::Cancelled => break,
                SegmentEnd::FanInClosed => {
                    tracing::warn!(topic = %self.topic, "fan-in channel closed, stopping worker");
                    break;
                }
                SegmentEnd::Closed => {
                    tracing::info!(topic = %self.topic, delivered = segment.delivered, "stream ended");
                    false
                }
                SegmentEnd::Failed(e) => {
                    tracing::error!(
                        topic = %self.topic,
                        delivered = segment.delivered,
                        error = %e,
                        "error occurred while subscribing to topic"
                    );
                    true
                }
            };

            self.subscription.state = WorkerState::Reconnecting;
            if segment.delivered > 0 {
                self.backoff.reset();
            }
            if failed || segment.delivered == 0 {
                let delay = self.backoff.next_delay();
                tracing::debug!(
                    topic = %self.topic,
                    attempt = self.backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "waiting before resubscribe"
                );
                tokio::select! {
                    _ = self.token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        self.subscription.state = WorkerState::Stopped;
        tracing::info!(
            topic = %self.topic,
            replay_id = ?self.subscription.checkpoint,
            "worker stopped"
        );
        self.subscription
    }

    /// Forward one segment's events into the fan-in channel, advancing
    /// the checkpoint after each delivered event.
    async fn stream(&mut self, mut stream: Box<dyn EventStream>) -> Segment {
        let mut delivered = 0;
        loop {
            let next = tokio::select! {
                _ = self.token.cancelled() => {
                    return Segment { delivered, end: SegmentEnd::Cancelled };
                }
                next = stream.next() => next,
            };

            let received = match next {
                Some(Ok(received)) => received,
                Some(Err(e)) => return Segment { delivered, end: SegmentEnd::Failed(e) },
                None => return Segment { delivered, end: SegmentEnd::Closed },
            };

            let delivery = Delivery {
                topic: self.topic.clone(),
                event: received.event,
            };
            tokio::select! {
                _ = self.token.cancelled() => {
                    return Segment { delivered, end: SegmentEnd::Cancelled };
                }
                sent = self.fan_in.send(delivery) => {
                    if sent.is_err() {
                        return Segment { delivered, end: SegmentEnd::FanInClosed };
                    }
                }
            }

            self.subscription.checkpoint = Some(received.replay_id);
            delivered += 1;
            tracing::trace!(topic = %self.topic, "event forwarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_forces_custom_preset() {
        let mut sub = TopicSubscription::new("/event/A".into(), ReplayPreset::Latest, None);
        assert_eq!(sub.effective_preset(), ReplayPreset::Latest);
        assert!(sub.subscribe_request(1).replay_id.is_none());

        sub.checkpoint = Some(ReplayId::new(vec![1, 2, 3]));
        let req = sub.subscribe_request(5);
        assert_eq!(req.preset, ReplayPreset::Custom);
        assert_eq!(req.replay_id, Some(ReplayId::new(vec![1, 2, 3])));
        assert_eq!(req.num_requested, 5);
        assert_eq!(req.topic, "/event/A");
    }

    #[test]
    fn initial_replay_id_is_first_checkpoint() {
        let sub = TopicSubscription::new(
            "/event/A".into(),
            ReplayPreset::Custom,
            Some(ReplayId::new(vec![9])),
        );
        assert_eq!(sub.effective_preset(), ReplayPreset::Custom);
        assert_eq!(sub.state(), WorkerState::Subscribing);
    }
}
