use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use stream_api::Event;

use crate::error::EngineError;
use crate::normalizer::normalize;
use crate::worker::Delivery;

/// Identity under which the normalizer is registered with the pipeline.
pub const RECEIVER_ID: &str = "event-stream-receiver";

/// Source side of the downstream pipeline.
///
/// The pipeline calls `poll_events` once with its output sink and a
/// cancellation token; the receiver pushes events until cancelled.
pub trait EventReceiver: Send {
    fn id(&self) -> &str;

    /// Deliver events into `sink` until `token` is cancelled.
    ///
    /// Returns `Ok(())` on cancellation or when every producer is gone.
    fn poll_events(
        &mut self,
        token: CancellationToken,
        sink: mpsc::Sender<Event>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + '_>>;
}

/// Single consumer of the fan-in channel: normalizes each raw event and
/// forwards it to the pipeline sink.
#[derive(Debug)]
pub struct NormalizingReceiver {
    id: String,
    fan_in: mpsc::Receiver<Delivery>,
    forwarded: u64,
    rejected: u64,
}

impl NormalizingReceiver {
    pub fn new(id: impl Into<String>, fan_in: mpsc::Receiver<Delivery>) -> Self {
        Self {
            id: id.into(),
            fan_in,
            forwarded: 0,
            rejected: 0,
        }
    }

    /// Events handed to the sink so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Events dropped for missing or mistyped metadata.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    async fn run(&mut self, token: CancellationToken, sink: mpsc::Sender<Event>) -> Result<(), EngineError> {
        loop {
            // Cancellation wins over queued deliveries: nothing buffered is
            // forwarded once the token fires.
            let delivery = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                delivery = self.fan_in.recv() => delivery,
            };
            let Some(Delivery { topic, event }) = delivery else {
                tracing::info!(receiver = %self.id, "all subscription workers stopped");
                break;
            };

            let event = match normalize(event) {
                Ok(event) => event,
                Err(e) => {
                    self.rejected += 1;
                    tracing::warn!(receiver = %self.id, %topic, error = %e, "rejecting event");
                    continue;
                }
            };

            tracing::debug!(receiver = %self.id, %topic, event_type = %event.event_type(), "send new event");
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                sent = sink.send(event) => {
                    if sent.is_err() {
                        return Err(EngineError::SinkClosed);
                    }
                }
            }
            self.forwarded += 1;
        }

        tracing::info!(
            receiver = %self.id,
            forwarded = self.forwarded,
            rejected = self.rejected,
            "receiver stopped"
        );
        Ok(())
    }
}

impl EventReceiver for NormalizingReceiver {
    fn id(&self) -> &str {
        &self.id
    }

    fn poll_events(
        &mut self,
        token: CancellationToken,
        sink: mpsc::Sender<Event>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + '_>> {
        Box::pin(self.run(token, sink))
    }
}
