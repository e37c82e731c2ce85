use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use stream_engine::EventReceiver;

use crate::error::ServerError;
use crate::exporter::LineExporter;

/// Identity of the single pipeline the receiver is attached to.
pub const PIPELINE_ID: &str = "event-stream-pipeline";

/// Receiver → bounded channel → exporter.
pub struct EventsPipeline {
    id: String,
    receiver: Box<dyn EventReceiver>,
    buffer: usize,
}

impl EventsPipeline {
    pub fn new(id: impl Into<String>, receiver: Box<dyn EventReceiver>, buffer: usize) -> Self {
        Self {
            id: id.into(),
            receiver,
            buffer: buffer.max(1),
        }
    }

    /// Run until `token` is cancelled or a stage fails. Returns the number
    /// of exported events.
    pub async fn run<W>(mut self, mut exporter: LineExporter<W>, token: CancellationToken) -> Result<u64, ServerError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tracing::info!(pipeline = %self.id, receiver = %self.receiver.id(), "pipeline started");
        let (tx, rx) = mpsc::channel(self.buffer);
        let export = tokio::spawn(async move { exporter.run(rx).await });

        // The sender moves into the receiver: once polling returns, the
        // exporter sees the channel close and drains what is left.
        let polled = self.receiver.poll_events(token, tx).await;
        let exported = export.await??;
        polled?;

        tracing::info!(pipeline = %self.id, exported, "pipeline stopped");
        Ok(exported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use stream_api::RawEvent;
    use stream_engine::NormalizingReceiver;
    use stream_engine::receiver::RECEIVER_ID;
    use stream_engine::worker::Delivery;

    fn delivery(v: serde_json::Value) -> Delivery {
        Delivery {
            topic: Arc::from("/event/LoginEventStream"),
            event: RawEvent::from_value(v).unwrap(),
        }
    }

    #[tokio::test]
    async fn exports_until_producers_are_gone() {
        let (fan_in_tx, fan_in_rx) = mpsc::channel(4);
        let receiver = NormalizingReceiver::new(RECEIVER_ID, fan_in_rx);
        let pipeline = EventsPipeline::new(PIPELINE_ID, Box::new(receiver), 4);

        fan_in_tx.send(delivery(json!({"eventType": "LoginEvent"}))).await.unwrap();
        fan_in_tx.send(delivery(json!({"noType": true}))).await.unwrap();
        fan_in_tx.send(delivery(json!({"eventType": "ApiEvent"}))).await.unwrap();
        drop(fan_in_tx);

        let exported = pipeline
            .run(LineExporter::new("test", tokio::io::sink()), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(exported, 2);
    }

    #[tokio::test]
    async fn stops_on_cancellation() {
        let (_fan_in_tx, fan_in_rx) = mpsc::channel::<Delivery>(1);
        let receiver = NormalizingReceiver::new(RECEIVER_ID, fan_in_rx);
        let pipeline = EventsPipeline::new(PIPELINE_ID, Box::new(receiver), 1);
        let token = CancellationToken::new();

        let handle = tokio::spawn(pipeline.run(LineExporter::new("test", tokio::io::sink()), token.clone()));
        token.cancel();

        let exported = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("pipeline ignored cancellation")
            .unwrap()
            .unwrap();
        assert_eq!(exported, 0);
    }
}
