//! Terminal stage of the pipeline: one JSON object per line.

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use stream_api::Event;

use crate::error::ServerError;

#[derive(Serialize)]
struct ExportRecord<'a> {
    integration: &'a str,
    #[serde(flatten)]
    event: &'a Event,
}

/// Writes every event it receives as a JSON line tagged with the
/// integration name.
pub struct LineExporter<W> {
    integration: String,
    out: W,
}

impl<W: AsyncWrite + Unpin + Send> LineExporter<W> {
    pub fn new(integration: impl Into<String>, out: W) -> Self {
        Self {
            integration: integration.into(),
            out,
        }
    }

    /// Drain `events` until every sender is gone. Returns the number of
    /// lines written.
    pub async fn run(&mut self, mut events: mpsc::Receiver<Event>) -> Result<u64, ServerError> {
        let mut written = 0u64;
        while let Some(event) = events.recv().await {
            let record = ExportRecord {
                integration: &self.integration,
                event: &event,
            };
            let mut line = serde_json::to_vec(&record)
                .map_err(|e| ServerError::Export(std::io::Error::other(e)))?;
            line.push(b'\n');
            self.out.write_all(&line).await.map_err(ServerError::Export)?;
            self.out.flush().await.map_err(ServerError::Export)?;
            written += 1;
        }
        tracing::debug!(written, "exporter drained");
        Ok(written)
    }

    #[cfg(test)]
    fn get_ref(&self) -> &W {
        &self.out
    }
}
