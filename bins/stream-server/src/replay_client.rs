//! Local stand-in for the remote publish/subscribe service.
//!
//! Each topic is a JSON-lines file under one directory
//! (`/event/LoginEventStream` → `event_LoginEventStream.jsonl`). The replay
//! id of an event is its zero-based line number, big-endian `u64`. Streams
//! follow the file like `tail -f`, so appending lines publishes events.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use stream_api::{
    AuthError, EventStream, LookupError, PubSubClient, RawEvent, ReceivedEvent, ReplayId,
    ReplayPreset, StreamError, SubscribeRequest, TopicInfo,
};
use stream_engine::credentials::Credentials;

pub struct ReplayClient {
    dir: PathBuf,
    credentials: Arc<Credentials>,
    poll_interval: Duration,
    authenticated: AtomicBool,
}

impl ReplayClient {
    pub fn new(dir: impl Into<PathBuf>, credentials: Arc<Credentials>, poll_interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            credentials,
            poll_interval,
            authenticated: AtomicBool::new(false),
        }
    }

    pub fn topic_file(&self, topic: &str) -> PathBuf {
        topic_file(&self.dir, topic)
    }
}

pub fn topic_file(dir: &Path, topic: &str) -> PathBuf {
    dir.join(format!("{}.jsonl", topic.trim_matches('/').replace('/', "_")))
}

impl PubSubClient for ReplayClient {
    fn authenticate(&self) -> Pin<Box<dyn Future<Output = Result<(), AuthError>> + Send + '_>> {
        Box::pin(async move {
            tracing::info!(
                username = %self.credentials.username(),
                token_url = %self.credentials.token_url(),
                grant_type = %self.credentials.grant_type(),
                "local replay: skipping token request"
            );
            self.authenticated.store(true, Ordering::Release);
            Ok(())
        })
    }

    fn fetch_user_info(&self) -> Pin<Box<dyn Future<Output = Result<(), AuthError>> + Send + '_>> {
        Box::pin(async move {
            if !self.authenticated.load(Ordering::Acquire) {
                return Err(AuthError::Rejected("user info requested before authentication".into()));
            }
            Ok(())
        })
    }

    fn get_topic_info<'a>(
        &'a self,
        topic: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TopicInfo, LookupError>> + Send + 'a>> {
        Box::pin(async move {
            let path = self.topic_file(topic);
            match tokio::fs::metadata(&path).await {
                Ok(meta) => Ok(TopicInfo {
                    name: topic.to_string(),
                    can_subscribe: meta.is_file(),
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(LookupError::NotFound(topic.to_string()))
                }
                Err(e) => Err(LookupError::Transport(format!("{}: {e}", path.display()))),
            }
        })
    }

    fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn EventStream>, StreamError>> + Send + '_>> {
        Box::pin(async move {
            let path = self.topic_file(&request.topic);
            let stream = JsonlStream::open(path, request, self.poll_interval).await?;
            Ok(Box::new(stream) as Box<dyn EventStream>)
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  JsonlStream
// ═══════════════════════════════════════════════════════════════

struct JsonlStream {
    topic: String,
    path: PathBuf,
    reader: BufReader<File>,
    /// Line number of the next complete line.
    next_index: u64,
    /// Trailing bytes of a line whose newline has not been written yet.
    partial: Vec<u8>,
    poll_interval: Duration,
}

impl JsonlStream {
    async fn open(path: PathBuf, request: SubscribeRequest, poll_interval: Duration) -> Result<Self, StreamError> {
        let file = File::open(&path)
            .await
            .map_err(|e| StreamError::new(format!("{}: {e}", path.display())))?;
        let mut stream = Self {
            topic: request.topic,
            path,
            reader: BufReader::new(file),
            next_index: 0,
            partial: Vec::new(),
            poll_interval,
        };

        match (request.preset, request.replay_id) {
            (ReplayPreset::Earliest, _) => {}
            (ReplayPreset::Latest, _) => stream.skip_to(u64::MAX).await?,
            (ReplayPreset::Custom, Some(id)) => {
                let bytes: [u8; 8] = id.as_bytes().try_into().map_err(|_| {
                    StreamError::new(format!("replay id {id} is not a line offset"))
                })?;
                let last = u64::from_be_bytes(bytes);
                stream.skip_to(last.saturating_add(1)).await?;
            }
            (ReplayPreset::Custom, None) => {
                return Err(StreamError::new("CUSTOM preset without replay id"));
            }
        }

        tracing::debug!(topic = %stream.topic, start = stream.next_index, "replay stream opened");
        Ok(stream)
    }

    /// Next complete line, or `None` if the file currently ends before one.
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        let n = self
            .reader
            .read_until(b'\n', &mut self.partial)
            .await
            .map_err(|e| StreamError::new(format!("{}: {e}", self.path.display())))?;
        if n == 0 || self.partial.last() != Some(&b'\n') {
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut self.partial)))
    }

    /// Discard lines until `target` or end of file.
    async fn skip_to(&mut self, target: u64) -> Result<(), StreamError> {
        while self.next_index < target {
            match self.read_line().await? {
                Some(_) => self.next_index += 1,
                None => break,
            }
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<ReceivedEvent, StreamError>> {
        loop {
            let line = match self.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
                Err(e) => return Some(Err(e)),
            };
            let index = self.next_index;
            self.next_index += 1;

            let Ok(line) = String::from_utf8(line) else {
                tracing::warn!(topic = %self.topic, line = index, "skipping line that is not valid UTF-8");
                continue;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed = serde_json::from_str(trimmed).ok().and_then(RawEvent::from_value);
            match parsed {
                Some(event) => {
                    return Some(Ok(ReceivedEvent {
                        event,
                        replay_id: ReplayId::new(index.to_be_bytes().to_vec()),
                    }));
                }
                None => {
                    tracing::warn!(topic = %self.topic, line = index, "skipping line that is not a JSON object");
                }
            }
        }
    }
}

impl EventStream for JsonlStream {
    fn next(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Result<ReceivedEvent, StreamError>>> + Send + '_>> {
        Box::pin(self.next_event())
    }
}
