//! Scripted protocol client shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use stream_api::{
    AuthError, EventStream, LookupError, PubSubClient, RawEvent, ReceivedEvent, ReplayId,
    StreamError, SubscribeRequest, TopicInfo,
};
use stream_engine::StreamContext;
use stream_engine::config::StreamConfig;

/// How a scripted segment ends after its events.
#[derive(Debug, Clone)]
pub enum End {
    Clean,
    Error(&'static str),
    /// Never ends; the worker sits in `Streaming` until cancelled.
    Hang,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub events: Vec<ReceivedEvent>,
    pub end: End,
}

impl Segment {
    pub fn new(events: Vec<ReceivedEvent>, end: End) -> Self {
        Self { events, end }
    }
}

#[derive(Debug)]
struct TopicScript {
    can_subscribe: bool,
    lookup_fails: bool,
    segments: VecDeque<Segment>,
}

/// In-memory [`PubSubClient`] replaying a fixed script per topic.
///
/// Once a topic's segments are used up, further subscribes hang forever.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    auth_fails: bool,
    /// Every subscribe call is recorded and then never resolves.
    stalled_subscribe: bool,
    topics: Mutex<HashMap<String, TopicScript>>,
    lookups: Mutex<Vec<String>>,
    requests: Mutex<Vec<SubscribeRequest>>,
    subscribed_at: Mutex<Vec<Instant>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_auth() -> Self {
        Self {
            auth_fails: true,
            ..Self::default()
        }
    }

    pub fn stalled_subscribe(mut self) -> Self {
        self.stalled_subscribe = true;
        self
    }

    pub fn topic(self, name: &str, segments: Vec<Segment>) -> Self {
        self.insert(name, true, false, segments)
    }

    pub fn forbidden_topic(self, name: &str) -> Self {
        self.insert(name, false, false, Vec::new())
    }

    pub fn broken_topic(self, name: &str) -> Self {
        self.insert(name, true, true, Vec::new())
    }

    fn insert(self, name: &str, can_subscribe: bool, lookup_fails: bool, segments: Vec<Segment>) -> Self {
        self.topics.lock().unwrap().insert(
            name.to_string(),
            TopicScript {
                can_subscribe,
                lookup_fails,
                segments: segments.into(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<SubscribeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, topic: &str) -> Vec<SubscribeRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.topic == topic)
            .collect()
    }

    /// When each subscribe call was made, in call order.
    pub fn subscribe_times(&self) -> Vec<Instant> {
        self.subscribed_at.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl PubSubClient for ScriptedClient {
    fn authenticate(&self) -> Pin<Box<dyn Future<Output = Result<(), AuthError>> + Send + '_>> {
        let fails = self.auth_fails;
        Box::pin(async move {
            if fails {
                Err(AuthError::Rejected("invalid_grant".into()))
            } else {
                Ok(())
            }
        })
    }

    fn fetch_user_info(&self) -> Pin<Box<dyn Future<Output = Result<(), AuthError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn get_topic_info<'a>(
        &'a self,
        topic: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TopicInfo, LookupError>> + Send + 'a>> {
        self.lookups.lock().unwrap().push(topic.to_string());
        let result = match self.topics.lock().unwrap().get(topic) {
            None => Err(LookupError::NotFound(topic.to_string())),
            Some(script) if script.lookup_fails => Err(LookupError::Transport("connection reset".into())),
            Some(script) => Ok(TopicInfo {
                name: topic.to_string(),
                can_subscribe: script.can_subscribe,
            }),
        };
        Box::pin(async move { result })
    }

    fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn EventStream>, StreamError>> + Send + '_>> {
        let segment = self
            .topics
            .lock()
            .unwrap()
            .get_mut(&request.topic)
            .and_then(|script| script.segments.pop_front())
            .unwrap_or(Segment::new(Vec::new(), End::Hang));
        self.requests.lock().unwrap().push(request);
        self.subscribed_at.lock().unwrap().push(Instant::now());

        if self.stalled_subscribe {
            return Box::pin(std::future::pending());
        }
        let stream: Box<dyn EventStream> = Box::new(ScriptedStream::from(segment));
        Box::pin(async move { Ok(stream) })
    }
}

struct ScriptedStream {
    items: VecDeque<Result<ReceivedEvent, StreamError>>,
    hang: bool,
}

impl From<Segment> for ScriptedStream {
    fn from(segment: Segment) -> Self {
        let mut items: VecDeque<_> = segment.events.into_iter().map(Ok).collect();
        let hang = match segment.end {
            End::Clean => false,
            End::Error(msg) => {
                items.push_back(Err(StreamError::new(msg)));
                false
            }
            End::Hang => true,
        };
        Self { items, hang }
    }
}

impl EventStream for ScriptedStream {
    fn next(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Result<ReceivedEvent, StreamError>>> + Send + '_>> {
        let item = self.items.pop_front();
        let hang = self.hang;
        Box::pin(async move {
            match item {
                Some(item) => Some(item),
                None if hang => std::future::pending().await,
                None => None,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Raw event tagged with its topic label and sequence number; the replay
/// id is the big-endian sequence number.
pub fn event(label: &str, seq: u64) -> ReceivedEvent {
    let raw = RawEvent::from_value(json!({
        "eventType": "LoginEvent",
        "EventDate": 1_700_000_000_000_u64 + seq,
        "label": label,
        "seq": seq,
    }))
    .unwrap();
    ReceivedEvent {
        event: raw,
        replay_id: replay_id(seq),
    }
}

pub fn replay_id(seq: u64) -> ReplayId {
    ReplayId::new(seq.to_be_bytes().to_vec())
}

/// Context with fast, jitter-free reconnects.
pub fn context(topics: &[&str], replay: &str) -> Arc<StreamContext> {
    context_with_reconnect(topics, replay, 1, 5)
}

/// Context with a fixed, jitter-free reconnect schedule.
pub fn context_with_reconnect(
    topics: &[&str],
    replay: &str,
    initial_delay_ms: u64,
    max_delay_ms: u64,
) -> Arc<StreamContext> {
    let topics = topics
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let toml_str = format!(
        r#"
        version = "1.0.0"

        [event_stream]
        integration_name = "test"

        [event_stream.auth]
        token_url = "https://login.example.com/services/oauth2/token"

        [event_stream.auth.user_pass]
        client_id = "id"
        client_secret = "secret"
        username = "user"
        password = "pass"

        [subscription]
        topics = [{topics}]
        {replay}

        [subscription.reconnect]
        initial_delay_ms = {initial_delay_ms}
        max_delay_ms = {max_delay_ms}
        jitter = false
        "#
    );
    let config = StreamConfig::parse(&toml_str).unwrap();
    Arc::new(StreamContext::from_config(&config).unwrap())
}

/// Poll `cond` until it holds; panics after five seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
