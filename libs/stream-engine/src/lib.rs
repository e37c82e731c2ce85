//! Subscription orchestration for a publish/subscribe event stream.
//!
//! Startup: [`context::StreamContext`] resolves credentials and validates the
//! replay policy, then [`bootstrap::Engine`] authenticates, runs the topic
//! preflight gate and spawns one [`worker::SubscriptionWorker`] per topic.
//! Workers fan in to a single [`receiver::NormalizingReceiver`], which turns
//! raw payloads into [`stream_api::Event`]s for the downstream pipeline.

pub mod backoff;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod normalizer;
pub mod preflight;
pub mod receiver;
pub mod replay;
pub mod worker;

pub use bootstrap::Engine;
pub use context::StreamContext;
pub use error::{EngineError, PreflightError};
pub use receiver::{EventReceiver, NormalizingReceiver};
