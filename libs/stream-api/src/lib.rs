//! Contract crate shared by the subscription engine and protocol client
//! implementations.
//!
//! - [`types`]: replay presets, checkpoints, raw and normalized events.
//! - [`error`]: error types returned across the client boundary.
//! - [`client`]: the capability set a publish/subscribe client provides.
//!
//! No async runtime dependency: trait methods return boxed futures so any
//! executor can drive them.

pub mod client;
pub mod error;
pub mod types;

pub use client::{EventStream, PubSubClient, ReceivedEvent};
pub use error::{AuthError, DecodeError, LookupError, StreamError};
pub use types::{Event, RawEvent, ReplayId, ReplayPreset, SubscribeRequest, TopicInfo};
