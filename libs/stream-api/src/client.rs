use std::future::Future;
use std::pin::Pin;

use crate::error::{AuthError, LookupError, StreamError};
use crate::types::{RawEvent, ReplayId, SubscribeRequest, TopicInfo};

/// One event read from a live stream plus the replay position right
/// after it.
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub event: RawEvent,
    pub replay_id: ReplayId,
}

/// A single subscription segment: the events of one subscribe call.
pub trait EventStream: Send {
    /// Next event of the segment.
    ///
    /// - `Some(Ok(_))`: an event and its replay position.
    /// - `Some(Err(_))`: the segment ended abnormally.
    /// - `None`: the segment ended cleanly.
    #[allow(clippy::type_complexity)]
    fn next(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Result<ReceivedEvent, StreamError>>> + Send + '_>>;
}

/// Capabilities of a publish/subscribe protocol client.
///
/// Wire format, token exchange and flow-control credits are the
/// implementation's business; the engine only sequences these calls.
/// Credentials are handed to the implementation at construction time.
pub trait PubSubClient: Send + Sync {
    /// Obtain an access token.
    fn authenticate(&self) -> Pin<Box<dyn Future<Output = Result<(), AuthError>> + Send + '_>>;

    /// Resolve the tenant/user identity that goes with the access token.
    fn fetch_user_info(&self) -> Pin<Box<dyn Future<Output = Result<(), AuthError>> + Send + '_>>;

    /// Look up topic metadata.
    fn get_topic_info<'a>(
        &'a self,
        topic: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TopicInfo, LookupError>> + Send + 'a>>;

    /// Open a new stream segment.
    #[allow(clippy::type_complexity)]
    fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn EventStream>, StreamError>> + Send + '_>>;
}
