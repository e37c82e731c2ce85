/// Authentication handshake or user-info lookup failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint answered but refused the credentials.
    #[error("credentials rejected: {0}")]
    Rejected(String),

    /// The token endpoint could not be reached or answered garbage.
    #[error("auth transport: {0}")]
    Transport(String),
}

/// Topic metadata lookup failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error("topic '{0}' not found")]
    NotFound(String),

    #[error("lookup transport: {0}")]
    Transport(String),
}

/// A subscribe call or a live stream segment ended abnormally.
///
/// Always recoverable from the engine's point of view: the worker keeps
/// its checkpoint and subscribes again.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StreamError {
    message: String,
}

impl StreamError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A raw event is missing required routing metadata or carries it with
/// the wrong type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    MistypedField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{field}' holds out-of-range timestamp {value}")]
    TimestampOutOfRange { field: &'static str, value: i64 },
}
