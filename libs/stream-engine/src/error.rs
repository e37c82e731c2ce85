use stream_api::{AuthError, LookupError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("preflight error: {0}")]
    Preflight(#[from] PreflightError),

    #[error("event sink closed")]
    SinkClosed,
}

impl EngineError {
    /// Add context to the error.
    ///
    /// Only `Config` messages are prefixed; other variants already name
    /// what failed.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

/// A configured topic failed the startup subscribability check.
#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("topic '{topic}': {source}")]
    Lookup {
        topic: String,
        #[source]
        source: LookupError,
    },

    #[error("topic '{0}': user is not allowed to subscribe")]
    NotSubscribable(String),
}
