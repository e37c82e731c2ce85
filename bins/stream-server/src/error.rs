#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Engine(#[from] stream_engine::EngineError),

    #[error("receiver already handed to a pipeline")]
    ReceiverTaken,

    #[error("export: {0}")]
    Export(#[source] std::io::Error),

    #[error("signal: {0}")]
    Signal(#[source] std::io::Error),

    #[error("task: {0}")]
    Task(#[from] tokio::task::JoinError),
}
