use thiserror::Error;

/// Error kinds the core surfaces to callers that need to match on a
/// specific failure rather than just propagate a diagnostic string.
/// Most call sites convert these into a synthetic `Observation:` and
/// keep the Agent Loop running; only `LlmTransport` and `Cancelled`
/// are terminal.
#[derive(Debug, Error)]
pub enum FalconError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("limit reached: {0}")]
    LimitReached(String),

    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    #[error("{0}")]
    SecretViolation(String),

    #[error("rejected by user")]
    ConfirmationRejected,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("llm transport error: {0}")]
    LlmTransport(String),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
