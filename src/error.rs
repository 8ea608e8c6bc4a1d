use thiserror::Error;

/// Main error type for the pipeline core.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("clip not found: {0}")]
    ClipNotFound(String),

    #[error("invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("stage failed: {stage}: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("deterministic input error: {0}")]
    DeterministicInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether the dispatcher's retry policy should give this failure
    /// another attempt (spec.md §7, transient-transport vs deterministic-input).
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Gateway(g) => g.is_retryable(),
            PipelineError::Io(_) => true,
            PipelineError::StageFailed { .. } => true,
            PipelineError::DeterministicInput(_)
            | PipelineError::InvalidTransition { .. }
            | PipelineError::ItemNotFound(_)
            | PipelineError::SubscriptionNotFound(_)
            | PipelineError::ClipNotFound(_)
            | PipelineError::Config(_) => false,
        }
    }
}

/// Errors from the external capabilities the core consumes: media probing
/// and cutting, speech recognition, and the LLM chat capability.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("process exited with status {0}")]
    ProcessFailed(i32),

    #[error("no video stream found")]
    NoVideoStream,

    #[error("no audio available")]
    NoAudio,
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_) | GatewayError::Timeout(_) | GatewayError::ProcessFailed(_)
        )
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        let e = GatewayError::Transport("connection reset".into());
        assert!(e.is_retryable());
        assert!(PipelineError::Gateway(e).is_retryable());
    }

    #[test]
    fn malformed_response_is_not_retryable() {
        let e = GatewayError::MalformedResponse("bad json".into());
        assert!(!e.is_retryable());
    }

    #[test]
    fn not_found_errors_are_not_retryable() {
        assert!(!PipelineError::ItemNotFound("x".into()).is_retryable());
    }
}
