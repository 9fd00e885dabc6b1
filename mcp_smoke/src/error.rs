use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while running a single smoke case.
///
/// A response that does not decode is not an error; see
/// [`crate::extract::ExtractedResponse::Raw`].
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to launch {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no response from {operation} within {timeout:?} ({stdout_bytes} bytes of partial output)")]
    Timeout {
        operation: String,
        timeout: Duration,
        stdout_bytes: usize,
    },

    #[error("arguments for {operation} must be a JSON object, got {kind}")]
    InvalidArguments {
        operation: String,
        kind: &'static str,
    },

    #[error("failed to serialize request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("child process did not expose its {0} pipe")]
    MissingPipe(&'static str),

    #[error("failed waiting for child process: {0}")]
    Wait(#[source] std::io::Error),
}

impl HarnessError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HarnessError::Timeout { .. })
    }

    pub fn is_launch(&self) -> bool {
        matches!(self, HarnessError::Launch { .. })
    }
}
