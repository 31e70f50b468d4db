use std::time::Duration;

/// Why a single sync cycle failed. Every variant is treated as transient.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("coordinator answered with HTTP {0}")]
    Status(u16),

    #[error("payload could not be encoded or decoded: {0}")]
    Decode(#[from] serde_json::Error),
}
