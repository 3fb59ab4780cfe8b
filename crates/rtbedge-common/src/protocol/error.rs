use thiserror::Error;

#[derive(Error, Debug)]
pub enum RtbError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed bid request: {0}")]
    Parse(String),

    #[error("Campaign selection failed: {0}")]
    Selection(String),

    #[error("Throttle percentage must be within 0..=100, got {0}")]
    InvalidThrottle(u8),

    #[error("Membership store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed membership store response: {0}")]
    MalformedStoreResponse(String),

    #[error("Pool node terminated: {0}")]
    NodeTerminated(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = RtbError> = std::result::Result<T, E>;
