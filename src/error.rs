use thiserror::Error;

/// Every failure the coordination core can surface.
///
/// Only the gateway recovers from `RateLimited` and `CooldownConflict`, and
/// only once per call. Everything else travels up to the per-agent loop.
#[derive(Error, Debug)]
pub enum CoordError {
    #[error("Rate limited: retry after {retry_after_secs:.1}s")]
    RateLimited { retry_after_secs: f64 },

    #[error("Cooldown conflict: {remaining_seconds}s remaining")]
    CooldownConflict { remaining_seconds: u64 },

    #[error("Action failed ({code}): {message}")]
    ActionFailed { code: i64, message: String },

    #[error("No known path from {from} to {to}")]
    NoPathFound { from: String, to: String },

    #[error("Lease unavailable for {0}")]
    LeaseUnavailable(String),

    #[error("Stopped driving {0}: lease lost or directive withdrawn")]
    Interrupted(String),

    #[error("{ship} made no extraction progress in {attempts} consecutive attempts")]
    StuckExtracting { ship: String, attempts: u32 },

    #[error("Invalid state transition: from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoordError {
    /// API error code, when the failure came back from the server.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            CoordError::ActionFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordError>;
