//! Bridge errors

use thiserror::Error;

/// Bridge result type
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("simulator request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("simulator returned status {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("simulator rejected connect at {base}")]
    ConnectRejected { base: String },

    #[error("malformed simulator reply: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("callback listener error: {0}")]
    Listener(#[from] std::io::Error),

    #[error("debug database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("no routable local address for the callback listener")]
    NoLocalAddress,
}
