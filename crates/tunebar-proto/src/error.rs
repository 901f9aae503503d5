use thiserror::Error;

/// Failures of the radio-service client.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Connection, TLS, timeout or proxy failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status.
    #[error("service error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response body did not match the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("not logged in")]
    NotLoggedIn,
}

/// Failures of the play-history (scrobble) client.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("last.fm error {code}: {message}")]
    Api { code: u32, message: String },

    #[error("scrobbling is not configured")]
    NotConfigured,

    #[error("could not decode response: {0}")]
    Decode(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
