//! Error type for app info lookups.

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Endpoint answered but has no record for the app.
    #[error("app not listed: response has no data")]
    NotListed,
    /// Endpoint returned a non-zero code.
    #[error("app not listed: {0}")]
    Rejected(String),
}
