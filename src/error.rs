use reqwest::header::InvalidHeaderValue;

/// Errors produced by the scrape core.
///
/// There is no recovery path here: every variant propagates to the caller
/// unchanged. A transient network failure and a permanent one look the same.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Missing credentials, rejected credentials, or an unexpected login
    /// response.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Account or page absent: an HTTP 404, or a profile page whose embedded
    /// data lacks the expected user object.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response from the platform. Carries the raw
    /// body for diagnostics.
    #[error("platform returned status {status}: {body}")]
    Platform { status: u16, body: String },

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Embedded shared data was located but is not valid JSON.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error("session cache error: {0}")]
    Cache(anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
