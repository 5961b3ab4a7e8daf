use thiserror::Error;

/// Transport-level fetch failures. An HTTP error status is not a
/// `FetchError`; it comes back as a captured response, the way the
/// platform's fetch resolves for 4xx/5xx.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}
