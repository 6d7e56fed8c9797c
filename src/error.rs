use thiserror::Error;

/// Failures raised by the session manager and its collaborators.
///
/// Gateway and storage callers are expected to catch these at the send
/// boundary; nothing here should reach the presentation layer uncaught.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    MalformedResponse(String),

    #[error("Invalid image payload: {0}")]
    Image(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No API key configured")]
    MissingApiKey,
}
