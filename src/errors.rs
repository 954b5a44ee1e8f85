use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur when using the Sensifai SDK.
#[derive(Error, Debug)]
pub enum SensifaiError {
    /// The client could not be configured (bad endpoint URL, missing token, ...).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The caller passed an empty list of files or URLs.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A local file passed to `upload_by_file` could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A transport-level HTTP error from reqwest.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-200 status, or reported GraphQL errors
    /// in place of data.
    #[error("service error {status_code}: {message}")]
    Service {
        status_code: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// The response body did not have the expected `data.<operation>` shape.
    #[error("cannot decode response: {message}")]
    Decode { message: String },

    /// `wait_for_result` gave up before the task finished.
    #[error("poll timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl SensifaiError {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        SensifaiError::Decode {
            message: message.into(),
        }
    }
}

/// A convenience alias for `Result<T, SensifaiError>`.
pub type Result<T> = std::result::Result<T, SensifaiError>;
