use thiserror::Error;

/// Typed error enum for item loading
///
/// Runtime failures (`Network`, `Status`, `MalformedResponse`) never escape
/// `load_next_page`; they end growth of the affected loader. Construction
/// failures (`Misconfigured`, `NoRuntime`) are returned from the builders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// Network/connection errors (timeout, connection refused, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body is not JSON or lacks the results field
    #[error("Malformed page response: {0}")]
    MalformedResponse(String),

    /// Invalid construction parameters
    #[error("Loader misconfigured: {0}")]
    Misconfigured(String),

    /// A network loader was built outside of a tokio runtime
    #[error("No tokio runtime available to drive page requests")]
    NoRuntime,
}

impl LoaderError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LoaderError::Network(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            LoaderError::Network(format!("Connection failed: {}", error))
        } else if error.is_decode() {
            LoaderError::MalformedResponse(error.to_string())
        } else {
            LoaderError::Network(error.to_string())
        }
    }

    /// Create an error from an HTTP status code and response body
    pub fn from_status(status: u16, body: String) -> Self {
        LoaderError::Status { status, body }
    }

    pub fn misconfigured(message: impl Into<String>) -> Self {
        LoaderError::Misconfigured(message.into())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(error: serde_json::Error) -> Self {
        LoaderError::MalformedResponse(error.to_string())
    }
}

impl From<url::ParseError> for LoaderError {
    fn from(error: url::ParseError) -> Self {
        LoaderError::Misconfigured(format!("invalid URL: {}", error))
    }
}
