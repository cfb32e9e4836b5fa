use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebDriverError>;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Driver unreachable: {0}")]
    Unreachable(String),

    /// A W3C error envelope. `error` is the protocol error code, e.g. `no such element`.
    #[error("WebDriver error (status {status}, {error}): {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl WebDriverError {
    /// The session is gone or the driver cannot be reached; no further command will succeed.
    pub fn is_session_lost(&self) -> bool {
        match self {
            WebDriverError::Unreachable(_) => true,
            WebDriverError::Api { error, .. } => {
                error == "invalid session id" || error == "session not created"
            }
            WebDriverError::Network(_) | WebDriverError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for WebDriverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            WebDriverError::Unreachable(err.to_string())
        } else {
            WebDriverError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WebDriverError {
    fn from(err: serde_json::Error) -> Self {
        WebDriverError::Parse(err.to_string())
    }
}
