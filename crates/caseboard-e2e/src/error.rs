// Error types for caseboard-e2e

use thiserror::Error;

/// Result type alias for caseboard-e2e operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bootstrapping a dashboard session
#[derive(Debug, Error)]
pub enum Error {
    /// Remote authentication endpoint rejected the credentials
    ///
    /// The auth endpoint returned a non-success HTTP status. Carries the
    /// status code and the raw response body for diagnostics.
    #[error("Authentication failed with status {status}: {body}")]
    AuthenticationFailed { status: u16, body: String },

    /// Auth endpoint answered with success but no token was found
    ///
    /// The response parsed as JSON but none of the known token paths
    /// (`data.token`, `token`, `data.jwt`, `data.accessToken`) yielded a
    /// value. Lists the top-level keys actually present so a contract change
    /// on the server side is visible in the failure message.
    #[error("Authentication response contained no token; top-level keys present: [{}]", .keys.join(", "))]
    AuthTokenMissing { keys: Vec<String> },

    /// Session-state capture produced nothing worth persisting
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Timeout waiting for operation
    ///
    /// Contains context about what operation timed out and the timeout
    /// duration. Never retried internally; callers decide whether the
    /// surrounding test retries.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Navigation timeout
    ///
    /// Occurs when page navigation exceeds the specified timeout.
    /// Includes the URL being navigated to and timeout duration.
    #[error("Navigation timeout after {duration_ms}ms navigating to '{url}'")]
    NavigationTimeout { url: String, duration_ms: u64 },

    /// A caller-supplied post-bootstrap verification rejected the session
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Invalid argument provided to method
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Element not found by selector
    ///
    /// Raised by drivers when a login-form selector matches nothing.
    #[error("Element not found: selector '{0}'")]
    ElementNotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error talking to the auth endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error with additional context
    #[error("{0}: {1}")]
    Context(String, #[source] Box<Error>),
}

impl Error {
    /// Adds context to the error
    pub fn context(self, msg: impl Into<String>) -> Self {
        Error::Context(msg.into(), Box::new(self))
    }

    /// True for the bounded-wait failures (`Timeout`, `NavigationTimeout`).
    ///
    /// The bootstrapper uses this to decide whether a network-idle wait may
    /// fall back to a plain load-complete wait.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::NavigationTimeout { .. }
        ) || matches!(self, Error::Context(_, inner) if inner.is_timeout())
    }
}
