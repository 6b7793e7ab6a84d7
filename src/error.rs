//! Error types for the ChatMyCV client.
//!
//! Every failure a chat or clear request can hit maps onto one variant here.
//! The controller renders them into the transcript and status line instead of
//! returning them to its caller, so [`Error::message`] is the text users see.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Fixed user-facing message for a backend URL that cannot address a request.
pub const INVALID_BACKEND_URL: &str = "Backend URL is invalid";

/// The main error type for the ChatMyCV client.
#[derive(Clone, Debug)]
pub enum Error {
    /// Persisted settings could not be decoded.
    ///
    /// The configuration store recovers from this locally by falling back to
    /// the defaults; it never reaches the transcript.
    ConfigLoad {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The configured backend URL cannot be joined into a request target.
    InvalidBackendUrl {
        /// The base URL as configured.
        base_url: String,
        /// The underlying parse error, if any.
        source: Option<url::ParseError>,
    },

    /// Network-level failure reaching the server.
    Transport {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The server answered with a non-success HTTP status.
    Server {
        /// HTTP status code.
        status_code: u16,
        /// Server-provided error text, or a synthetic one carrying the status.
        message: String,
    },

    /// The response body is not the structured data we expect.
    MalformedResponse {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The server answered but declined the operation.
    Rejected {
        /// Server-provided error text, or a generic one.
        message: String,
    },

    /// The request did not settle within the configured timeout.
    Timeout {
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The request was cancelled by the operator.
    Cancelled,

    /// Durable storage could not be read or written.
    Storage {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// Error during JSON serialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new configuration load error.
    pub fn config_load(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::ConfigLoad {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new invalid backend URL error.
    pub fn invalid_backend_url(
        base_url: impl Into<String>,
        source: Option<url::ParseError>,
    ) -> Self {
        Error::InvalidBackendUrl {
            base_url: base_url.into(),
            source,
        }
    }

    /// Creates a new transport error.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new server error.
    pub fn server(status_code: u16, message: impl Into<String>) -> Self {
        Error::Server {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new malformed response error.
    pub fn malformed_response(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::MalformedResponse {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Error::Rejected {
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(duration: Option<f64>) -> Self {
        Error::Timeout { duration }
    }

    /// Creates a new storage error.
    pub fn storage(message: impl Into<String>, source: io::Error) -> Self {
        Error::Storage {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// The bare human-readable message, without a kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::ConfigLoad { message, .. } => message,
            Error::InvalidBackendUrl { .. } => INVALID_BACKEND_URL,
            Error::Transport { message, .. } => message,
            Error::Server { message, .. } => message,
            Error::MalformedResponse { message, .. } => message,
            Error::Rejected { message } => message,
            Error::Timeout { .. } => "Request timed out",
            Error::Cancelled => "Request cancelled",
            Error::Storage { message, .. } => message,
            Error::Serialization { message, .. } => message,
        }
    }

    /// Returns true if this error is an invalid backend URL.
    pub fn is_invalid_backend_url(&self) -> bool {
        matches!(self, Error::InvalidBackendUrl { .. })
    }

    /// Returns true if this error is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    /// Returns true if this error is a malformed response.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, Error::MalformedResponse { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigLoad { message, .. } => {
                write!(f, "Configuration load error: {message}")
            }
            Error::InvalidBackendUrl { base_url, .. } => {
                write!(f, "{INVALID_BACKEND_URL}: {base_url:?}")
            }
            Error::Transport { message, .. } => {
                write!(f, "Transport error: {message}")
            }
            Error::Server {
                status_code,
                message,
            } => {
                write!(f, "Server error ({status_code}): {message}")
            }
            Error::MalformedResponse { message, .. } => {
                write!(f, "Malformed response: {message}")
            }
            Error::Rejected { message } => {
                write!(f, "Rejected: {message}")
            }
            Error::Timeout { duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: request timed out ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: request timed out")
                }
            }
            Error::Cancelled => {
                write!(f, "Request cancelled")
            }
            Error::Storage { message, .. } => {
                write!(f, "Storage error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::ConfigLoad { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::InvalidBackendUrl { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            Error::Transport { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::MalformedResponse { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Storage { source, .. } => Some(source.as_ref()),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::storage(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for ChatMyCV operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_backend_url_has_fixed_message() {
        let err = Error::invalid_backend_url(
            "not a url",
            Some(url::ParseError::RelativeUrlWithoutBase),
        );
        assert_eq!(err.message(), "Backend URL is invalid");
        assert!(err.is_invalid_backend_url());
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn server_error_message_is_bare() {
        let err = Error::server(500, "overloaded");
        assert_eq!(err.message(), "overloaded");
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(err.to_string(), "Server error (500): overloaded");
    }

    #[test]
    fn timeout_and_cancel_messages() {
        assert_eq!(Error::timeout(Some(60.0)).message(), "Request timed out");
        assert_eq!(Error::Cancelled.message(), "Request cancelled");
        assert!(Error::Cancelled.is_cancelled());
        assert_eq!(Error::Cancelled.status_code(), None);
    }

    #[test]
    fn io_errors_become_storage_errors() {
        let err: Error = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, Error::Storage { .. }));
        assert_eq!(err.message(), "denied");
    }
}
