//! Client error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Authentication endpoint rejected the credentials or was unreachable
    #[error("authentication failed: {message}")]
    Auth {
        message: String,
        status: Option<u16>,
    },

    /// Storage call answered with a non-2xx status
    #[error("{method} {url} responded with statusCode: {status}, body: {body}")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Network-level failure (DNS, connection refused, protocol error)
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Configured timeout elapsed before the exchange completed
    #[error("{method} {url} timed out after {timeout:?}")]
    Timeout {
        method: String,
        url: String,
        timeout: Duration,
    },

    /// Attachment file could not be opened or read
    #[error("failed to read attachment {}: {source}", .path.display())]
    Stream {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Response body did not have the advertised shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Classify a reqwest failure for the exchange `method url`
    pub(crate) fn from_reqwest(
        err: reqwest::Error,
        method: &str,
        url: &str,
        timeout: Duration,
    ) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                method: method.to_string(),
                url: url.to_string(),
                timeout,
            }
        } else {
            Self::Transport(err)
        }
    }

    /// Check if this error is an elapsed timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the server answered 401
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Auth { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_message() {
        let error = ClientError::HttpStatus {
            method: "PUT".to_string(),
            url: "http://store/foo/small.jpg".to_string(),
            status: 500,
            body: "boom".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "PUT http://store/foo/small.jpg responded with statusCode: 500, body: boom"
        );
        assert_eq!(error.status(), Some(500));
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_auth_status() {
        let error = ClientError::Auth {
            message: "401 Unauthorized".to_string(),
            status: Some(401),
        };
        assert!(error.is_unauthorized());
    }

    #[test]
    fn test_stream_error_mentions_path() {
        let error = ClientError::Stream {
            path: PathBuf::from("/tmp/missing.bin"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(error.to_string().contains("/tmp/missing.bin"));
        assert_eq!(error.status(), None);
    }
}
