//! Error types for the Linode API client.

use thiserror::Error;

/// HTTP status the API uses for missing resources.
const NOT_FOUND: u16 = 404;

/// Errors raised by the Linode API client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// Raised when the request never produced an HTTP response.
    #[error("transport failure: {message}")]
    Transport {
        /// Message returned by the HTTP stack.
        message: String,
    },
    /// Raised when the API answers with a non-success status.
    #[error("API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Reasons reported by the API, joined with `; `.
        message: String,
    },
    /// Raised when a success response cannot be decoded.
    #[error("failed to decode API response: {message}")]
    Decode {
        /// Decoder error message.
        message: String,
    },
}

impl ApiError {
    /// Returns `true` when the API reported the resource as absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == NOT_FOUND)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Decode {
                message: value.to_string(),
            };
        }
        Self::Transport {
            message: value.to_string(),
        }
    }
}
