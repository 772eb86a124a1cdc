use thiserror::Error;

/// Failure of a single request against the checkout backend.
///
/// Values travel unchanged from the transport up to `ActionComponentDelegate::did_fail`,
/// so the original cause is never lost behind a generic wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Enum)]
pub enum ApiError {
    /// The request never produced an HTTP response (timeout, DNS, TLS, connection reset).
    #[error("transport_error: {url}: {error}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Transport level description.
        error: String,
        /// Whether repeating the request may succeed.
        retryable: bool,
    },
    /// The backend answered with a non-success status code.
    #[error("http_error: {url} returned {status}: {message}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Backend error code (`errorCode`), when the body carried one.
        error_code: Option<String>,
        /// Backend message, or the raw body when it was not a checkout error body.
        message: String,
    },
    /// The response body could not be decoded into the expected shape.
    #[error("decoding_error: {url}: {error}")]
    Decoding {
        /// Requested URL.
        url: String,
        /// Decoder message.
        error: String,
    },
    /// The request could not be built (bad URL, unserializable body).
    #[error("invalid_request: {error}")]
    InvalidRequest {
        /// Description of the problem.
        error: String,
    },
}

impl ApiError {
    /// Whether the failure is transient: HTTP 429, any 5xx, timeouts and connection failures.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Decoding { .. } | Self::InvalidRequest { .. } => false,
        }
    }

    /// HTTP status code of the failure, if the backend answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub(crate) const fn is_retryable_status(status: u16) -> bool {
    status == 429 || (status >= 500 && status < 600)
}
