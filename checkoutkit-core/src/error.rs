use thiserror::Error;

use crate::network::ApiError;
use crate::persisted::StoreError;

/// Error outputs from `CheckoutKit` exported functions.
#[derive(Debug, Error, uniffi::Error)]
pub enum CheckoutKitError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The attribute that was rejected.
        attribute: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The client key is malformed or does not belong to the selected environment
    #[error("invalid_client_key: {reason}")]
    InvalidClientKey {
        /// Why the key was rejected.
        reason: String,
    },
    /// A backend payload could not be decoded
    #[error("decoding_error: {error}")]
    DecodingError {
        /// Decoder message.
        error: String,
    },
    /// Unexpected error serializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Encoder message.
        error: String,
    },
    /// A request against the checkout backend failed
    #[error("network_error: {error}")]
    NetworkError {
        /// The underlying failure.
        error: ApiError,
    },
    /// The host key-value store failed
    #[error("storage_error: {error}")]
    StorageError {
        /// The underlying failure.
        error: String,
    },
    /// The operation is not allowed in the component's current state
    #[error("invalid_state: {reason}")]
    InvalidState {
        /// Description of the violated expectation.
        reason: String,
    },
}

impl From<ApiError> for CheckoutKitError {
    fn from(error: ApiError) -> Self {
        Self::NetworkError { error }
    }
}

impl From<StoreError> for CheckoutKitError {
    fn from(error: StoreError) -> Self {
        Self::StorageError {
            error: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for CheckoutKitError {
    fn from(error: serde_json::Error) -> Self {
        Self::DecodingError {
            error: error.to_string(),
        }
    }
}

/// Terminal failure delivered through `ActionComponentDelegate::did_fail`.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Enum)]
pub enum ActionError {
    /// The shopper dismissed the presented surface or cancelled a picker.
    #[error("cancelled")]
    Cancelled,
    /// The app required to continue the payment is not installed.
    #[error("app_not_found: {message}")]
    AppNotFound {
        /// Human readable explanation.
        message: String,
    },
    /// The action requires an SDK integration the host did not provide.
    #[error("payment_method_not_supported")]
    PaymentMethodNotSupported,
    /// A backend request failed after retries were exhausted.
    #[error("network: {0}")]
    Network(ApiError),
    /// The QR code was not paid before it expired.
    #[error("qr_code_expired")]
    QrCodeExpired,
    /// A native payment SDK reported an error.
    #[error("sdk_error_{code}: {message}")]
    Sdk {
        /// SDK specific error code.
        code: i64,
        /// SDK provided message.
        message: String,
    },
    /// The 3D Secure 2 service failed.
    #[error("three_ds2: {message}")]
    ThreeDS2 {
        /// Service provided message.
        message: String,
    },
    /// The backend answered with an action this flow cannot continue with.
    #[error("unexpected_action")]
    UnexpectedAction,
}

impl ActionError {
    /// Text shown to the shopper when the failure is rendered as an alert.
    ///
    /// Only environment failures carry one; the rest are either silent (cancellation)
    /// or handled by the host's own error screen.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::AppNotFound { message } | Self::Sdk { message, .. } => Some(message.clone()),
            Self::PaymentMethodNotSupported => {
                Some("This payment method is not supported on this device.".to_string())
            }
            Self::QrCodeExpired => Some("The QR code has expired.".to_string()),
            Self::Cancelled
            | Self::Network(_)
            | Self::ThreeDS2 { .. }
            | Self::UnexpectedAction => None,
        }
    }

    /// Whether the failure is an environment condition that a presenting layer shows
    /// before forwarding it.
    #[must_use]
    pub fn is_environment_failure(&self) -> bool {
        self.user_message().is_some()
    }
}

impl From<ApiError> for ActionError {
    fn from(error: ApiError) -> Self {
        Self::Network(error)
    }
}
