use serde_json::{json, Map, Value};
use url::Url;

use crate::error::CheckoutKitError;

/// Result of a redirect, extracted from the URL the app was opened with.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum RedirectDetails {
    /// `redirectResult` query parameter.
    RedirectResult {
        /// Parameter value.
        redirect_result: String,
    },
    /// `payload` query parameter.
    Payload {
        /// Parameter value.
        payload: String,
    },
    /// 3D Secure 1 return with `PaRes` and `MD`.
    PaResMd {
        /// `PaRes` value.
        pa_res: String,
        /// `MD` value.
        md: String,
    },
    /// None of the known parameters; the raw query string is forwarded.
    QueryString {
        /// Query string without the leading `?`.
        return_url_query_string: String,
    },
}

impl RedirectDetails {
    /// Extracts details from a return URL. Returns `None` if the URL has no query.
    #[must_use]
    pub fn from_return_url(url: &Url) -> Option<Self> {
        let query = url.query().filter(|query| !query.is_empty())?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        if let Some(redirect_result) = param("redirectResult") {
            return Some(Self::RedirectResult { redirect_result });
        }
        if let Some(payload) = param("payload") {
            return Some(Self::Payload { payload });
        }
        if let (Some(pa_res), Some(md)) = (param("PaRes"), param("MD")) {
            return Some(Self::PaResMd { pa_res, md });
        }
        Some(Self::QueryString {
            return_url_query_string: query.to_string(),
        })
    }

    fn to_details(&self) -> Value {
        match self {
            Self::RedirectResult { redirect_result } => json!({ "redirectResult": redirect_result }),
            Self::Payload { payload } => json!({ "payload": payload }),
            Self::PaResMd { pa_res, md } => json!({ "PaRes": pa_res, "MD": md }),
            Self::QueryString {
                return_url_query_string,
            } => json!({ "returnUrlQueryString": return_url_query_string }),
        }
    }
}

/// Variant specific result of a handled action.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ActionDetails {
    /// A redirect returned to the app.
    Redirect(RedirectDetails),
    /// Polling reached a final result.
    Await {
        /// Opaque status payload.
        payload: String,
    },
    /// Classic 3DS2 fingerprint.
    ThreeDS2Fingerprint {
        /// Base64 encoded fingerprint.
        fingerprint: String,
    },
    /// Classic 3DS2 challenge result.
    ThreeDS2ChallengeResult {
        /// Base64 encoded challenge result.
        challenge_result: String,
    },
    /// Compact 3DS2 flow finished.
    ThreeDS2Completed {
        /// Base64 encoded 3DS result.
        three_ds_result: String,
    },
    /// WeChat Pay returned to the app.
    WeChatPay {
        /// SDK result code.
        result_code: String,
    },
    /// The shopper finished a presentation-only action (voucher, document).
    Completed,
}

impl ActionDetails {
    /// The `details` object of a `/payments/details` request.
    #[must_use]
    pub fn to_details(&self) -> Value {
        match self {
            Self::Redirect(details) => details.to_details(),
            Self::Await { payload } => json!({ "payload": payload }),
            Self::ThreeDS2Fingerprint { fingerprint } => {
                json!({ "threeds2.fingerprint": fingerprint })
            }
            Self::ThreeDS2ChallengeResult { challenge_result } => {
                json!({ "threeds2.challengeResult": challenge_result })
            }
            Self::ThreeDS2Completed { three_ds_result } => {
                json!({ "threeDSResult": three_ds_result })
            }
            Self::WeChatPay { result_code } => json!({ "resultCode": result_code }),
            Self::Completed => Value::Object(Map::new()),
        }
    }
}

/// What a handled action delivers through `did_provide`: the details plus the action's
/// correlation token.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ActionComponentData {
    /// Variant specific result.
    pub details: ActionDetails,
    /// `paymentData` of the handled action, unchanged.
    pub payment_data: Option<String>,
}

impl ActionComponentData {
    /// The `/payments/details` request body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("details".to_string(), self.details.to_details());
        if let Some(payment_data) = &self.payment_data {
            body.insert("paymentData".to_string(), Value::String(payment_data.clone()));
        }
        Value::Object(body)
    }
}

/// Encodes `data` as a `/payments/details` request body.
///
/// # Errors
///
/// Returns `SerializationError` if encoding fails.
#[uniffi::export]
#[allow(clippy::needless_pass_by_value)]
pub fn encode_action_component_data(data: ActionComponentData) -> Result<String, CheckoutKitError> {
    serde_json::to_string(&data.to_json()).map_err(|e| CheckoutKitError::SerializationError {
        error: e.to_string(),
    })
}
