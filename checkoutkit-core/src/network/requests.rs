//! Typed checkout shopper endpoints.
//!
//! Field names follow the backend contract and must not be changed.

use serde::{Deserialize, Serialize};

use super::{ApiRequest, HttpMethod};
use crate::action::Action;
use crate::config::ApiContext;

/// Monetary amount in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Amount {
    /// Value in minor units, e.g. cents.
    pub value: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Status of an asynchronous payment, polled by await, QR code and Twint flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    /// Correlation token of the action being polled.
    pub payment_data: String,
}

/// Response of [`PaymentStatusRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    /// Opaque result handed to `/payments/details`.
    pub payload: String,
    /// `pending`, `received`, `authorised`, `refused`, ...
    pub result_code: String,
}

impl PaymentStatusResponse {
    /// Whether the shopper has not finished yet and polling should continue.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.result_code.as_str(), "pending" | "received")
    }
}

impl ApiRequest for PaymentStatusRequest {
    type Response = PaymentStatusResponse;

    fn path(&self, _context: &ApiContext) -> String {
        "services/PaymentInitiation/v1/status".to_string()
    }

    fn query(&self, context: &ApiContext) -> Vec<(&'static str, String)> {
        vec![("token", context.client_key())]
    }
}

/// Exchanges a native redirect return for a `redirectResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeRedirectResultRequest {
    /// `nativeRedirectData` of the redirect action.
    pub redirect_data: String,
    /// Query string of the URL the app was opened with.
    pub return_query_string: String,
}

/// Response of [`NativeRedirectResultRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeRedirectResultResponse {
    /// Value for the `redirectResult` details key.
    pub redirect_result: String,
}

impl ApiRequest for NativeRedirectResultRequest {
    type Response = NativeRedirectResultResponse;

    fn path(&self, _context: &ApiContext) -> String {
        "v1/nativeRedirect/redirectResult".to_string()
    }
}

/// Submits a compact 3DS2 fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDS2FingerprintSubmitRequest {
    /// Base64 encoded fingerprint produced by the 3DS2 service.
    pub fingerprint_result: String,
    /// Correlation token of the `threeDS2` action.
    pub payment_data: Option<String>,
}

/// Details of a 3DS2 flow that completed without a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDSResultDetails {
    /// Value for the `threeDSResult` details key.
    #[serde(rename = "threeDSResult")]
    pub three_ds_result: String,
}

/// Response of [`ThreeDS2FingerprintSubmitRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ThreeDS2FingerprintSubmitResponse {
    /// The flow continues with another action (challenge or redirect).
    Action {
        /// The follow-up action.
        action: Action,
    },
    /// The flow is done.
    Completed {
        /// Result details.
        details: ThreeDSResultDetails,
    },
}

impl ApiRequest for ThreeDS2FingerprintSubmitRequest {
    type Response = ThreeDS2FingerprintSubmitResponse;

    fn path(&self, _context: &ApiContext) -> String {
        "v1/submitThreeDS2Fingerprint".to_string()
    }

    fn query(&self, context: &ApiContext) -> Vec<(&'static str, String)> {
        vec![("token", context.client_key())]
    }
}

/// Balance of a gift card or prepaid method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceCheckRequest {
    /// Encrypted payment method details, as produced by the payment method component.
    pub payment_method: serde_json::Value,
    /// Amount the shopper wants to pay.
    pub amount: Amount,
}

/// Response of [`BalanceCheckRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct BalanceCheckResponse {
    /// Available balance.
    pub balance: Amount,
    /// Maximum amount that may be charged in one transaction, if limited.
    pub transaction_limit: Option<Amount>,
}

impl ApiRequest for BalanceCheckRequest {
    type Response = BalanceCheckResponse;

    fn path(&self, _context: &ApiContext) -> String {
        "v1/paymentMethods/balance".to_string()
    }
}

/// Status of a partial payment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusRequest {
    /// `orderData` of the order.
    pub order_data: String,
}

/// A payment method already used towards an order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentMethod {
    /// Payment method type, e.g. `givex`.
    #[serde(rename = "type")]
    pub method_type: String,
    /// Last four digits of the card used.
    pub last_four: Option<String>,
    /// Amount paid with this method.
    pub amount: Amount,
}

/// Response of [`OrderStatusRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    /// Amount still to be paid.
    pub remaining_amount: Amount,
    /// Methods already used.
    #[serde(default)]
    pub payment_methods: Vec<OrderPaymentMethod>,
}

impl ApiRequest for OrderStatusRequest {
    type Response = OrderStatusResponse;

    fn path(&self, _context: &ApiContext) -> String {
        "v1/order/status".to_string()
    }
}

/// Public key of the client key, used by card encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientKeyRequest;

/// Response of [`ClientKeyRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientKeyResponse {
    /// RSA public key, `exponent|modulus` in hex.
    pub public_key: String,
}

impl ApiRequest for ClientKeyRequest {
    type Response = ClientKeyResponse;
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self, context: &ApiContext) -> String {
        format!("v1/clientKeys/{}", context.client_key())
    }

    fn query(&self, _context: &ApiContext) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    const CLIENT_KEY: &str = "test_ABCDEFGHIJKLMNOPQRSTUVWXYZ123456";

    fn context() -> ApiContext {
        ApiContext::new(Environment::Test, CLIENT_KEY).unwrap()
    }

    #[test]
    fn test_payment_status_request_shape() {
        let request = PaymentStatusRequest {
            payment_data: "Ab02b4c0!BQABAgA=".to_string(),
        }
        .to_http_request(&context())
        .unwrap();

        assert_eq!(
            request.url.as_str(),
            format!("https://checkoutshopper-test.adyen.com/checkoutshopper/services/PaymentInitiation/v1/status?token={CLIENT_KEY}")
        );
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"paymentData":"Ab02b4c0!BQABAgA="}"#)
        );
    }

    #[test]
    fn test_client_key_request_is_a_bare_get() {
        let request = ClientKeyRequest.to_http_request(&context()).unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.body, None);
        assert!(request.url.query().is_none());
        assert!(request.url.path().ends_with(CLIENT_KEY));
    }

    #[test]
    fn test_pending_result_codes() {
        let response: PaymentStatusResponse =
            serde_json::from_str(r#"{"payload":"p","resultCode":"received"}"#).unwrap();
        assert!(response.is_pending());
        let response: PaymentStatusResponse =
            serde_json::from_str(r#"{"payload":"p","resultCode":"authorised"}"#).unwrap();
        assert!(!response.is_pending());
    }

    #[test]
    fn test_fingerprint_submit_responses() {
        let completed: ThreeDS2FingerprintSubmitResponse = serde_json::from_str(
            r#"{"type":"completed","details":{"threeDSResult":"eyJ0cmFuc1N0YXR1cyI6IlkifQ=="}}"#,
        )
        .unwrap();
        assert_eq!(
            completed,
            ThreeDS2FingerprintSubmitResponse::Completed {
                details: ThreeDSResultDetails {
                    three_ds_result: "eyJ0cmFuc1N0YXR1cyI6IlkifQ==".to_string()
                }
            }
        );

        let action: ThreeDS2FingerprintSubmitResponse = serde_json::from_str(
            r#"{"type":"action","action":{"type":"redirect","url":"https://bank.example/3ds","paymentData":"pd","paymentMethodType":"scheme"}}"#,
        )
        .unwrap();
        assert!(matches!(
            action,
            ThreeDS2FingerprintSubmitResponse::Action {
                action: Action::Redirect(_)
            }
        ));
    }

    #[test]
    fn test_order_status_without_methods() {
        let response: OrderStatusResponse = serde_json::from_str(
            r#"{"remainingAmount":{"value":1500,"currency":"EUR"}}"#,
        )
        .unwrap();
        assert_eq!(response.remaining_amount.value, 1500);
        assert!(response.payment_methods.is_empty());
    }
}
