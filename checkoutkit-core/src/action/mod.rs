//! Server issued instructions for continuing a payment.

use serde::{Deserialize, Serialize};

use crate::error::CheckoutKitError;

mod data;
pub use data::*;

mod wire;

/// How the shopper continues an in-flight payment.
///
/// Every variant carries the backend's `paymentData` correlation token, threaded unchanged
/// into follow-up requests and the final [`ActionComponentData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(try_from = "wire::WireAction", into = "wire::WireAction")]
pub enum Action {
    /// Open a URL in another app or a browser and wait for the return URL.
    Redirect(RedirectAction),
    /// Classic 3DS2 device fingerprint.
    ThreeDS2Fingerprint(ThreeDS2FingerprintAction),
    /// Classic 3DS2 challenge, following a fingerprint.
    ThreeDS2Challenge(ThreeDS2ChallengeAction),
    /// Compact 3DS2 flow, fingerprint or challenge.
    ThreeDS2(ThreeDS2Action),
    /// Hand off to a native payment SDK.
    Sdk(SdkAction),
    /// Wait for the shopper to approve the payment elsewhere.
    Await(AwaitAction),
    /// Open a URL and wait, accepting whichever of return URL and status poll comes first.
    RedirectableAwait(RedirectableAwaitAction),
    /// Show a voucher to be paid offline.
    Voucher(VoucherAction),
    /// Show a QR code to be scanned with another device.
    QrCode(QrCodeAction),
    /// Show a document, e.g. a direct debit mandate.
    Document(DocumentAction),
}

impl Action {
    /// The correlation token carried by the action.
    #[must_use]
    pub fn payment_data(&self) -> Option<String> {
        match self {
            Self::Redirect(action) => action.payment_data.clone(),
            Self::ThreeDS2Fingerprint(action) => action.payment_data.clone(),
            Self::ThreeDS2Challenge(action) => action.payment_data.clone(),
            Self::ThreeDS2(action) => action.payment_data.clone(),
            Self::Sdk(SdkAction::WeChatPay(action)) => action.payment_data.clone(),
            Self::Sdk(SdkAction::Twint(action)) => Some(action.payment_data.clone()),
            Self::Await(action) => Some(action.payment_data.clone()),
            Self::RedirectableAwait(action) => Some(action.payment_data.clone()),
            Self::Voucher(action) => action.payment_data.clone(),
            Self::QrCode(action) => Some(action.payment_data.clone()),
            Self::Document(action) => action.payment_data.clone(),
        }
    }

    /// Backend `type` discriminator of the action.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Redirect(_) => "redirect",
            Self::ThreeDS2Fingerprint(_) => "threeDS2Fingerprint",
            Self::ThreeDS2Challenge(_) => "threeDS2Challenge",
            Self::ThreeDS2(_) => "threeDS2",
            Self::Sdk(_) => "sdk",
            Self::Await(_) | Self::RedirectableAwait(_) => "await",
            Self::Voucher(_) => "voucher",
            Self::QrCode(_) => "qrCode",
            Self::Document(_) => "document",
        }
    }
}

/// HTTP method a redirect URL must be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "UPPERCASE")]
pub enum RedirectMethod {
    /// Plain navigation.
    #[default]
    Get,
    /// Form post, only possible in a browser.
    Post,
}

/// Redirect to an issuer, a bank app or any other external page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAction {
    /// Custom scheme or http(s) URL to open.
    pub url: String,
    /// Method the URL is opened with.
    #[serde(default)]
    pub method: RedirectMethod,
    /// Correlation token.
    pub payment_data: Option<String>,
    /// Present only for native redirects, which need a follow-up request on return.
    pub native_redirect_data: Option<String>,
    /// Payment method that issued the action.
    pub payment_method_type: Option<String>,
}

/// Classic 3DS2 device fingerprint request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDS2FingerprintAction {
    /// Base64 encoded fingerprint token.
    pub token: String,
    /// Correlation token.
    pub payment_data: Option<String>,
}

/// Classic 3DS2 challenge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDS2ChallengeAction {
    /// Base64 encoded challenge token.
    pub token: String,
    /// Correlation token.
    pub payment_data: Option<String>,
}

/// Step of a compact 3DS2 flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
pub enum ThreeDS2Subtype {
    /// Collect the device fingerprint.
    Fingerprint,
    /// Run the challenge.
    Challenge,
}

/// Compact 3DS2 action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDS2Action {
    /// Base64 encoded fingerprint or challenge token.
    pub token: String,
    /// Which step to run.
    pub subtype: ThreeDS2Subtype,
    /// Token authorising the fingerprint submission.
    pub authorisation_token: Option<String>,
    /// Correlation token.
    pub payment_data: Option<String>,
}

/// Native SDK handoff, by SDK.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum SdkAction {
    /// WeChat Pay (`wechatpaySDK`).
    WeChatPay(WeChatPaySdkAction),
    /// Twint (`twint`).
    Twint(TwintSdkAction),
}

/// Parameters the WeChat Pay SDK needs to start a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct WeChatPaySdkData {
    /// WeChat app id.
    #[serde(rename = "appid")]
    pub app_identifier: String,
    /// Merchant id.
    #[serde(rename = "partnerid")]
    pub partner_identifier: String,
    /// Prepay id.
    #[serde(rename = "prepayid")]
    pub prepay_identifier: String,
    /// Random nonce.
    #[serde(rename = "noncestr")]
    pub nonce: String,
    /// Unix timestamp, as a string.
    pub timestamp: String,
    /// Usually `Sign=WXPay`.
    #[serde(rename = "packageValue")]
    pub package: String,
    /// Request signature.
    pub sign: String,
}

/// WeChat Pay handoff.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct WeChatPaySdkAction {
    /// SDK parameters.
    pub sdk_data: WeChatPaySdkData,
    /// Correlation token.
    pub payment_data: Option<String>,
}

/// Parameters the Twint SDK needs to start a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct TwintSdkData {
    /// Payment token passed to the Twint app.
    pub token: String,
    /// The shopper asked to store Twint for later payments (register instead of pay).
    #[serde(default)]
    pub is_stored: bool,
}

/// Twint handoff. Completion is confirmed by polling, so the correlation token is required.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct TwintSdkAction {
    /// SDK parameters.
    pub sdk_data: TwintSdkData,
    /// Correlation token, used for polling after the app returns.
    pub payment_data: String,
}

/// Wait for an out of band approval (MB WAY, BLIK, UPI collect, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct AwaitAction {
    /// Correlation token, used for polling.
    pub payment_data: String,
    /// Payment method that issued the action.
    pub payment_method_type: String,
}

/// Await action that can also be completed through a return URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct RedirectableAwaitAction {
    /// Correlation token, used for polling.
    pub payment_data: String,
    /// Payment method that issued the action.
    pub payment_method_type: String,
    /// URL to open, usually a banking app link.
    pub url: String,
}

/// Voucher to be paid at a shop, bank or ATM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct VoucherAction {
    /// Payment method that issued the voucher, e.g. `doku_alfamart`.
    pub payment_method_type: String,
    /// Reference the shopper quotes when paying.
    pub reference: Option<String>,
    /// Amount to pay including fees.
    pub total_amount: Option<crate::network::requests::Amount>,
    /// Amount of the order.
    pub initial_amount: Option<crate::network::requests::Amount>,
    /// Expiry, as sent by the backend.
    pub expires_at: Option<String>,
    /// Merchant display name.
    pub merchant_name: Option<String>,
    /// Page with payment instructions.
    pub instructions_url: Option<String>,
    /// Printable voucher.
    pub download_url: Option<String>,
    /// Correlation token.
    pub payment_data: Option<String>,
}

/// QR code to scan with a banking or wallet app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeAction {
    /// Payment method that issued the code, e.g. `pix`.
    pub payment_method_type: String,
    /// Payload encoded in the QR code.
    pub qr_code_data: String,
    /// Correlation token, used for polling.
    pub payment_data: String,
}

/// Document to show, e.g. a direct debit mandate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAction {
    /// Payment method that issued the document.
    pub payment_method_type: String,
    /// Location of the document.
    pub url: String,
    /// Correlation token.
    pub payment_data: Option<String>,
}

/// Decodes an action as returned by `/payments` or `/payments/details`.
///
/// # Errors
///
/// Returns `DecodingError` for malformed JSON, missing fields, invalid URLs and unknown
/// `type` or SDK values.
#[uniffi::export]
pub fn decode_action(json: &str) -> Result<Action, CheckoutKitError> {
    Ok(serde_json::from_str(json)?)
}

/// Encodes an action back into its backend JSON shape.
///
/// # Errors
///
/// Returns `SerializationError` if encoding fails.
#[uniffi::export]
#[allow(clippy::needless_pass_by_value)]
pub fn encode_action(action: Action) -> Result<String, CheckoutKitError> {
    serde_json::to_string(&action).map_err(|e| CheckoutKitError::SerializationError {
        error: e.to_string(),
    })
}
