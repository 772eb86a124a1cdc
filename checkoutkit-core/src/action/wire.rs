//! Backend JSON shape of actions.
//!
//! The backend sends flat objects discriminated by `type`; SDK actions are further
//! discriminated by `paymentMethodType` and await actions by the presence of `url`.
//! Anything unknown is rejected.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    Action, AwaitAction, DocumentAction, QrCodeAction, RedirectAction, RedirectableAwaitAction,
    SdkAction, ThreeDS2Action, ThreeDS2ChallengeAction, ThreeDS2FingerprintAction, TwintSdkAction,
    VoucherAction, WeChatPaySdkAction,
};

const WECHAT_PAY_SDK: &str = "wechatpaySDK";
const TWINT: &str = "twint";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireAction {
    Redirect(RedirectAction),
    #[serde(rename = "threeDS2Fingerprint")]
    ThreeDS2Fingerprint(ThreeDS2FingerprintAction),
    #[serde(rename = "threeDS2Challenge")]
    ThreeDS2Challenge(ThreeDS2ChallengeAction),
    #[serde(rename = "threeDS2")]
    ThreeDS2(ThreeDS2Action),
    Sdk(WireSdkAction),
    Await(WireAwaitAction),
    Voucher(VoucherAction),
    QrCode(QrCodeAction),
    Document(DocumentAction),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSdkAction {
    payment_method_type: String,
    payment_data: Option<String>,
    sdk_data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAwaitAction {
    payment_data: String,
    payment_method_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

fn validate_url(field: &str, raw: &str) -> Result<(), String> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|e| format!("invalid {field} `{raw}`: {e}"))
}

impl TryFrom<WireSdkAction> for SdkAction {
    type Error = String;

    fn try_from(value: WireSdkAction) -> Result<Self, Self::Error> {
        match value.payment_method_type.as_str() {
            WECHAT_PAY_SDK => Ok(Self::WeChatPay(WeChatPaySdkAction {
                sdk_data: serde_json::from_value(value.sdk_data)
                    .map_err(|e| format!("invalid wechatpaySDK sdkData: {e}"))?,
                payment_data: value.payment_data,
            })),
            TWINT => Ok(Self::Twint(TwintSdkAction {
                sdk_data: serde_json::from_value(value.sdk_data)
                    .map_err(|e| format!("invalid twint sdkData: {e}"))?,
                payment_data: value
                    .payment_data
                    .ok_or_else(|| "missing field `paymentData` for twint".to_string())?,
            })),
            other => Err(format!("unsupported sdk payment method `{other}`")),
        }
    }
}

impl TryFrom<WireAction> for Action {
    type Error = String;

    fn try_from(value: WireAction) -> Result<Self, Self::Error> {
        Ok(match value {
            WireAction::Redirect(action) => {
                validate_url("url", &action.url)?;
                Self::Redirect(action)
            }
            WireAction::ThreeDS2Fingerprint(action) => Self::ThreeDS2Fingerprint(action),
            WireAction::ThreeDS2Challenge(action) => Self::ThreeDS2Challenge(action),
            WireAction::ThreeDS2(action) => Self::ThreeDS2(action),
            WireAction::Sdk(action) => Self::Sdk(action.try_into()?),
            WireAction::Await(WireAwaitAction {
                payment_data,
                payment_method_type,
                url: Some(url),
            }) => {
                validate_url("url", &url)?;
                Self::RedirectableAwait(RedirectableAwaitAction {
                    payment_data,
                    payment_method_type,
                    url,
                })
            }
            WireAction::Await(WireAwaitAction {
                payment_data,
                payment_method_type,
                url: None,
            }) => Self::Await(AwaitAction {
                payment_data,
                payment_method_type,
            }),
            WireAction::Voucher(action) => Self::Voucher(action),
            WireAction::QrCode(action) => Self::QrCode(action),
            WireAction::Document(action) => {
                validate_url("url", &action.url)?;
                Self::Document(action)
            }
        })
    }
}

impl From<Action> for WireAction {
    fn from(value: Action) -> Self {
        match value {
            Action::Redirect(action) => Self::Redirect(action),
            Action::ThreeDS2Fingerprint(action) => Self::ThreeDS2Fingerprint(action),
            Action::ThreeDS2Challenge(action) => Self::ThreeDS2Challenge(action),
            Action::ThreeDS2(action) => Self::ThreeDS2(action),
            Action::Sdk(SdkAction::WeChatPay(action)) => Self::Sdk(WireSdkAction {
                payment_method_type: WECHAT_PAY_SDK.to_string(),
                payment_data: action.payment_data,
                sdk_data: serde_json::to_value(action.sdk_data).unwrap_or_default(),
            }),
            Action::Sdk(SdkAction::Twint(action)) => Self::Sdk(WireSdkAction {
                payment_method_type: TWINT.to_string(),
                payment_data: Some(action.payment_data),
                sdk_data: serde_json::to_value(action.sdk_data).unwrap_or_default(),
            }),
            Action::Await(action) => Self::Await(WireAwaitAction {
                payment_data: action.payment_data,
                payment_method_type: action.payment_method_type,
                url: None,
            }),
            Action::RedirectableAwait(action) => Self::Await(WireAwaitAction {
                payment_data: action.payment_data,
                payment_method_type: action.payment_method_type,
                url: Some(action.url),
            }),
            Action::Voucher(action) => Self::Voucher(action),
            Action::QrCode(action) => Self::QrCode(action),
            Action::Document(action) => Self::Document(action),
        }
    }
}
