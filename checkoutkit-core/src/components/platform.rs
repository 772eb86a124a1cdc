//! Host capabilities the handlers call into: app launching, the native payment SDKs and
//! the 3D Secure 2 service.
//!
//! SDKs the host did not link are reported as `None` and the matching actions fail with
//! `PaymentMethodNotSupported`. SDKs that answer through a completion handler get a
//! responder object to call exactly once.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::action::WeChatPaySdkData;
use crate::persisted::KeyValueStore;

/// Response code of a successful Twint app switch (`B_SUCCESS`).
pub const TWINT_SUCCESS_CODE: i64 = 0;

/// An error reported synchronously by a native SDK call.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SdkError {
    /// SDK specific code.
    pub code: i64,
    /// SDK provided description.
    pub message: String,
}

/// An installed app able to complete a Twint payment.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct TwintAppConfiguration {
    /// Name shown in the picker, e.g. `UBS TWINT`.
    pub app_display_name: String,
    /// Scheme the app is opened with.
    pub app_url_scheme: String,
}

/// Opens URLs outside the host app.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait AppLauncher: Send + Sync {
    /// Opens a custom scheme URL. Returns whether an app took it.
    async fn open_custom_scheme_url(&self, url: String) -> bool;

    /// Opens an http(s) URL only if an installed app claims it as a universal link.
    /// Returns whether an app took it.
    async fn open_universal_app_url(&self, url: String) -> bool;
}

/// Twint SDK bridge.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait TwintSdk: Send + Sync {
    /// Lists the installed Twint apps. Empty if none is installed.
    async fn fetch_installed_app_configurations(&self) -> Vec<TwintAppConfiguration>;

    /// Starts a payment in `app`. Returns the SDK error if the app could not be opened.
    fn pay(
        &self,
        token: String,
        app: TwintAppConfiguration,
        callback_app_scheme: String,
    ) -> Option<SdkError>;

    /// Registers Twint for later one-click payments in `app`. Returns the SDK error if
    /// the app could not be opened.
    fn register_for_uof(
        &self,
        token: String,
        app: TwintAppConfiguration,
        callback_app_scheme: String,
    ) -> Option<SdkError>;

    /// Hands the return URL to the SDK. Returns `false` if the SDK does not recognise it;
    /// otherwise the SDK answers through `responder`.
    fn handle_open(&self, url: String, responder: Arc<SdkResponder>) -> bool;
}

/// WeChat Pay SDK bridge.
#[uniffi::export(with_foreign)]
pub trait WeChatPaySdk: Send + Sync {
    /// Whether the WeChat app is installed and supports payments.
    fn is_app_installed(&self) -> bool;

    /// Starts a payment. Returns `false` if WeChat could not be opened.
    fn send_pay_request(&self, data: WeChatPaySdkData) -> bool;

    /// Hands the return URL to the SDK. Returns `false` if the SDK does not recognise it;
    /// otherwise the SDK answers through `responder` with its `errCode`.
    fn handle_open_url(&self, url: String, responder: Arc<SdkResponder>) -> bool;
}

/// 3D Secure 2 SDK bridge.
#[uniffi::export(with_foreign)]
pub trait ThreeDS2Service: Send + Sync {
    /// Collects the device fingerprint for `token` and answers through `responder`.
    fn perform_fingerprint(&self, token: String, responder: Arc<ThreeDS2Responder>);

    /// Runs the challenge for `token` and answers through `responder`.
    fn perform_challenge(&self, token: String, responder: Arc<ThreeDS2Responder>);
}

/// Everything platform specific a handler may need.
#[uniffi::export(with_foreign)]
pub trait PlatformServices: Send + Sync {
    /// URL opening.
    fn app_launcher(&self) -> Arc<dyn AppLauncher>;

    /// Storage for state that must survive an app switch.
    fn key_value_store(&self) -> Arc<dyn KeyValueStore>;

    /// Twint SDK, if linked.
    fn twint(&self) -> Option<Arc<dyn TwintSdk>>;

    /// WeChat Pay SDK, if linked.
    fn wechat_pay(&self) -> Option<Arc<dyn WeChatPaySdk>>;

    /// 3D Secure 2 SDK, if linked.
    fn three_ds2(&self) -> Option<Arc<dyn ThreeDS2Service>>;
}

type Slot<T> = Mutex<Option<oneshot::Sender<T>>>;

fn answer<T>(slot: &Slot<T>, value: T, what: &str) {
    let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    match sender {
        Some(sender) => {
            if sender.send(value).is_err() {
                log::debug!("{what} answered after the flow ended");
            }
        }
        None => log::warn!("{what} answered more than once, ignoring"),
    }
}

/// One-shot completion handler for SDK callbacks.
#[derive(Debug, uniffi::Object)]
pub struct SdkResponder {
    sender: Slot<SdkError>,
}

impl SdkResponder {
    pub(crate) fn channel() -> (Arc<Self>, oneshot::Receiver<SdkError>) {
        let (sender, receiver) = oneshot::channel();
        (
            Arc::new(Self {
                sender: Mutex::new(Some(sender)),
            }),
            receiver,
        )
    }
}

#[uniffi::export]
impl SdkResponder {
    /// Reports the SDK's response code. Only the first call counts.
    pub fn respond(&self, code: i64, message: String) {
        answer(&self.sender, SdkError { code, message }, "sdk");
    }
}

/// One-shot completion handler for the 3D Secure 2 service.
#[derive(Debug, uniffi::Object)]
pub struct ThreeDS2Responder {
    sender: Slot<Result<String, String>>,
}

impl ThreeDS2Responder {
    pub(crate) fn channel() -> (Arc<Self>, oneshot::Receiver<Result<String, String>>) {
        let (sender, receiver) = oneshot::channel();
        (
            Arc::new(Self {
                sender: Mutex::new(Some(sender)),
            }),
            receiver,
        )
    }
}

#[uniffi::export]
impl ThreeDS2Responder {
    /// Reports the base64 encoded fingerprint or challenge result.
    pub fn succeed(&self, result: String) {
        answer(&self.sender, Ok(result), "3ds2 service");
    }

    /// Reports a failure of the 3D Secure 2 SDK.
    pub fn fail(&self, message: String) {
        answer(&self.sender, Err(message), "3ds2 service");
    }
}
