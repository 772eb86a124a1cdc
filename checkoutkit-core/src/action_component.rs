//! Routes every action to the handler for its variant.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use url::Url;

use crate::action::{Action, SdkAction};
use crate::assertion::assertion_failure;
use crate::components::{
    complete_return, has_query, run_to_completion, ActionComponentDelegate, ActionContext,
    AwaitComponent, CancelToken, ComponentKind, DocumentComponent, Outcome, PlatformServices,
    PresentationDelegate, QrCodeComponent, RedirectComponent, RedirectableAwaitComponent,
    ThreeDS2Component, TwintSdkComponent, VoucherComponent, WeChatPaySdkComponent,
};
use crate::config::{ActionConfiguration, ApiContext};
use crate::network::{ApiClient, HttpApiClient};
use crate::redirect_listener::RedirectListener;

const CHALLENGE_WITHOUT_FINGERPRINT: &str = "ThreeDS2Component is nil. There must be a ThreeDS2FingerprintAction action preceding a ThreeDS2ChallengeAction action";

/// The handler currently driving an action.
enum Current {
    Redirect(Arc<RedirectComponent>),
    ThreeDS2(Arc<ThreeDS2Component>),
    Await(Arc<AwaitComponent>),
    RedirectableAwait(Arc<RedirectableAwaitComponent>),
    QrCode(Arc<QrCodeComponent>),
    Twint(Arc<TwintSdkComponent>),
    WeChatPay(Arc<WeChatPaySdkComponent>),
    Voucher(Arc<VoucherComponent>),
    Document(Arc<DocumentComponent>),
}

impl Current {
    const fn kind(&self) -> ComponentKind {
        match self {
            Self::Redirect(_) => ComponentKind::Redirect,
            Self::ThreeDS2(_) => ComponentKind::ThreeDS2,
            Self::Await(_) => ComponentKind::Await,
            Self::RedirectableAwait(_) => ComponentKind::RedirectableAwait,
            Self::QrCode(_) => ComponentKind::QrCode,
            Self::Twint(_) => ComponentKind::Twint,
            Self::WeChatPay(_) => ComponentKind::WeChatPay,
            Self::Voucher(_) => ComponentKind::Voucher,
            Self::Document(_) => ComponentKind::Document,
        }
    }

    fn cancel(&self) {
        match self {
            Self::Redirect(component) => component.cancel(),
            Self::ThreeDS2(component) => component.cancel(),
            Self::Await(component) => component.cancel(),
            Self::RedirectableAwait(component) => component.cancel(),
            Self::QrCode(component) => component.cancel(),
            Self::Twint(component) => component.cancel(),
            Self::WeChatPay(component) => component.cancel(),
            Self::Voucher(component) => component.cancel(),
            Self::Document(component) => component.cancel(),
        }
    }
}

/// Entry point for handling actions returned by `/payments` and `/payments/details`.
///
/// Holds the host's delegates strongly and hands its handlers weak references only.
/// Handling a new action supersedes the one in flight: the old handler stops without
/// calling back.
#[derive(uniffi::Object)]
pub struct ActionComponent {
    api_context: Arc<ApiContext>,
    api_client: Arc<dyn ApiClient>,
    configuration: ActionConfiguration,
    platform: Arc<dyn PlatformServices>,
    redirect_listener: Arc<RedirectListener>,
    delegate: Mutex<Option<Arc<dyn ActionComponentDelegate>>>,
    presentation_delegate: Mutex<Option<Arc<dyn PresentationDelegate>>>,
    current: Mutex<Option<Current>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ActionComponent {
    /// Creates a dispatcher with an explicit API client and redirect listener.
    #[must_use]
    pub fn with_dependencies(
        api_context: Arc<ApiContext>,
        api_client: Arc<dyn ApiClient>,
        configuration: ActionConfiguration,
        platform: Arc<dyn PlatformServices>,
        redirect_listener: Arc<RedirectListener>,
    ) -> Self {
        Self {
            api_context,
            api_client,
            configuration,
            platform,
            redirect_listener,
            delegate: Mutex::new(None),
            presentation_delegate: Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    fn context(&self) -> ActionContext {
        let mut context = ActionContext::new(
            self.api_context.clone(),
            self.api_client.clone(),
            self.configuration.clone(),
            self.platform.clone(),
            self.redirect_listener.clone(),
        );
        context.delegate = lock(&self.delegate).as_ref().map(Arc::downgrade);
        context.presentation_delegate = lock(&self.presentation_delegate)
            .as_ref()
            .map(Arc::downgrade);
        context
    }

    /// Makes `component` the current handler, cancelling the one it replaces.
    fn install<C>(&self, wrap: fn(Arc<C>) -> Current, component: C) -> Arc<C> {
        let component = Arc::new(component);
        let previous = lock(&self.current).replace(wrap(component.clone()));
        if let Some(previous) = previous {
            log::debug!("{} superseded by a new action", previous.kind());
            previous.cancel();
            self.redirect_listener.unregister();
        }
        component
    }

    fn current_three_ds2(&self) -> Option<Arc<ThreeDS2Component>> {
        match lock(&self.current).as_ref() {
            Some(Current::ThreeDS2(component)) => Some(component.clone()),
            _ => None,
        }
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl ActionComponent {
    /// Creates a dispatcher talking to the checkout backend of `api_context`.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(
        api_context: Arc<ApiContext>,
        configuration: ActionConfiguration,
        platform: Arc<dyn PlatformServices>,
    ) -> Self {
        let api_client = Arc::new(HttpApiClient::new(&api_context));
        Self::with_dependencies(
            api_context,
            api_client,
            configuration,
            platform,
            RedirectListener::shared(),
        )
    }

    /// Sets the receiver of terminal results.
    pub fn set_delegate(&self, delegate: Arc<dyn ActionComponentDelegate>) {
        *lock(&self.delegate) = Some(delegate);
    }

    /// Sets the host UI layer handlers present their surfaces on.
    pub fn set_presentation_delegate(&self, delegate: Arc<dyn PresentationDelegate>) {
        *lock(&self.presentation_delegate) = Some(delegate);
    }

    /// Handles `action` until it reaches its terminal outcome or a newer action replaces it.
    pub async fn handle(&self, action: Action) -> Outcome {
        log::info!("handling {} action", action.type_name());
        let context = self.context();
        match action {
            Action::Redirect(action) => {
                let component = self.install(Current::Redirect, RedirectComponent::new(context));
                component.handle(action).await
            }
            Action::ThreeDS2Fingerprint(action) => {
                let component = self.install(Current::ThreeDS2, ThreeDS2Component::new(context));
                component.handle_fingerprint(action).await
            }
            Action::ThreeDS2Challenge(action) => {
                let Some(component) = self.current_three_ds2() else {
                    assertion_failure(CHALLENGE_WITHOUT_FINGERPRINT);
                    return Outcome::Abandoned;
                };
                component.handle_challenge(action).await
            }
            Action::ThreeDS2(action) => {
                let component = self.install(Current::ThreeDS2, ThreeDS2Component::new(context));
                component.handle_compact(action).await
            }
            Action::Sdk(SdkAction::Twint(action)) => {
                let component = self.install(Current::Twint, TwintSdkComponent::new(context));
                component.handle(action).await
            }
            Action::Sdk(SdkAction::WeChatPay(action)) => {
                let component =
                    self.install(Current::WeChatPay, WeChatPaySdkComponent::new(context));
                component.handle(action).await
            }
            Action::Await(action) => {
                let component = self.install(Current::Await, AwaitComponent::new(context));
                component.handle(action).await
            }
            Action::RedirectableAwait(action) => {
                let component = self.install(
                    Current::RedirectableAwait,
                    RedirectableAwaitComponent::new(context),
                );
                component.handle(action).await
            }
            Action::Voucher(action) => {
                let component = self.install(Current::Voucher, VoucherComponent::new(context));
                component.handle(action).await
            }
            Action::QrCode(action) => {
                let component = self.install(Current::QrCode, QrCodeComponent::new(context));
                component.handle(action).await
            }
            Action::Document(action) => {
                let component = self.install(Current::Document, DocumentComponent::new(context));
                component.handle(action).await
            }
        }
    }

    /// Kind of the handler that handled the latest action, if any.
    #[must_use]
    pub fn current_component(&self) -> Option<ComponentKind> {
        lock(&self.current).as_ref().map(Current::kind)
    }

    /// Stops the current handler without a callback.
    pub fn cancel(&self) {
        if let Some(current) = lock(&self.current).as_ref() {
            current.cancel();
        }
        self.redirect_listener.unregister();
    }

    /// Completes a redirect whose handler did not survive the app switch, from the
    /// persisted redirect state. Returns whether `url` was used.
    ///
    /// While a handler is waiting for a return URL the call is the same as
    /// `application_did_open`.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn resume_redirect(&self, url: String) -> bool {
        let Ok(url) = Url::parse(&url) else {
            log::warn!("ignoring unparsable return url");
            return false;
        };
        if self.redirect_listener.is_registered() {
            return self.redirect_listener.application_did_open(url);
        }
        if !has_query(&url) {
            return false;
        }

        let context = self.context();
        let Some(pending) = context.pending_redirect().take() else {
            log::debug!("no pending redirect to resume");
            return false;
        };
        let result = complete_return(
            &context,
            pending.payment_data,
            pending.native_redirect_data,
            &url,
        )
        .await;
        run_to_completion(
            context.reporter(ComponentKind::Redirect),
            CancelToken::default(),
            async { Some(result) },
        )
        .await;
        true
    }
}
