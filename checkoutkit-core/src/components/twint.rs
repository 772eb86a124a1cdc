use super::redirect::listen_for_return;
use super::{
    run_to_completion, ActionContext, ComponentKind, Lifecycle, Outcome, PollingComponent,
    PresentationEvent, PresentationSurface, Reporter, RunResult, SdkError, SdkResponder,
    TwintAppConfiguration, TWINT_SUCCESS_CODE,
};
use crate::action::TwintSdkAction;
use crate::assertion::assertion_failure;
use crate::error::ActionError;

const NO_APP_INSTALLED: &str = "No or an outdated version of TWINT is installed on this device. Please update or install the TWINT app.";
const MISSING_CALLBACK_SCHEME: &str =
    "Twint action configuration instance must not be nil in order to use AdyenTwint";
const NO_RESPONSE_CODE: i64 = -1;

/// Where a Twint handoff is.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum TwintState {
    /// Not started.
    Idle,
    /// Asking the SDK for installed apps.
    Discovering,
    /// Exactly one app is installed and is opened directly.
    SinglePathFound,
    /// Several apps are installed; the shopper picks one.
    MultiplePathsFound,
    /// No app is installed.
    NoneFound,
    /// The Twint app is open; waiting for it to return.
    ExternalWait,
    /// The app reported success; polling for the final result.
    Polling,
    /// Done.
    Terminal(Outcome),
}

/// Hands a payment to an installed Twint app and confirms it by polling once the app
/// returns.
pub struct TwintSdkComponent {
    context: ActionContext,
    polling: PollingComponent,
    lifecycle: Lifecycle<TwintState>,
}

impl TwintSdkComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            polling: PollingComponent::new(context.clone()),
            context,
            lifecycle: Lifecycle::new(TwintState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TwintState {
        self.lifecycle.get()
    }

    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
    }

    pub(crate) async fn handle(&self, action: TwintSdkAction) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::Twint);
        let outcome = run_to_completion(reporter.clone(), token, self.pay(&action, &reporter)).await;
        self.lifecycle.set(TwintState::Terminal(outcome.clone()));
        outcome
    }

    async fn pay(&self, action: &TwintSdkAction, reporter: &Reporter) -> RunResult {
        let Some(twint) = self.context.platform.twint() else {
            return Some(Err(ActionError::PaymentMethodNotSupported));
        };
        let Some(callback_app_scheme) = self.context.configuration.twint_callback_app_scheme.clone()
        else {
            assertion_failure(MISSING_CALLBACK_SCHEME);
            return None;
        };
        if callback_app_scheme.contains([':', '/']) {
            assertion_failure(format!(
                "Format of provided callbackAppScheme '{callback_app_scheme}' is incorrect."
            ));
        }

        self.lifecycle.set(TwintState::Discovering);
        let mut apps = twint.fetch_installed_app_configurations().await;
        let app = match apps.len() {
            0 => {
                self.lifecycle.set(TwintState::NoneFound);
                return Some(Err(ActionError::AppNotFound {
                    message: NO_APP_INSTALLED.to_string(),
                }));
            }
            1 => {
                self.lifecycle.set(TwintState::SinglePathFound);
                apps.remove(0)
            }
            _ => {
                self.lifecycle.set(TwintState::MultiplePathsFound);
                match self.choose_app(apps).await? {
                    Ok(app) => app,
                    Err(error) => return Some(Err(error)),
                }
            }
        };
        log::debug!("opening {}", app.app_display_name);

        let listener = &self.context.redirect_listener;
        let returned = listen_for_return(listener, |_| true);
        let token = action.sdk_data.token.clone();
        let error = if action.sdk_data.is_stored {
            twint.register_for_uof(token, app, callback_app_scheme)
        } else {
            twint.pay(token, app, callback_app_scheme)
        };
        if let Some(error) = error {
            listener.unregister();
            return Some(Err(sdk_failure(error)));
        }
        reporter.open_external_application();
        self.lifecycle.set(TwintState::ExternalWait);

        let Ok(url) = returned.await else {
            log::warn!("twint return handler was replaced before the app returned");
            return None;
        };

        let (responder, response) = SdkResponder::channel();
        if !twint.handle_open(url.to_string(), responder) {
            return Some(Err(ActionError::Sdk {
                code: NO_RESPONSE_CODE,
                message: "Twint did not recognise the return url.".to_string(),
            }));
        }
        let response = response.await.unwrap_or_else(|_| SdkError {
            code: NO_RESPONSE_CODE,
            message: "Twint finished without a response.".to_string(),
        });
        if response.code != TWINT_SUCCESS_CODE {
            return Some(Err(sdk_failure(response)));
        }

        self.lifecycle.set(TwintState::Polling);
        Some(self.polling.poll(&action.payment_data).await)
    }

    /// Lets the shopper pick one of several apps. `None` if nothing could be shown.
    async fn choose_app(
        &self,
        apps: Vec<TwintAppConfiguration>,
    ) -> Option<Result<TwintAppConfiguration, ActionError>> {
        let mut picker = self
            .context
            .present_or_assert(PresentationSurface::AppPicker { apps: apps.clone() })?;
        loop {
            match picker.next_event().await {
                PresentationEvent::Selected(index) => {
                    let app = usize::try_from(index).ok().and_then(|index| apps.get(index));
                    if let Some(app) = app {
                        return Some(Ok(app.clone()));
                    }
                    log::warn!("ignoring selection {index} of {} apps", apps.len());
                }
                PresentationEvent::Dismissed => return Some(Err(ActionError::Cancelled)),
                PresentationEvent::Finished => {}
            }
        }
    }
}

fn sdk_failure(error: SdkError) -> ActionError {
    ActionError::Sdk {
        code: error.code,
        message: error.message,
    }
}
