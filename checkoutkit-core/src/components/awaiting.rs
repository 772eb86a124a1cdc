use url::Url;

use super::redirect::{complete_return, has_query, listen_for_return};
use super::{
    run_to_completion, shopper_dismissed, ActionContext, ComponentKind, Lifecycle, Outcome,
    PollingComponent, PresentationSurface, Reporter, RunResult,
};
use crate::action::{AwaitAction, RedirectableAwaitAction};
use crate::assertion::assertion_failure;
use crate::error::ActionError;

/// Where an await flow is.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum AwaitState {
    /// Not started.
    Idle,
    /// Waiting screen shown, polling.
    Waiting,
    /// Done.
    Terminal(Outcome),
}

/// Shows a waiting screen and polls until the shopper approved elsewhere.
pub struct AwaitComponent {
    context: ActionContext,
    polling: PollingComponent,
    lifecycle: Lifecycle<AwaitState>,
}

impl AwaitComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            polling: PollingComponent::new(context.clone()),
            context,
            lifecycle: Lifecycle::new(AwaitState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AwaitState {
        self.lifecycle.get()
    }

    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
    }

    pub(crate) async fn handle(&self, action: AwaitAction) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::Await);
        let outcome = run_to_completion(reporter, token, self.wait(&action)).await;
        self.lifecycle.set(AwaitState::Terminal(outcome.clone()));
        outcome
    }

    async fn wait(&self, action: &AwaitAction) -> RunResult {
        let mut presentation = self.context.present_or_assert(PresentationSurface::Await {
            payment_method_type: action.payment_method_type.clone(),
        });
        self.lifecycle.set(AwaitState::Waiting);

        tokio::select! {
            result = self.polling.poll(&action.payment_data) => Some(result),
            () = shopper_dismissed(presentation.as_mut()) => Some(Err(ActionError::Cancelled)),
        }
    }
}

/// Opens the action's URL, then takes whichever comes first: the return URL or a final
/// polling result.
pub struct RedirectableAwaitComponent {
    context: ActionContext,
    polling: PollingComponent,
    lifecycle: Lifecycle<AwaitState>,
}

impl RedirectableAwaitComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            polling: PollingComponent::new(context.clone()),
            context,
            lifecycle: Lifecycle::new(AwaitState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AwaitState {
        self.lifecycle.get()
    }

    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
    }

    pub(crate) async fn handle(&self, action: RedirectableAwaitAction) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::RedirectableAwait);
        let outcome = run_to_completion(reporter.clone(), token, self.wait(&action, &reporter)).await;
        self.lifecycle.set(AwaitState::Terminal(outcome.clone()));
        outcome
    }

    async fn wait(&self, action: &RedirectableAwaitAction, reporter: &Reporter) -> RunResult {
        let url = match Url::parse(&action.url) {
            Ok(url) => url,
            Err(e) => {
                assertion_failure(format!("Invalid await url `{}`: {e}", action.url));
                return None;
            }
        };
        let launcher = self.context.platform.app_launcher();
        let opened = if matches!(url.scheme(), "http" | "https") {
            launcher.open_universal_app_url(url.to_string()).await
        } else {
            launcher.open_custom_scheme_url(url.to_string()).await
        };
        if !opened {
            return Some(Err(ActionError::AppNotFound {
                message: format!(
                    "No app installed that can complete the {} payment.",
                    action.payment_method_type
                ),
            }));
        }

        let listener = &self.context.redirect_listener;
        let returned = listen_for_return(listener, has_query);
        reporter.open_external_application();

        let mut presentation = self.context.present_or_assert(PresentationSurface::Await {
            payment_method_type: action.payment_method_type.clone(),
        });
        self.lifecycle.set(AwaitState::Waiting);

        // A replaced return handler leaves polling as the only way to finish.
        let returned = async {
            match returned.await {
                Ok(url) => url,
                Err(_) => std::future::pending().await,
            }
        };

        tokio::select! {
            url = returned => Some(
                complete_return(&self.context, Some(action.payment_data.clone()), None, &url).await,
            ),
            result = self.polling.poll(&action.payment_data) => {
                listener.unregister();
                Some(result)
            }
            () = shopper_dismissed(presentation.as_mut()) => {
                listener.unregister();
                Some(Err(ActionError::Cancelled))
            }
        }
    }
}
