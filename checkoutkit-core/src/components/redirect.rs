use tokio::sync::oneshot;
use url::Url;

use super::{
    run_to_completion, shopper_dismissed, ActionContext, ComponentKind, Lifecycle, Outcome,
    PresentationSurface, Reporter, RunResult,
};
use crate::action::{ActionComponentData, ActionDetails, RedirectAction, RedirectDetails};
use crate::assertion::assertion_failure;
use crate::error::ActionError;
use crate::network::requests::NativeRedirectResultRequest;
use crate::network::{send_request, ApiClientExt, SimpleScheduler};
use crate::persisted::PendingRedirect;
use crate::redirect_listener::RedirectListener;

const APP_NOT_FOUND: &str = "No app installed that can open this payment link.";

/// Where a redirect is.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum RedirectState {
    /// Not started.
    Idle,
    /// Handed to another app or the in-app browser; waiting for the return URL.
    AwaitingExternalReturn,
    /// Done.
    Terminal(Outcome),
}

/// Opens a redirect URL and completes the action from the URL the app is opened with.
pub struct RedirectComponent {
    context: ActionContext,
    lifecycle: Lifecycle<RedirectState>,
}

impl RedirectComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            context,
            lifecycle: Lifecycle::new(RedirectState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RedirectState {
        self.lifecycle.get()
    }

    /// Stops the current run. The pending redirect goes with it, so a later return URL
    /// cannot complete an action that was cancelled or superseded.
    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
        clear_pending_redirect(&self.context);
    }

    pub(crate) async fn handle(&self, action: RedirectAction) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::Redirect);
        let outcome =
            run_to_completion(reporter.clone(), token, self.redirect(&action, &reporter)).await;
        self.lifecycle.set(RedirectState::Terminal(outcome.clone()));
        outcome
    }

    /// Runs the redirect, reporting the app switch through `reporter`. Shared with the
    /// compact 3DS2 flow, which delegates its redirects here.
    pub(crate) async fn redirect(&self, action: &RedirectAction, reporter: &Reporter) -> RunResult {
        let url = match Url::parse(&action.url) {
            Ok(url) => url,
            Err(e) => {
                assertion_failure(format!("Invalid redirect url `{}`: {e}", action.url));
                return None;
            }
        };
        let launcher = self.context.platform.app_launcher();

        let mut browser = None;
        let returned = if matches!(url.scheme(), "http" | "https") {
            let opened = launcher.open_universal_app_url(url.to_string()).await;
            let returned = self.listen(action);
            if opened {
                reporter.open_external_application();
            } else {
                log::debug!("no app claimed {}, using the browser", url.host_str().unwrap_or_default());
                browser = self.context.present_or_assert(PresentationSurface::Browser {
                    url: url.to_string(),
                });
                if browser.is_none() {
                    self.context.redirect_listener.unregister();
                    clear_pending_redirect(&self.context);
                    return None;
                }
            }
            returned
        } else if launcher.open_custom_scheme_url(url.to_string()).await {
            let returned = self.listen(action);
            reporter.open_external_application();
            returned
        } else {
            return Some(Err(ActionError::AppNotFound {
                message: APP_NOT_FOUND.to_string(),
            }));
        };
        self.lifecycle.set(RedirectState::AwaitingExternalReturn);

        let return_url = tokio::select! {
            url = returned => match url {
                Ok(url) => url,
                Err(_) => {
                    log::warn!("redirect handler was replaced before the shopper returned");
                    return None;
                }
            },
            () = shopper_dismissed(browser.as_mut()) => {
                self.context.redirect_listener.unregister();
                clear_pending_redirect(&self.context);
                return Some(Err(ActionError::Cancelled));
            }
        };
        drop(browser);

        Some(
            complete_return(
                &self.context,
                action.payment_data.clone(),
                action.native_redirect_data.clone(),
                &return_url,
            )
            .await,
        )
    }

    fn listen(&self, action: &RedirectAction) -> oneshot::Receiver<Url> {
        let pending = PendingRedirect {
            payment_data: action.payment_data.clone(),
            native_redirect_data: action.native_redirect_data.clone(),
        };
        if let Err(e) = self.context.pending_redirect().set(&Some(pending)) {
            log::warn!("failed to persist pending redirect: {e}");
        }
        listen_for_return(&self.context.redirect_listener, has_query)
    }
}

/// Whether a return URL carries anything to complete a redirect with.
pub(crate) fn has_query(url: &Url) -> bool {
    url.query().is_some_and(|query| !query.is_empty())
}

/// Registers for the next URL accepted by `accepts`. URLs it rejects are left to the host.
pub(crate) fn listen_for_return(
    listener: &RedirectListener,
    accepts: fn(&Url) -> bool,
) -> oneshot::Receiver<Url> {
    let (sender, receiver) = oneshot::channel();
    let mut sender = Some(sender);
    listener.register_for_url(move |url| {
        if !accepts(&url) {
            log::debug!("declining return url {}", url.scheme());
            return false;
        }
        sender.take().is_some_and(|sender| sender.send(url).is_ok())
    });
    receiver
}

fn clear_pending_redirect(context: &ActionContext) {
    if let Err(e) = context.pending_redirect().clear() {
        log::warn!("failed to clear pending redirect: {e}");
    }
}

/// Turns a return URL into the redirect result. Native redirects exchange the query for
/// a `redirectResult` through the backend.
pub(crate) async fn complete_return(
    context: &ActionContext,
    payment_data: Option<String>,
    native_redirect_data: Option<String>,
    url: &Url,
) -> Result<ActionComponentData, ActionError> {
    clear_pending_redirect(context);

    let details = match native_redirect_data {
        Some(redirect_data) => {
            let request = NativeRedirectResultRequest {
                redirect_data,
                return_query_string: url.query().unwrap_or_default().to_string(),
            };
            let client = context
                .api_client
                .clone()
                .retry_api_client(SimpleScheduler::new(3))
                .retry_on_error_api_client();
            let response = send_request(&client, &context.api_context, &request).await?;
            RedirectDetails::RedirectResult {
                redirect_result: response.redirect_result,
            }
        }
        None => RedirectDetails::from_return_url(url).unwrap_or_else(|| {
            RedirectDetails::QueryString {
                return_url_query_string: String::new(),
            }
        }),
    };

    Ok(ActionComponentData {
        details: ActionDetails::Redirect(details),
        payment_data,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::action::RedirectMethod;
    use crate::network::ApiError;
    use crate::test_support::{until, AssertionSpy, DelegateEvent, Harness, MockPlatform};

    fn redirect(url: &str, native_redirect_data: Option<&str>) -> RedirectAction {
        RedirectAction {
            url: url.to_string(),
            method: RedirectMethod::Get,
            payment_data: Some("Ab02b4c0!BQABAgA=".to_string()),
            native_redirect_data: native_redirect_data.map(str::to_string),
            payment_method_type: Some("ideal".to_string()),
        }
    }

    fn return_url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_custom_scheme_open_then_return() {
        let harness = Harness::new(Vec::new());
        let component = Arc::new(RedirectComponent::new(harness.context()));

        let task = tokio::spawn({
            let component = component.clone();
            async move { component.handle(redirect("bank-app://pay?id=1", None)).await }
        });
        until(|| harness.listener.is_registered()).await;

        assert_eq!(component.state(), RedirectState::AwaitingExternalReturn);
        assert_eq!(
            harness.delegate.events(),
            vec![DelegateEvent::OpenedExternalApplication(ComponentKind::Redirect)]
        );
        assert!(harness.context().pending_redirect().get().is_some());

        assert!(harness
            .listener
            .application_did_open(return_url("my-shop://return?redirectResult=abc")));
        assert_eq!(task.await.unwrap(), Outcome::Delivered);

        assert_eq!(
            harness.delegate.provided(),
            vec![(
                ActionComponentData {
                    details: ActionDetails::Redirect(RedirectDetails::RedirectResult {
                        redirect_result: "abc".to_string()
                    }),
                    payment_data: Some("Ab02b4c0!BQABAgA=".to_string()),
                },
                ComponentKind::Redirect
            )]
        );
        assert_eq!(harness.delegate.terminal_count(), 1);
        assert!(harness.context().pending_redirect().get().is_none());
        assert_eq!(component.state(), RedirectState::Terminal(Outcome::Delivered));
    }

    #[tokio::test]
    async fn test_custom_scheme_open_failure_is_app_not_found() {
        let harness = Harness::with_platform(Vec::new(), MockPlatform::default().launcher_opens(false));
        let component = RedirectComponent::new(harness.context());

        let outcome = component.handle(redirect("bank-app://pay", None)).await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(
            harness.delegate.events(),
            vec![DelegateEvent::Failed(
                ActionError::AppNotFound {
                    message: APP_NOT_FOUND.to_string()
                },
                ComponentKind::Redirect
            )]
        );
        assert!(!harness.listener.is_registered());
    }

    #[tokio::test]
    async fn test_universal_link_failure_falls_back_to_browser() {
        let harness = Harness::with_platform(Vec::new(), MockPlatform::default().launcher_opens(false));
        let component = Arc::new(RedirectComponent::new(harness.context()));

        let task = tokio::spawn({
            let component = component.clone();
            async move { component.handle(redirect("https://bank.example/pay", None)).await }
        });
        until(|| harness.presenter.presented_count() == 1).await;

        assert_eq!(
            harness.presenter.surfaces(),
            vec![PresentationSurface::Browser {
                url: "https://bank.example/pay".to_string()
            }]
        );
        assert!(harness.listener.is_registered());
        assert!(harness.delegate.events().is_empty());

        assert!(harness
            .listener
            .application_did_open(return_url("https://shop.example/return?payload=p")));
        assert_eq!(task.await.unwrap(), Outcome::Delivered);
        assert_eq!(harness.presenter.dismissed_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_browser_dismissal_cancels() {
        let harness = Harness::with_platform(Vec::new(), MockPlatform::default().launcher_opens(false));
        let component = Arc::new(RedirectComponent::new(harness.context()));

        let task = tokio::spawn({
            let component = component.clone();
            async move { component.handle(redirect("https://bank.example/pay", None)).await }
        });
        until(|| harness.presenter.presented_count() == 1).await;
        harness.presenter.last_handle().dismissed();

        assert_eq!(task.await.unwrap(), Outcome::Cancelled);
        assert_eq!(
            harness.delegate.failed(),
            vec![(ActionError::Cancelled, ComponentKind::Redirect)]
        );
        assert!(!harness.listener.is_registered());
        assert!(harness.presenter.dismissed_ids().is_empty());
    }

    #[tokio::test]
    async fn test_native_redirect_exchanges_query() {
        let harness = Harness::new(vec![Ok(json!({ "redirectResult": "exchanged" }))]);
        let component = Arc::new(RedirectComponent::new(harness.context()));

        let task = tokio::spawn({
            let component = component.clone();
            async move { component.handle(redirect("bank-app://pay", Some("nrd"))).await }
        });
        until(|| harness.listener.is_registered()).await;

        // Return URLs without a query are not ours to consume.
        assert!(!harness.listener.application_did_open(return_url("url://")));
        assert!(harness.listener.is_registered());
        assert!(harness
            .listener
            .application_did_open(return_url("my-shop://return?code=42")));

        assert_eq!(task.await.unwrap(), Outcome::Delivered);
        let requests = harness.client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.path().ends_with("v1/nativeRedirect/redirectResult"));
        let body: serde_json::Value =
            serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({ "redirectData": "nrd", "returnQueryString": "code=42" })
        );
        assert_eq!(
            harness.delegate.provided()[0].0.details,
            ActionDetails::Redirect(RedirectDetails::RedirectResult {
                redirect_result: "exchanged".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_native_redirect_failure_is_network_error() {
        let forbidden = ApiError::Status {
            url: "https://checkoutshopper-test.adyen.com".to_string(),
            status: 403,
            error_code: Some("010".to_string()),
            message: "Not allowed".to_string(),
        };
        let harness = Harness::new(vec![Err(forbidden.clone()), Err(forbidden.clone()), Err(forbidden.clone())]);
        let component = Arc::new(RedirectComponent::new(harness.context()));

        let task = tokio::spawn({
            let component = component.clone();
            async move { component.handle(redirect("bank-app://pay", Some("nrd"))).await }
        });
        until(|| harness.listener.is_registered()).await;
        harness
            .listener
            .application_did_open(return_url("my-shop://return?code=42"));

        assert_eq!(task.await.unwrap(), Outcome::Failed);
        assert_eq!(
            harness.delegate.failed(),
            vec![(ActionError::Network(forbidden), ComponentKind::Redirect)]
        );
        assert_eq!(harness.client.request_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_presenter_for_browser_is_an_integration_error() {
        let spy = AssertionSpy::install();
        let harness = Harness::with_platform(Vec::new(), MockPlatform::default().launcher_opens(false));
        let mut context = harness.context();
        context.presentation_delegate = None;
        let component = RedirectComponent::new(context);

        let outcome = component.handle(redirect("https://bank.example/pay", None)).await;

        assert_eq!(outcome, Outcome::Abandoned);
        assert_eq!(spy.messages().len(), 1);
        assert_eq!(harness.delegate.terminal_count(), 0);
        assert!(!harness.listener.is_registered());
        assert!(harness.context().pending_redirect().get().is_none());
    }

    #[tokio::test]
    async fn test_cancel_forgets_pending_redirect() {
        let harness = Harness::new(Vec::new());
        let component = Arc::new(RedirectComponent::new(harness.context()));

        let task = tokio::spawn({
            let component = component.clone();
            async move { component.handle(redirect("bank-app://pay?id=1", None)).await }
        });
        until(|| harness.listener.is_registered()).await;
        assert!(harness.context().pending_redirect().get().is_some());

        component.cancel();

        assert_eq!(task.await.unwrap(), Outcome::Superseded);
        assert!(harness.context().pending_redirect().get().is_none());
        assert_eq!(
            harness.delegate.events(),
            vec![DelegateEvent::OpenedExternalApplication(ComponentKind::Redirect)]
        );
    }

    #[tokio::test]
    async fn test_released_delegate_is_not_called() {
        let harness = Harness::with_platform(Vec::new(), MockPlatform::default().launcher_opens(false));
        let context = harness.context();
        let delegate = context.delegate.clone().unwrap();
        drop(harness);
        assert!(delegate.upgrade().is_none());

        let outcome = RedirectComponent::new(context)
            .handle(redirect("bank-app://pay", None))
            .await;
        assert_eq!(outcome, Outcome::Failed);
    }
}
