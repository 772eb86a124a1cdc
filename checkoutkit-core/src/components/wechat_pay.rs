use super::redirect::listen_for_return;
use super::{
    run_to_completion, ActionContext, ComponentKind, Lifecycle, Outcome, Reporter, RunResult,
    SdkResponder,
};
use crate::action::{ActionComponentData, ActionDetails, WeChatPaySdkAction};
use crate::error::ActionError;

const NOT_INSTALLED: &str = "WeChatPaySDKActionComponent can only work on a real device with WeChat installed.";

/// Where a WeChat Pay handoff is.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum WeChatPayState {
    /// Not started.
    Idle,
    /// WeChat is open; waiting for it to return.
    ExternalWait,
    /// Done.
    Terminal(Outcome),
}

/// Hands a payment to the WeChat app and reports the SDK result code.
pub struct WeChatPaySdkComponent {
    context: ActionContext,
    lifecycle: Lifecycle<WeChatPayState>,
}

impl WeChatPaySdkComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            context,
            lifecycle: Lifecycle::new(WeChatPayState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> WeChatPayState {
        self.lifecycle.get()
    }

    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
    }

    pub(crate) async fn handle(&self, action: WeChatPaySdkAction) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::WeChatPay);
        let outcome = run_to_completion(reporter.clone(), token, self.pay(&action, &reporter)).await;
        self.lifecycle.set(WeChatPayState::Terminal(outcome.clone()));
        outcome
    }

    async fn pay(&self, action: &WeChatPaySdkAction, reporter: &Reporter) -> RunResult {
        let Some(wechat) = self.context.platform.wechat_pay() else {
            return Some(Err(ActionError::PaymentMethodNotSupported));
        };
        if !wechat.is_app_installed() {
            return Some(Err(ActionError::AppNotFound {
                message: NOT_INSTALLED.to_string(),
            }));
        }

        let listener = &self.context.redirect_listener;
        let returned = listen_for_return(listener, |_| true);
        if !wechat.send_pay_request(action.sdk_data.clone()) {
            listener.unregister();
            return Some(Err(ActionError::AppNotFound {
                message: NOT_INSTALLED.to_string(),
            }));
        }
        reporter.open_external_application();
        self.lifecycle.set(WeChatPayState::ExternalWait);

        let Ok(url) = returned.await else {
            log::warn!("wechat return handler was replaced before the app returned");
            return None;
        };
        let (responder, response) = SdkResponder::channel();
        if !wechat.handle_open_url(url.to_string(), responder) {
            return Some(Err(ActionError::Sdk {
                code: -1,
                message: "WeChat did not recognise the return url.".to_string(),
            }));
        }

        match response.await {
            Ok(response) => Some(Ok(ActionComponentData {
                details: ActionDetails::WeChatPay {
                    result_code: response.code.to_string(),
                },
                payment_data: action.payment_data.clone(),
            })),
            Err(_) => Some(Err(ActionError::Sdk {
                code: -1,
                message: "WeChat finished without a response.".to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::action::WeChatPaySdkData;
    use crate::test_support::{until, DelegateEvent, Harness, MockPlatform, WeChatSpy};

    fn action() -> WeChatPaySdkAction {
        WeChatPaySdkAction {
            sdk_data: WeChatPaySdkData {
                app_identifier: "wx-app".to_string(),
                partner_identifier: "partner".to_string(),
                prepay_identifier: "prepay".to_string(),
                nonce: "nonce".to_string(),
                timestamp: "1600000000".to_string(),
                package: "Sign=WXPay".to_string(),
                sign: "signature".to_string(),
            },
            payment_data: Some("Ab02b4c0!BQABAgA=".to_string()),
        }
    }

    #[tokio::test]
    async fn test_result_code_is_delivered() {
        let wechat = Arc::new(WeChatSpy::installed(0));
        let harness =
            Harness::with_platform(Vec::new(), MockPlatform::default().with_wechat_pay(wechat.clone()));
        let component = Arc::new(WeChatPaySdkComponent::new(harness.context()));

        let task = tokio::spawn({
            let component = component.clone();
            async move { component.handle(action()).await }
        });
        until(|| harness.listener.is_registered()).await;
        assert_eq!(component.state(), WeChatPayState::ExternalWait);
        assert!(harness
            .listener
            .application_did_open(Url::parse("wx-app://pay/?returnKey=&ret=0").unwrap()));

        assert_eq!(task.await.unwrap(), Outcome::Delivered);
        assert_eq!(
            harness.delegate.events(),
            vec![
                DelegateEvent::OpenedExternalApplication(ComponentKind::WeChatPay),
                DelegateEvent::Provided(
                    ActionComponentData {
                        details: ActionDetails::WeChatPay {
                            result_code: "0".to_string()
                        },
                        payment_data: Some("Ab02b4c0!BQABAgA=".to_string()),
                    },
                    ComponentKind::WeChatPay
                ),
            ]
        );
        assert_eq!(wechat.pay_requests(), vec![action().sdk_data]);
    }

    #[tokio::test]
    async fn test_without_wechat_app() {
        let wechat = Arc::new(WeChatSpy::not_installed());
        let harness =
            Harness::with_platform(Vec::new(), MockPlatform::default().with_wechat_pay(wechat.clone()));
        let component = WeChatPaySdkComponent::new(harness.context());

        assert_eq!(component.handle(action()).await, Outcome::Failed);
        assert_eq!(
            harness.delegate.failed(),
            vec![(
                ActionError::AppNotFound {
                    message: NOT_INSTALLED.to_string()
                },
                ComponentKind::WeChatPay
            )]
        );
        assert!(wechat.pay_requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_sdk_is_not_supported() {
        let harness = Harness::new(Vec::new());
        let component = WeChatPaySdkComponent::new(harness.context());

        assert_eq!(component.handle(action()).await, Outcome::Failed);
        assert_eq!(
            harness.delegate.failed(),
            vec![(ActionError::PaymentMethodNotSupported, ComponentKind::WeChatPay)]
        );
    }
}
