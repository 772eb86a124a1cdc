//! 3D Secure 2 authentication.
//!
//! The classic flow delivers the fingerprint and the challenge result as two separate
//! actions, the challenge reusing the component of the preceding fingerprint. The compact
//! flow submits the fingerprint itself and continues with whatever the backend answers:
//! final details, a challenge handled in place, or a redirect.

use std::sync::Arc;

use super::{
    run_to_completion, ActionContext, ComponentKind, Lifecycle, Outcome, RedirectComponent,
    Reporter, RunResult, ThreeDS2Responder, ThreeDS2Service,
};
use crate::action::{
    Action, ActionComponentData, ActionDetails, ThreeDS2Action, ThreeDS2ChallengeAction,
    ThreeDS2FingerprintAction, ThreeDS2Subtype,
};
use crate::error::ActionError;
use crate::network::requests::{ThreeDS2FingerprintSubmitRequest, ThreeDS2FingerprintSubmitResponse};
use crate::network::{send_request, ApiClientExt};

/// Where a 3DS2 flow is.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ThreeDS2State {
    /// Not started.
    Idle,
    /// The service collects the device fingerprint.
    Fingerprinting,
    /// The compact flow submits the fingerprint.
    Submitting,
    /// The service runs the challenge.
    Challenging,
    /// The compact flow continues with a redirect.
    Redirecting,
    /// Done.
    Terminal(Outcome),
}

#[derive(Clone, Copy)]
enum Step {
    Fingerprint,
    Challenge,
}

/// Runs 3DS2 fingerprints and challenges through the host's 3DS2 SDK.
pub struct ThreeDS2Component {
    context: ActionContext,
    redirect: RedirectComponent,
    lifecycle: Lifecycle<ThreeDS2State>,
}

impl ThreeDS2Component {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            redirect: RedirectComponent::new(context.clone()),
            context,
            lifecycle: Lifecycle::new(ThreeDS2State::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ThreeDS2State {
        self.lifecycle.get()
    }

    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
        self.redirect.cancel();
    }

    pub(crate) async fn handle_fingerprint(&self, action: ThreeDS2FingerprintAction) -> Outcome {
        self.run(async {
            let fingerprint = self.perform(Step::Fingerprint, action.token.clone()).await;
            Some(fingerprint.map(|fingerprint| ActionComponentData {
                details: ActionDetails::ThreeDS2Fingerprint { fingerprint },
                payment_data: action.payment_data.clone(),
            }))
        })
        .await
    }

    pub(crate) async fn handle_challenge(&self, action: ThreeDS2ChallengeAction) -> Outcome {
        self.run(async {
            let result = self.perform(Step::Challenge, action.token.clone()).await;
            Some(result.map(|challenge_result| ActionComponentData {
                details: ActionDetails::ThreeDS2ChallengeResult { challenge_result },
                payment_data: action.payment_data.clone(),
            }))
        })
        .await
    }

    pub(crate) async fn handle_compact(&self, action: ThreeDS2Action) -> Outcome {
        let reporter = self.context.reporter(ComponentKind::ThreeDS2);
        self.run(self.compact(&action, &reporter)).await
    }

    async fn run(&self, work: impl std::future::Future<Output = RunResult> + Send) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::ThreeDS2);
        let outcome = run_to_completion(reporter, token, work).await;
        self.lifecycle.set(ThreeDS2State::Terminal(outcome.clone()));
        outcome
    }

    async fn compact(&self, action: &ThreeDS2Action, reporter: &Reporter) -> RunResult {
        if action.subtype == ThreeDS2Subtype::Challenge {
            return Some(
                self.compact_challenge(action.token.clone(), action.payment_data.clone())
                    .await,
            );
        }

        let fingerprint = match self.perform(Step::Fingerprint, action.token.clone()).await {
            Ok(fingerprint) => fingerprint,
            Err(error) => return Some(Err(error)),
        };

        self.lifecycle.set(ThreeDS2State::Submitting);
        let request = ThreeDS2FingerprintSubmitRequest {
            fingerprint_result: fingerprint,
            payment_data: action.payment_data.clone(),
        };
        let client = self.context.api_client.clone().retry_on_error_api_client();
        let response = match send_request(&client, &self.context.api_context, &request).await {
            Ok(response) => response,
            Err(error) => return Some(Err(error.into())),
        };

        match response {
            ThreeDS2FingerprintSubmitResponse::Completed { details } => Some(Ok(ActionComponentData {
                details: ActionDetails::ThreeDS2Completed {
                    three_ds_result: details.three_ds_result,
                },
                payment_data: action.payment_data.clone(),
            })),
            ThreeDS2FingerprintSubmitResponse::Action {
                action: Action::ThreeDS2(next),
            } if next.subtype == ThreeDS2Subtype::Challenge => Some(
                self.compact_challenge(
                    next.token,
                    next.payment_data.or_else(|| action.payment_data.clone()),
                )
                .await,
            ),
            ThreeDS2FingerprintSubmitResponse::Action {
                action: Action::Redirect(redirect),
            } => {
                self.lifecycle.set(ThreeDS2State::Redirecting);
                self.redirect.redirect(&redirect, reporter).await
            }
            ThreeDS2FingerprintSubmitResponse::Action { action } => {
                log::warn!("unexpected {} action after fingerprint submission", action.type_name());
                Some(Err(ActionError::UnexpectedAction))
            }
        }
    }

    async fn compact_challenge(
        &self,
        token: String,
        payment_data: Option<String>,
    ) -> Result<ActionComponentData, ActionError> {
        let three_ds_result = self.perform(Step::Challenge, token).await?;
        Ok(ActionComponentData {
            details: ActionDetails::ThreeDS2Completed { three_ds_result },
            payment_data,
        })
    }

    fn service(&self) -> Result<Arc<dyn ThreeDS2Service>, ActionError> {
        self.context
            .platform
            .three_ds2()
            .ok_or(ActionError::PaymentMethodNotSupported)
    }

    async fn perform(&self, step: Step, token: String) -> Result<String, ActionError> {
        let service = self.service()?;
        let (responder, result) = ThreeDS2Responder::channel();
        match step {
            Step::Fingerprint => {
                self.lifecycle.set(ThreeDS2State::Fingerprinting);
                service.perform_fingerprint(token, responder);
            }
            Step::Challenge => {
                self.lifecycle.set(ThreeDS2State::Challenging);
                service.perform_challenge(token, responder);
            }
        }

        match result.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(ActionError::ThreeDS2 { message }),
            Err(_) => Err(ActionError::ThreeDS2 {
                message: "3DS2 service finished without a result".to_string(),
            }),
        }
    }
}
