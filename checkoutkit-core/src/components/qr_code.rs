use super::{
    run_to_completion, shopper_dismissed, ActionContext, ComponentKind, Lifecycle, Outcome,
    PollingComponent, PresentationSurface, RunResult,
};
use crate::action::QrCodeAction;
use crate::error::ActionError;

/// Where a QR code flow is.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum QrCodeState {
    /// Not started.
    Idle,
    /// Code shown, polling until paid or expired.
    Displayed,
    /// Done.
    Terminal(Outcome),
}

/// Shows a QR code to scan with another device and polls until it is paid.
///
/// The code expires after the configured QR code expiry.
pub struct QrCodeComponent {
    context: ActionContext,
    polling: PollingComponent,
    lifecycle: Lifecycle<QrCodeState>,
}

impl QrCodeComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            polling: PollingComponent::new(context.clone()),
            context,
            lifecycle: Lifecycle::new(QrCodeState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> QrCodeState {
        self.lifecycle.get()
    }

    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
    }

    pub(crate) async fn handle(&self, action: QrCodeAction) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::QrCode);
        let outcome = run_to_completion(reporter, token, self.display(&action)).await;
        self.lifecycle.set(QrCodeState::Terminal(outcome.clone()));
        outcome
    }

    async fn display(&self, action: &QrCodeAction) -> RunResult {
        let expiry = self.context.configuration.qr_code_expiry;
        let mut presentation = self.context.present_or_assert(PresentationSurface::QrCode {
            payment_method_type: action.payment_method_type.clone(),
            qr_code_data: action.qr_code_data.clone(),
            expires_in: expiry,
        });
        self.lifecycle.set(QrCodeState::Displayed);

        tokio::select! {
            result = self.polling.poll(&action.payment_data) => Some(result),
            () = tokio::time::sleep(expiry) => {
                log::info!("{} qr code expired", action.payment_method_type);
                Some(Err(ActionError::QrCodeExpired))
            }
            () = shopper_dismissed(presentation.as_mut()) => Some(Err(ActionError::Cancelled)),
        }
    }
}
