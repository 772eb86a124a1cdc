use super::{
    run_to_completion, ActionContext, ComponentKind, Lifecycle, Outcome, PresentationEvent,
    PresentationSurface, RunResult,
};
use crate::action::{ActionComponentData, ActionDetails, DocumentAction, VoucherAction};
use crate::error::ActionError;

/// Where a presentation-only action is.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum VoucherState {
    /// Not started.
    Idle,
    /// Shown to the shopper.
    Presented,
    /// Done.
    Terminal(Outcome),
}

/// Shows a surface until the shopper confirms (`Completed`) or dismisses it (`Cancelled`).
async fn present_until_done(
    context: &ActionContext,
    lifecycle: &Lifecycle<VoucherState>,
    surface: PresentationSurface,
    payment_data: Option<String>,
) -> RunResult {
    let mut presentation = context.present_or_assert(surface)?;
    lifecycle.set(VoucherState::Presented);
    loop {
        match presentation.next_event().await {
            PresentationEvent::Finished => {
                return Some(Ok(ActionComponentData {
                    details: ActionDetails::Completed,
                    payment_data,
                }))
            }
            PresentationEvent::Dismissed => return Some(Err(ActionError::Cancelled)),
            PresentationEvent::Selected(_) => {}
        }
    }
}

/// Shows a voucher to be paid offline.
pub struct VoucherComponent {
    context: ActionContext,
    lifecycle: Lifecycle<VoucherState>,
}

impl VoucherComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            context,
            lifecycle: Lifecycle::new(VoucherState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> VoucherState {
        self.lifecycle.get()
    }

    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
    }

    pub(crate) async fn handle(&self, action: VoucherAction) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::Voucher);
        let payment_data = action.payment_data.clone();
        let surface = PresentationSurface::Voucher { action };
        let work = present_until_done(&self.context, &self.lifecycle, surface, payment_data);
        let outcome = run_to_completion(reporter, token, work).await;
        self.lifecycle.set(VoucherState::Terminal(outcome.clone()));
        outcome
    }
}

/// Shows a document such as a direct debit mandate.
pub struct DocumentComponent {
    context: ActionContext,
    lifecycle: Lifecycle<VoucherState>,
}

impl DocumentComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            context,
            lifecycle: Lifecycle::new(VoucherState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> VoucherState {
        self.lifecycle.get()
    }

    pub(crate) fn cancel(&self) {
        self.lifecycle.cancel();
    }

    pub(crate) async fn handle(&self, action: DocumentAction) -> Outcome {
        let token = self.lifecycle.begin();
        let reporter = self.context.reporter(ComponentKind::Document);
        let payment_data = action.payment_data.clone();
        let surface = PresentationSurface::Document { action };
        let work = present_until_done(&self.context, &self.lifecycle, surface, payment_data);
        let outcome = run_to_completion(reporter, token, work).await;
        self.lifecycle.set(VoucherState::Terminal(outcome.clone()));
        outcome
    }
}
