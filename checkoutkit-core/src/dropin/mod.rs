//! The drop-in flow: pick a payment method, submit it, handle the resulting actions.
//!
//! The drop-in owns an [`ActionComponent`] and sits between it and the host: a shopper
//! cancelling an action returns to the selected payment method instead of failing the
//! payment, and environment failures are shown as an alert before they are forwarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::action::{Action, ActionComponentData};
use crate::action_component::ActionComponent;
use crate::components::{
    ActionComponentDelegate, ComponentKind, Outcome, PlatformServices, Presentation,
    PresentationDelegate, PresentationSurface,
};
use crate::config::{ApiContext, DropInConfiguration};
use crate::error::{ActionError, CheckoutKitError};

mod partial_payment;
mod payment_methods;
mod public_key;

pub use partial_payment::{check_balance_covers, BalanceCheckResult, PartialPaymentClient};
pub use payment_methods::{
    decode_payment_methods, Issuer, PaymentMethod, PaymentMethods, StoredPaymentMethod,
};
pub use public_key::PublicKeyProvider;

/// The payment method the shopper picked.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum SelectedPaymentMethod {
    /// A regular method.
    Regular(PaymentMethod),
    /// A method stored earlier.
    Stored(StoredPaymentMethod),
}

/// Payment details the host sends to `/payments`.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SubmittedPayment {
    /// Type of the selected method.
    pub payment_method_type: String,
    /// Id of the selected method, if it is a stored one.
    pub stored_payment_method_id: Option<String>,
    /// `paymentMethod` JSON object produced by the method's component.
    pub details: String,
}

/// Where the drop-in flow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum DropInState {
    /// Showing the payment method list.
    PaymentMethodList,
    /// A method is selected and its details are being entered.
    ComponentSelected,
    /// Details or action data went to the host, waiting for its next instruction.
    Submitted,
    /// An action is being handled.
    HandlingAction,
    /// The host finished the payment.
    Finalized {
        /// Whether the payment succeeded.
        success: bool,
    },
    /// The payment failed or the shopper closed the drop-in.
    Failed,
}

/// Receives the drop-in's results.
#[uniffi::export(with_foreign)]
pub trait DropInComponentDelegate: Send + Sync {
    /// The shopper submitted a payment; send it to `/payments`.
    fn did_submit(&self, payment: SubmittedPayment);

    /// An action finished; send `data` to `/payments/details`.
    fn did_provide(&self, data: ActionComponentData);

    /// The payment failed or the shopper closed the drop-in.
    fn did_fail(&self, error: ActionError);

    /// An action switched the shopper to another app.
    fn did_open_external_application(&self);
}

struct Flow {
    state: DropInState,
    selected: Option<SelectedPaymentMethod>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared with the bridge the action component reports to.
struct Shared {
    configuration: DropInConfiguration,
    flow: Mutex<Flow>,
    delegate: Mutex<Option<Arc<dyn DropInComponentDelegate>>>,
    presentation_delegate: Mutex<Option<Arc<dyn PresentationDelegate>>>,
    alert: Mutex<Option<Presentation>>,
}

impl Shared {
    fn delegate(&self) -> Option<Arc<dyn DropInComponentDelegate>> {
        lock(&self.delegate).clone()
    }

    fn set_state(&self, state: DropInState) {
        lock(&self.flow).state = state;
    }

    fn present_alert(&self, message: String) {
        let Some(delegate) = lock(&self.presentation_delegate).clone() else {
            log::warn!("no presentation delegate to show an alert on");
            return;
        };
        let alert = Presentation::show(&delegate, PresentationSurface::Alert { message });
        // Replacing an earlier alert dismisses it.
        *lock(&self.alert) = Some(alert);
    }

    fn dismiss_alert(&self) {
        lock(&self.alert).take();
    }

    fn action_provided(&self, data: ActionComponentData) {
        self.set_state(DropInState::Submitted);
        if let Some(delegate) = self.delegate() {
            delegate.did_provide(data);
        }
    }

    fn action_failed(&self, error: ActionError, kind: ComponentKind) {
        {
            let mut flow = lock(&self.flow);
            if error == ActionError::Cancelled && flow.selected.is_some() {
                log::debug!("{kind} cancelled, back to the selected payment method");
                flow.state = DropInState::ComponentSelected;
                return;
            }
            flow.state = DropInState::Failed;
        }

        if self.configuration.present_alerts && error.is_environment_failure() {
            self.present_alert(error.user_message().unwrap_or_else(|| error.to_string()));
        }
        if let Some(delegate) = self.delegate() {
            delegate.did_fail(error);
        }
    }
}

/// Forwards the owned action component's callbacks into the drop-in.
struct ActionBridge {
    shared: Weak<Shared>,
}

impl ActionComponentDelegate for ActionBridge {
    fn did_provide(&self, data: ActionComponentData, _kind: ComponentKind) {
        if let Some(shared) = self.shared.upgrade() {
            shared.action_provided(data);
        }
    }

    fn did_fail(&self, error: ActionError, kind: ComponentKind) {
        if let Some(shared) = self.shared.upgrade() {
            shared.action_failed(error, kind);
        }
    }

    fn did_open_external_application(&self, kind: ComponentKind) {
        log::debug!("{kind} opened an external application");
        if let Some(delegate) = self.shared.upgrade().and_then(|shared| shared.delegate()) {
            delegate.did_open_external_application();
        }
    }
}

fn invalid_state(reason: String) -> CheckoutKitError {
    CheckoutKitError::InvalidState { reason }
}

/// Payment method selection, submission and action handling as one component.
#[derive(uniffi::Object)]
pub struct DropInComponent {
    payment_methods: PaymentMethods,
    shared: Arc<Shared>,
    action_component: Arc<ActionComponent>,
}

impl DropInComponent {
    /// Creates a drop-in handling actions with `action_component`. The drop-in becomes
    /// the action component's delegate.
    #[must_use]
    pub fn with_action_component(
        payment_methods: PaymentMethods,
        configuration: DropInConfiguration,
        action_component: Arc<ActionComponent>,
    ) -> Self {
        let shared = Arc::new(Shared {
            configuration,
            flow: Mutex::new(Flow {
                state: DropInState::PaymentMethodList,
                selected: None,
            }),
            delegate: Mutex::new(None),
            presentation_delegate: Mutex::new(None),
            alert: Mutex::new(None),
        });
        action_component.set_delegate(Arc::new(ActionBridge {
            shared: Arc::downgrade(&shared),
        }));
        Self {
            payment_methods,
            shared,
            action_component,
        }
    }

    fn select(
        &self,
        method: SelectedPaymentMethod,
    ) -> Result<SelectedPaymentMethod, CheckoutKitError> {
        {
            let mut flow = lock(&self.shared.flow);
            match flow.state {
                DropInState::PaymentMethodList
                | DropInState::ComponentSelected
                | DropInState::Failed => {}
                state => {
                    return Err(invalid_state(format!(
                        "cannot select a payment method in {state:?}"
                    )))
                }
            }
            flow.state = DropInState::ComponentSelected;
            flow.selected = Some(method.clone());
        }
        self.shared.dismiss_alert();
        Ok(method)
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl DropInComponent {
    /// Creates a drop-in over `payment_methods` talking to the backend of `api_context`.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(
        payment_methods: PaymentMethods,
        api_context: Arc<ApiContext>,
        configuration: DropInConfiguration,
        platform: Arc<dyn PlatformServices>,
    ) -> Self {
        let action_component = Arc::new(ActionComponent::new(
            api_context,
            configuration.action.clone(),
            platform,
        ));
        Self::with_action_component(payment_methods, configuration, action_component)
    }

    /// Sets the receiver of results.
    pub fn set_delegate(&self, delegate: Arc<dyn DropInComponentDelegate>) {
        *lock(&self.shared.delegate) = Some(delegate);
    }

    /// Sets the host UI layer for alerts and action surfaces.
    pub fn set_presentation_delegate(&self, delegate: Arc<dyn PresentationDelegate>) {
        *lock(&self.shared.presentation_delegate) = Some(delegate.clone());
        self.action_component.set_presentation_delegate(delegate);
    }

    /// The methods offered.
    #[must_use]
    pub fn payment_methods(&self) -> PaymentMethods {
        self.payment_methods.clone()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DropInState {
        lock(&self.shared.flow).state
    }

    /// The method picked last, if any.
    #[must_use]
    pub fn selected_payment_method(&self) -> Option<SelectedPaymentMethod> {
        lock(&self.shared.flow).selected.clone()
    }

    /// Selects the first regular method of `method_type`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown type and `InvalidState` while a payment is
    /// in flight.
    #[allow(clippy::needless_pass_by_value)]
    pub fn select_payment_method(
        &self,
        method_type: String,
    ) -> Result<SelectedPaymentMethod, CheckoutKitError> {
        let method = self
            .payment_methods
            .regular_of_type(&method_type)
            .cloned()
            .ok_or_else(|| CheckoutKitError::InvalidInput {
                attribute: "method_type".to_string(),
                reason: format!("no payment method of type `{method_type}`"),
            })?;
        self.select(SelectedPaymentMethod::Regular(method))
    }

    /// Selects the stored method with `id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown id and `InvalidState` while a payment is
    /// in flight.
    #[allow(clippy::needless_pass_by_value)]
    pub fn select_stored_payment_method(
        &self,
        id: String,
    ) -> Result<SelectedPaymentMethod, CheckoutKitError> {
        let method = self
            .payment_methods
            .stored_with_id(&id)
            .cloned()
            .ok_or_else(|| CheckoutKitError::InvalidInput {
                attribute: "id".to_string(),
                reason: format!("no stored payment method `{id}`"),
            })?;
        self.select(SelectedPaymentMethod::Stored(method))
    }

    /// Submits the selected method with `details`, the JSON object its component produced.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `details` is not a JSON object and `InvalidState` when no
    /// method is selected.
    pub fn submit(&self, details: String) -> Result<(), CheckoutKitError> {
        serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&details).map_err(
            |e| CheckoutKitError::InvalidInput {
                attribute: "details".to_string(),
                reason: e.to_string(),
            },
        )?;

        let payment = {
            let mut flow = lock(&self.shared.flow);
            let payment = match (&flow.state, &flow.selected) {
                (DropInState::ComponentSelected, Some(SelectedPaymentMethod::Regular(method))) => {
                    SubmittedPayment {
                        payment_method_type: method.method_type.clone(),
                        stored_payment_method_id: None,
                        details,
                    }
                }
                (DropInState::ComponentSelected, Some(SelectedPaymentMethod::Stored(method))) => {
                    SubmittedPayment {
                        payment_method_type: method.method_type.clone(),
                        stored_payment_method_id: Some(method.id.clone()),
                        details,
                    }
                }
                (state, _) => {
                    return Err(invalid_state(format!(
                        "submit needs a selected payment method, drop-in is in {state:?}"
                    )))
                }
            };
            flow.state = DropInState::Submitted;
            payment
        };

        if let Some(delegate) = self.shared.delegate() {
            delegate.did_submit(payment);
        }
        Ok(())
    }

    /// Handles an action returned for the submitted payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless a payment was submitted.
    pub async fn handle(&self, action: Action) -> Result<Outcome, CheckoutKitError> {
        {
            let mut flow = lock(&self.shared.flow);
            match flow.state {
                DropInState::Submitted | DropInState::HandlingAction => {}
                state => {
                    return Err(invalid_state(format!(
                        "cannot handle an action in {state:?}"
                    )))
                }
            }
            flow.state = DropInState::HandlingAction;
        }
        Ok(self.action_component.handle(action).await)
    }

    /// Ends the flow with the host's final result.
    pub fn finalize(&self, success: bool) {
        self.action_component.cancel();
        self.shared.dismiss_alert();
        self.shared.set_state(DropInState::Finalized { success });
    }

    /// The shopper closed the drop-in. Stops any action in flight and reports
    /// `Cancelled`.
    pub fn cancel(&self) {
        {
            let mut flow = lock(&self.shared.flow);
            if matches!(flow.state, DropInState::Finalized { .. }) {
                return;
            }
            flow.state = DropInState::Failed;
        }
        self.action_component.cancel();
        if let Some(delegate) = self.shared.delegate() {
            delegate.did_fail(ActionError::Cancelled);
        }
    }
}
