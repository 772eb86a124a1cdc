use super::{ActionContext, Lifecycle};
use crate::action::{ActionComponentData, ActionDetails};
use crate::error::ActionError;
use crate::network::requests::PaymentStatusRequest;
use crate::network::send_request;

/// Where a status poll loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum PollingState {
    /// Not started.
    Idle,
    /// Waiting for a final result code.
    Polling {
        /// Requests sent so far.
        attempts: u32,
    },
    /// A final result code or a terminal error was reached.
    Finished,
}

/// Polls the payment status endpoint until the payment leaves the pending state.
///
/// Used on its own by await and QR code flows and chained after a successful Twint
/// app switch. Its result is always delivered by the component that owns it.
pub struct PollingComponent {
    context: ActionContext,
    lifecycle: Lifecycle<PollingState>,
}

impl PollingComponent {
    pub(crate) fn new(context: ActionContext) -> Self {
        Self {
            context,
            lifecycle: Lifecycle::new(PollingState::Idle),
        }
    }

    /// Current state of the loop.
    #[must_use]
    pub fn state(&self) -> PollingState {
        self.lifecycle.get()
    }

    /// Polls until a final result code arrives or errors exceed the tolerated number of
    /// consecutive failures. Dropping the future stops polling.
    pub(crate) async fn poll(&self, payment_data: &str) -> Result<ActionComponentData, ActionError> {
        let request = PaymentStatusRequest {
            payment_data: payment_data.to_string(),
        };
        let interval = self.context.configuration.polling_interval;
        let tolerated = self.context.configuration.max_consecutive_polling_errors;

        let mut attempts = 0;
        let mut consecutive_errors = 0;
        loop {
            attempts += 1;
            self.lifecycle.set(PollingState::Polling { attempts });

            match send_request(
                self.context.api_client.as_ref(),
                &self.context.api_context,
                &request,
            )
            .await
            {
                Ok(response) if response.is_pending() => {
                    consecutive_errors = 0;
                    log::trace!("payment still {}", response.result_code);
                }
                Ok(response) => {
                    log::debug!("payment status {} after {attempts} polls", response.result_code);
                    self.lifecycle.set(PollingState::Finished);
                    return Ok(ActionComponentData {
                        details: ActionDetails::Await {
                            payload: response.payload,
                        },
                        payment_data: Some(payment_data.to_string()),
                    });
                }
                Err(error) => {
                    consecutive_errors += 1;
                    if consecutive_errors > tolerated {
                        self.lifecycle.set(PollingState::Finished);
                        return Err(ActionError::Network(error));
                    }
                    log::warn!("status poll failed ({consecutive_errors} in a row): {error}");
                }
            }

            tokio::time::sleep(interval).await;
        }
    }
}
