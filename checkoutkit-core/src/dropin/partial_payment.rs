use std::sync::Arc;

use crate::config::ApiContext;
use crate::error::CheckoutKitError;
use crate::network::requests::{
    Amount, BalanceCheckRequest, BalanceCheckResponse, OrderStatusRequest, OrderStatusResponse,
};
use crate::network::{send_request, ApiClient, ApiClientExt, HttpApiClient, SimpleScheduler};

/// How much of an amount a gift card or prepaid balance covers.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct BalanceCheckResult {
    /// Whether the balance covers the whole amount.
    pub is_balance_enough: bool,
    /// Balance left after paying `amount_to_pay`.
    pub remaining_balance_amount: Amount,
    /// What will be charged to this method.
    pub amount_to_pay: Amount,
}

fn invalid_balance(reason: &str) -> CheckoutKitError {
    CheckoutKitError::InvalidInput {
        attribute: "balance".to_string(),
        reason: reason.to_string(),
    }
}

/// Splits `amount` against `balance`, capped by the transaction limit.
///
/// # Errors
///
/// Returns `InvalidInput` for an empty balance or mismatching currencies.
pub fn check_balance_covers(
    balance: &BalanceCheckResponse,
    amount: &Amount,
) -> Result<BalanceCheckResult, CheckoutKitError> {
    let available = &balance.balance;
    if available.value <= 0 {
        return Err(invalid_balance("zero_balance"));
    }
    let limit = balance.transaction_limit.as_ref();
    if available.currency != amount.currency
        || limit.is_some_and(|limit| limit.currency != amount.currency)
    {
        return Err(invalid_balance("unexpected_currency"));
    }

    let usable = limit.map_or(available.value, |limit| limit.value.min(available.value));
    let to_pay = amount.value.min(usable);
    Ok(BalanceCheckResult {
        is_balance_enough: usable >= amount.value,
        remaining_balance_amount: Amount {
            value: available.value - to_pay,
            currency: available.currency.clone(),
        },
        amount_to_pay: Amount {
            value: to_pay,
            currency: amount.currency.clone(),
        },
    })
}

/// Balance and order requests of partial payments.
#[derive(uniffi::Object)]
pub struct PartialPaymentClient {
    api_context: Arc<ApiContext>,
    api_client: Arc<dyn ApiClient>,
}

impl PartialPaymentClient {
    /// Creates a client sending through `api_client`.
    #[must_use]
    pub fn with_client(api_context: Arc<ApiContext>, api_client: Arc<dyn ApiClient>) -> Self {
        Self {
            api_context,
            api_client,
        }
    }

    fn retrying_client(&self) -> impl ApiClient {
        self.api_client
            .clone()
            .retry_api_client(SimpleScheduler::new(2))
            .retry_on_error_api_client()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl PartialPaymentClient {
    /// Creates a client for the backend of `api_context`.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(api_context: Arc<ApiContext>) -> Self {
        let api_client = Arc::new(HttpApiClient::new(&api_context));
        Self::with_client(api_context, api_client)
    }

    /// Fetches the balance of the method in `payment_method` (JSON produced by its
    /// component) and checks it against `amount`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for malformed JSON or an unusable balance, and
    /// `NetworkError` when the request fails.
    pub async fn check_balance(
        &self,
        payment_method: String,
        amount: Amount,
    ) -> Result<BalanceCheckResult, CheckoutKitError> {
        let payment_method = serde_json::from_str(&payment_method).map_err(|e| {
            CheckoutKitError::InvalidInput {
                attribute: "payment_method".to_string(),
                reason: e.to_string(),
            }
        })?;
        let request = BalanceCheckRequest {
            payment_method,
            amount: amount.clone(),
        };
        let response = send_request(&self.retrying_client(), &self.api_context, &request).await?;
        check_balance_covers(&response, &amount)
    }

    /// Fetches the remaining amount of an order.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` when the request fails.
    pub async fn order_status(
        &self,
        order_data: String,
    ) -> Result<OrderStatusResponse, CheckoutKitError> {
        let request = OrderStatusRequest { order_data };
        Ok(send_request(&self.retrying_client(), &self.api_context, &request).await?)
    }
}
