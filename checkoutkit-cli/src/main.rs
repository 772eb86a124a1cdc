//! Command line utility for exercising `CheckoutKit` against the checkout shopper API.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use checkoutkit_core::network::requests::{Amount, PaymentStatusRequest};
use checkoutkit_core::network::{send_request, ApiClientExt, HttpApiClient};
use checkoutkit_core::{
    decode_action, decode_payment_methods, encode_action, ApiContext, Environment,
    PartialPaymentClient, PublicKeyProvider,
};
use clap::{Parser, Subcommand};
use eyre::WrapErr;

mod logging;

/// `CheckoutKit` developer CLI
#[derive(Debug, Parser)]
#[command(name = "checkoutkit", version)]
struct Cli {
    /// Backend environment
    #[arg(long, env = "CHECKOUTKIT_ENVIRONMENT", default_value = "test")]
    environment: Environment,

    /// Client key, required by commands talking to the backend
    #[arg(long, env = "CHECKOUTKIT_CLIENT_KEY")]
    client_key: Option<String>,

    /// Send requests to this URL instead of the environment host
    #[arg(long, env = "CHECKOUTKIT_BASE_URL")]
    base_url: Option<String>,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Per-request timeout in seconds for `payment-status`
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode an action and print it with its canonical encoding
    DecodeAction {
        /// JSON file, stdin when omitted
        file: Option<PathBuf>,
    },

    /// Decode a `/paymentMethods` response
    DecodePaymentMethods {
        /// JSON file, stdin when omitted
        file: Option<PathBuf>,
    },

    /// Query the status of an await, QR code or Twint payment
    PaymentStatus {
        /// `paymentData` of the action
        #[arg(long)]
        payment_data: String,
    },

    /// Fetch the card encryption public key of the client key
    PublicKey,

    /// Check a gift card balance against an amount
    CheckBalance {
        /// Payment method JSON produced by the component
        #[arg(long)]
        payment_method: String,

        /// Amount in minor units
        #[arg(long)]
        value: i64,

        /// ISO 4217 currency code
        #[arg(long, default_value = "EUR")]
        currency: String,
    },
}

impl Cli {
    fn api_context(&self) -> eyre::Result<Arc<ApiContext>> {
        let client_key = self
            .client_key
            .as_deref()
            .ok_or_else(|| eyre::eyre!("--client-key or CHECKOUTKIT_CLIENT_KEY is required"))?;
        let context = match &self.base_url {
            Some(base_url) => ApiContext::with_base_url(self.environment, client_key, base_url)?,
            None => ApiContext::new(self.environment, client_key)?,
        };
        Ok(Arc::new(context))
    }
}

fn read_input(file: Option<&Path>) -> eyre::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .wrap_err("failed to read stdin")?;
            Ok(input)
        }
    }
}

fn pretty(json: &str) -> eyre::Result<String> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);
    tracing::debug!(environment = %cli.environment, "starting");

    match &cli.cmd {
        Command::DecodeAction { file } => {
            let action = decode_action(&read_input(file.as_deref())?)?;
            println!("{action:#?}");
            println!("{}", pretty(&encode_action(action)?)?);
        }
        Command::DecodePaymentMethods { file } => {
            let methods = decode_payment_methods(&read_input(file.as_deref())?)?;
            for method in &methods.regular {
                println!("{:<24} {}", method.method_type, method.name);
            }
            for method in &methods.stored {
                println!(
                    "{:<24} {} (stored {}{})",
                    method.method_type,
                    method.name,
                    method.id,
                    method
                        .last_four
                        .as_ref()
                        .map(|last_four| format!(", ending {last_four}"))
                        .unwrap_or_default()
                );
            }
        }
        Command::PaymentStatus { payment_data } => {
            let context = cli.api_context()?;
            let client = HttpApiClient::new(&context)
                .with_timeout(Duration::from_secs(cli.timeout_secs))
                .retry_on_error_api_client();
            let request = PaymentStatusRequest {
                payment_data: payment_data.clone(),
            };
            let status = send_request(&client, &context, &request).await?;
            tracing::info!(result_code = %status.result_code, "status received");
            println!("resultCode: {}", status.result_code);
            println!("pending:    {}", status.is_pending());
            println!("payload:    {}", status.payload);
        }
        Command::PublicKey => {
            let provider = PublicKeyProvider::new(cli.api_context()?);
            println!("{}", provider.fetch().await?);
        }
        Command::CheckBalance {
            payment_method,
            value,
            currency,
        } => {
            let client = PartialPaymentClient::new(cli.api_context()?);
            let amount = Amount {
                value: *value,
                currency: currency.clone(),
            };
            let result = client.check_balance(payment_method.clone(), amount).await?;
            println!("enough:    {}", result.is_balance_enough);
            println!(
                "to pay:    {} {}",
                result.amount_to_pay.value, result.amount_to_pay.currency
            );
            println!(
                "remaining: {} {}",
                result.remaining_balance_amount.value, result.remaining_balance_amount.currency
            );
        }
    }

    Ok(())
}
