use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::error::CheckoutKitError;
use crate::network::ApiError;

/// Checkout backend region a client key belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    /// Test platform, used with `test_` client keys.
    Test,
    /// Live platform, Europe.
    Live,
    /// Live platform, United States.
    LiveUs,
    /// Live platform, Australia.
    LiveAu,
    /// Live platform, Asia Pacific South East.
    LiveApse,
    /// Live platform, India.
    LiveIn,
}

impl Environment {
    /// Base URL of the checkout shopper API, always ending with a slash.
    #[must_use]
    pub fn checkout_shopper_base_url(&self) -> String {
        format!("https://checkoutshopper-{self}.adyen.com/checkoutshopper/")
    }

    /// Whether this is one of the live platforms.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        !matches!(self, Self::Test)
    }
}

const CLIENT_KEY_SECRET_LEN: usize = 32;

fn validate_client_key(environment: Environment, client_key: &str) -> Result<(), CheckoutKitError> {
    let invalid = |reason: &str| CheckoutKitError::InvalidClientKey {
        reason: reason.to_string(),
    };

    let (prefix, secret) = client_key
        .split_once('_')
        .ok_or_else(|| invalid("missing environment prefix"))?;
    let key_is_live = match prefix {
        "test" => false,
        "live" => true,
        _ => return Err(invalid("prefix must be `test` or `live`")),
    };
    if secret.len() != CLIENT_KEY_SECRET_LEN || !secret.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(invalid("expected 32 alphanumeric characters after the prefix"));
    }
    if key_is_live != environment.is_live() {
        return Err(invalid(&format!(
            "a `{prefix}` key cannot be used with the `{environment}` environment"
        )));
    }
    Ok(())
}

/// Where and as whom the SDK talks to the checkout backend.
#[derive(Debug, Clone, uniffi::Object)]
pub struct ApiContext {
    environment: Environment,
    client_key: String,
    base_url: Url,
    custom_host: bool,
}

#[uniffi::export]
impl ApiContext {
    /// Creates a context for `environment`, validating `client_key` against it.
    ///
    /// # Errors
    /// Returns `InvalidClientKey` if the key is malformed or belongs to the other platform.
    #[uniffi::constructor]
    pub fn new(environment: Environment, client_key: &str) -> Result<Self, CheckoutKitError> {
        validate_client_key(environment, client_key)?;
        let base_url = Url::parse(&environment.checkout_shopper_base_url()).map_err(|e| {
            CheckoutKitError::InvalidInput {
                attribute: "environment".to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            environment,
            client_key: client_key.to_string(),
            base_url,
            custom_host: false,
        })
    }

    /// Creates a context that sends requests to `base_url` instead of the environment host.
    /// Used for proxies and local test servers; plain http is accepted for such hosts.
    ///
    /// # Errors
    /// Returns `InvalidClientKey` or `InvalidInput` if the key or the URL are invalid.
    #[uniffi::constructor]
    pub fn with_base_url(
        environment: Environment,
        client_key: &str,
        base_url: &str,
    ) -> Result<Self, CheckoutKitError> {
        validate_client_key(environment, client_key)?;
        let mut base_url = Url::parse(base_url).map_err(|e| CheckoutKitError::InvalidInput {
            attribute: "base_url".to_string(),
            reason: e.to_string(),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            environment,
            client_key: client_key.to_string(),
            base_url,
            custom_host: true,
        })
    }

    /// The environment this context targets.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// The client key sent with every request.
    #[must_use]
    pub fn client_key(&self) -> String {
        self.client_key.clone()
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url.to_string()
    }
}

impl ApiContext {
    /// Resolves `path` (relative, no leading slash) against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidRequest {
                error: format!("invalid endpoint `{path}`: {e}"),
            })
    }

    /// Whether requests may go to a non-https host.
    pub(crate) const fn allows_insecure(&self) -> bool {
        self.custom_host
    }
}

/// Behaviour shared by every action handler.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ActionConfiguration {
    /// Scheme the Twint app calls back to, e.g. `my-shop`.
    pub twint_callback_app_scheme: Option<String>,
    /// Pause between two payment status polls.
    pub polling_interval: Duration,
    /// Consecutive failed polls tolerated before the last error becomes terminal.
    pub max_consecutive_polling_errors: u32,
    /// How long a presented QR code stays payable.
    pub qr_code_expiry: Duration,
    /// Whether the components run inside the drop-in.
    pub is_drop_in: bool,
}

impl Default for ActionConfiguration {
    fn default() -> Self {
        Self {
            twint_callback_app_scheme: None,
            polling_interval: Duration::from_secs(2),
            max_consecutive_polling_errors: 1,
            qr_code_expiry: Duration::from_secs(15 * 60),
            is_drop_in: false,
        }
    }
}

/// Drop-in behaviour.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct DropInConfiguration {
    /// Configuration handed to the owned action component.
    pub action: ActionConfiguration,
    /// Render environment failures as alerts before forwarding them.
    pub present_alerts: bool,
}

impl Default for DropInConfiguration {
    fn default() -> Self {
        Self {
            action: ActionConfiguration {
                is_drop_in: true,
                ..ActionConfiguration::default()
            },
            present_alerts: true,
        }
    }
}

/// Default action configuration, for hosts that only want to override single fields.
#[uniffi::export]
#[must_use]
pub fn default_action_configuration() -> ActionConfiguration {
    ActionConfiguration::default()
}
