use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ApiContext;
use crate::error::CheckoutKitError;
use crate::network::requests::ClientKeyRequest;
use crate::network::{send_request, ApiClient, ApiClientExt, HttpApiClient};

/// Fetches the public key used for card encryption, once per client key.
#[derive(uniffi::Object)]
pub struct PublicKeyProvider {
    api_context: Arc<ApiContext>,
    api_client: Arc<dyn ApiClient>,
    cache: Mutex<HashMap<String, String>>,
}

impl PublicKeyProvider {
    /// Creates a provider sending through `api_client`.
    #[must_use]
    pub fn with_client(api_context: Arc<ApiContext>, api_client: Arc<dyn ApiClient>) -> Self {
        Self {
            api_context,
            api_client,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl PublicKeyProvider {
    /// Creates a provider for the backend of `api_context`.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(api_context: Arc<ApiContext>) -> Self {
        let api_client = Arc::new(HttpApiClient::new(&api_context));
        Self::with_client(api_context, api_client)
    }

    /// The public key of the context's client key, from cache when fetched before.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` when the key cannot be fetched.
    pub async fn fetch(&self) -> Result<String, CheckoutKitError> {
        let client_key = self.api_context.client_key();
        // Held across the request so concurrent callers share one fetch.
        let mut cache = self.cache.lock().await;
        if let Some(key) = cache.get(&client_key) {
            return Ok(key.clone());
        }

        let client = self.api_client.clone().retry_on_error_api_client();
        let response = send_request(&client, &self.api_context, &ClientKeyRequest).await?;
        log::debug!("fetched public key for {}", self.api_context.environment());
        cache.insert(client_key, response.public_key.clone());
        Ok(response.public_key)
    }
}
