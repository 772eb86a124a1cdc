use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use super::error::is_retryable_status;
use super::{ApiClient, ApiError, HttpMethod, HttpRequest, HttpResponse};
use crate::config::ApiContext;

/// `reqwest` backed client. Sets a timeout and user agent, refuses plain http towards
/// the environment hosts and classifies failures. Sends every request once; wrap it with
/// `ApiClientExt` for retries.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    timeout: Duration,
    allow_insecure: bool,
}

impl HttpApiClient {
    /// Creates a client for `context`.
    #[must_use]
    pub fn new(context: &ApiContext) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = rustls::crypto::ring::default_provider().install_default();
        }
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
            allow_insecure: context.allows_insecure(),
        }
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Error body returned by the checkout backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceError {
    error_code: Option<String>,
    message: Option<String>,
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.to_string();
        if !self.allow_insecure && request.url.scheme() != "https" {
            return Err(ApiError::InvalidRequest {
                error: format!("refusing to send a request to insecure url {url}"),
            });
        }

        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = self
            .client
            .request(method, request.url.clone())
            .timeout(self.timeout)
            .header(
                "User-Agent",
                format!("checkoutkit-core/{}", env!("CARGO_PKG_VERSION")),
            );
        if let Some(body) = &request.body {
            builder = builder
                .header("Content-Type", "application/json")
                .body(body.clone());
        }

        let response = builder.send().await.map_err(|err| ApiError::Transport {
            url: url.clone(),
            retryable: err.is_timeout() || err.is_connect(),
            error: format!("request failed: {err}"),
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|err| ApiError::Transport {
            url: url.clone(),
            retryable: err.is_timeout(),
            error: format!("failed to read body: {err}"),
        })?;

        if !(200..300).contains(&status) {
            log::debug!("{url} returned {status}");
            let service_error = serde_json::from_slice::<ServiceError>(&body).ok();
            let (error_code, message) = match service_error {
                Some(ServiceError {
                    error_code,
                    message: Some(message),
                }) => (error_code, message),
                _ => (None, String::from_utf8_lossy(&body).into_owned()),
            };
            let message = if is_retryable_status(status) && message.is_empty() {
                format!("request error with bad status code {status}")
            } else {
                message
            };
            return Err(ApiError::Status {
                url,
                status,
                error_code,
                message,
            });
        }

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
