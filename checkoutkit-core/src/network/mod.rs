//! Requests against the checkout shopper API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::config::ApiContext;

mod error;
pub use error::ApiError;

mod http;
pub use http::HttpApiClient;

mod retry;
pub use retry::{
    ApiClientExt, BackoffScheduler, RetryApiClient, RetryOnErrorApiClient, SimpleScheduler,
};

pub mod requests;

/// HTTP verb of an [`HttpRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`, no body.
    Get,
    /// `POST` with a JSON body.
    Post,
}

/// A fully resolved request, ready for any [`ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Absolute URL including the query.
    pub url: Url,
    /// JSON body for `POST`.
    pub body: Option<String>,
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

/// Executes requests. Implementations return `Ok` only for successful status codes.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Sends `request` once (or as often as the implementation's policy says).
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[async_trait]
impl<C: ApiClient + ?Sized> ApiClient for Arc<C> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request).await
    }
}

/// A typed endpoint of the checkout shopper API.
pub trait ApiRequest: Serialize + Send + Sync {
    /// Decoded response body.
    type Response: DeserializeOwned;

    /// Verb used for this endpoint.
    const METHOD: HttpMethod = HttpMethod::Post;

    /// Path relative to the API base URL, without a leading slash.
    fn path(&self, context: &ApiContext) -> String;

    /// Query parameters appended to the path.
    fn query(&self, context: &ApiContext) -> Vec<(&'static str, String)> {
        vec![("clientKey", context.client_key())]
    }

    /// Resolves the endpoint and encodes the body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the URL cannot be built or the body cannot be encoded.
    fn to_http_request(&self, context: &ApiContext) -> Result<HttpRequest, ApiError> {
        let mut url = context.endpoint(&self.path(context))?;
        let query = self.query(context);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let body = match Self::METHOD {
            HttpMethod::Get => None,
            HttpMethod::Post => Some(serde_json::to_string(self).map_err(|e| {
                ApiError::InvalidRequest {
                    error: format!("failed to encode body: {e}"),
                }
            })?),
        };
        Ok(HttpRequest {
            method: Self::METHOD,
            url,
            body,
        })
    }
}

/// Sends a typed request through `client` and decodes the response.
///
/// # Errors
///
/// Returns the client's error unchanged, or `Decoding` for an unexpected body.
pub async fn send_request<R: ApiRequest>(
    client: &dyn ApiClient,
    context: &ApiContext,
    request: &R,
) -> Result<R::Response, ApiError> {
    let http_request = request.to_http_request(context)?;
    let response = client.execute(&http_request).await?;
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Decoding {
        url: http_request.url.to_string(),
        error: e.to_string(),
    })
}
