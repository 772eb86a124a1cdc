use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, Retryable};

use super::{ApiClient, ApiError, HttpRequest, HttpResponse};

/// Retries immediately until `maximum_count` attempts were made.
///
/// The count includes the first attempt: `SimpleScheduler::new(3)` allows at most three
/// calls, two of them retries. A count of zero behaves like one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleScheduler {
    maximum_count: u32,
}

impl SimpleScheduler {
    /// Creates a scheduler allowing `maximum_count` attempts in total.
    #[must_use]
    pub const fn new(maximum_count: u32) -> Self {
        Self { maximum_count }
    }

    /// Total attempts allowed.
    #[must_use]
    pub const fn maximum_count(&self) -> u32 {
        self.maximum_count
    }
}

/// Attempt counter of a [`SimpleScheduler`]. Every failure advances the counter before
/// the retry decision is made.
#[derive(Debug)]
pub struct SimpleBackoff {
    failures: u32,
    maximum_count: u32,
}

impl Iterator for SimpleBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        (self.failures < self.maximum_count).then_some(Duration::ZERO)
    }
}

impl BackoffBuilder for SimpleScheduler {
    type Backoff = SimpleBackoff;

    fn build(self) -> Self::Backoff {
        SimpleBackoff {
            failures: 0,
            maximum_count: self.maximum_count,
        }
    }
}

/// Doubling delay starting at `initial_delay`, capped at `max_delay`, for at most
/// `maximum_count` attempts. The delay before retry `n` is
/// `min(initial_delay * 2^(n - 1), max_delay)`, with no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffScheduler {
    maximum_count: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl BackoffScheduler {
    /// Creates a scheduler allowing `maximum_count` attempts in total.
    #[must_use]
    pub const fn new(maximum_count: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            maximum_count,
            initial_delay,
            max_delay,
        }
    }

    fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Iterator state of a [`BackoffScheduler`].
#[derive(Debug)]
pub struct DoublingBackoff {
    scheduler: BackoffScheduler,
    failures: u32,
}

impl Iterator for DoublingBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        (self.failures < self.scheduler.maximum_count)
            .then(|| self.scheduler.delay_for_retry(self.failures))
    }
}

impl BackoffBuilder for BackoffScheduler {
    type Backoff = DoublingBackoff;

    fn build(self) -> Self::Backoff {
        DoublingBackoff {
            scheduler: self,
            failures: 0,
        }
    }
}

/// Re-executes failed requests while the scheduler allows it.
#[derive(Debug, Clone)]
pub struct RetryApiClient<C, S> {
    inner: C,
    scheduler: S,
}

#[async_trait]
impl<C, S> ApiClient for RetryApiClient<C, S>
where
    C: ApiClient,
    S: BackoffBuilder + Clone,
{
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (|| async { self.inner.execute(request).await })
            .retry(self.scheduler.clone())
            .notify(|err: &ApiError, _| log::debug!("retrying {}: {err}", request.url))
            .await
    }
}

/// Re-executes requests that failed with a transient error (HTTP 429, 5xx, timeouts,
/// connection failures). Other failures are returned at once.
#[derive(Debug, Clone)]
pub struct RetryOnErrorApiClient<C> {
    inner: C,
    scheduler: SimpleScheduler,
}

impl<C> RetryOnErrorApiClient<C> {
    /// Overrides how many attempts transient failures get, one retry by default.
    #[must_use]
    pub const fn with_scheduler(mut self, scheduler: SimpleScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }
}

#[async_trait]
impl<C: ApiClient> ApiClient for RetryOnErrorApiClient<C> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (|| async { self.inner.execute(request).await })
            .retry(self.scheduler)
            .when(ApiError::is_retryable)
            .notify(|err: &ApiError, _| log::debug!("retrying {} after {err}", request.url))
            .await
    }
}

/// Composes retry decorators around a client:
/// `client.retry_api_client(SimpleScheduler::new(2)).retry_on_error_api_client()`.
pub trait ApiClientExt: ApiClient + Sized {
    /// Retries any failure while `scheduler` allows it.
    fn retry_api_client<S>(self, scheduler: S) -> RetryApiClient<Self, S>
    where
        S: BackoffBuilder + Clone,
    {
        RetryApiClient {
            inner: self,
            scheduler,
        }
    }

    /// Retries transient failures once.
    fn retry_on_error_api_client(self) -> RetryOnErrorApiClient<Self> {
        RetryOnErrorApiClient {
            inner: self,
            scheduler: SimpleScheduler::new(2),
        }
    }
}

impl<C: ApiClient> ApiClientExt for C {}
