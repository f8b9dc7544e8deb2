//! Retrying wrapper around an [`HttpExecutor`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::gemini::executor::{HttpExecutor, HttpRequest, HttpResponse};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Resends the same request on transport failures, 429 and 5xx responses,
/// doubling the delay after each attempt. Cancellation is never retried.
#[derive(Debug, Clone)]
pub struct RetryingExecutor<E> {
    inner: E,
    max_retries: u32,
    base_delay: Duration,
}

impl<E: HttpExecutor> RetryingExecutor<E> {
    pub fn new(inner: E, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }

    pub fn with_defaults(inner: E) -> Self {
        Self::new(inner, DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

fn should_retry(outcome: &Result<HttpResponse, TransportError>) -> bool {
    match outcome {
        Ok(response) => response.status == 429 || response.status >= 500,
        Err(TransportError::Cancelled) => false,
        Err(_) => true,
    }
}

#[async_trait]
impl<E: HttpExecutor> HttpExecutor for RetryingExecutor<E> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut attempts = 0;
        let mut delay = self.base_delay;

        loop {
            let outcome = self.inner.execute(request.clone()).await;

            if !should_retry(&outcome) || attempts >= self.max_retries {
                if attempts > 0 && outcome.is_ok() {
                    info!("Request finished after {} retry attempts", attempts);
                }
                return outcome;
            }

            attempts += 1;
            match &outcome {
                Ok(response) => warn!(
                    "HTTP {} (attempt {}/{}), retrying in {:?}",
                    response.status, attempts, self.max_retries, delay
                ),
                Err(e) => warn!(
                    "{} (attempt {}/{}), retrying in {:?}",
                    e, attempts, self.max_retries, delay
                ),
            }
            drop(outcome);

            sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }
}
