//! Timeout and single-retry wrapper for network-bound collaborators.
//!
//! [`Guarded`] wraps a [`WebSearch`] or [`Completer`] so every call runs
//! under `tokio::time::timeout` and is attempted at most twice. A timeout
//! counts as the collaborator being unavailable; no partial result is kept.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ragchat_core::models::WebResult;
use ragchat_core::summarize::Completer;
use ragchat_core::web::WebSearch;
use ragchat_core::{RagError, Result};
use tracing::warn;

/// Attempts per call: the first try plus one retry.
pub const MAX_ATTEMPTS: u32 = 2;

pub struct Guarded<T> {
    inner: T,
    timeout: Duration,
}

impl<T> Guarded<T> {
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

/// Run `call` with a per-attempt timeout, retrying once on any failure.
pub async fn with_timeout_and_retry<T, F, Fut>(
    label: &str,
    timeout: Duration,
    on_timeout: fn(String) -> RagError,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(format!(
                "{} timed out after {}s",
                label,
                timeout.as_secs_f32()
            ))),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!(attempt, error = %e, "{} failed, retrying", label);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[async_trait]
impl<T: WebSearch> WebSearch for Guarded<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, query: &str) -> Result<Vec<WebResult>> {
        with_timeout_and_retry(
            self.inner.name(),
            self.timeout,
            RagError::SearchUnavailable,
            || self.inner.search(query),
        )
        .await
    }
}

#[async_trait]
impl<T: Completer> Completer for Guarded<T> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        with_timeout_and_retry(
            self.inner.model_name(),
            self.timeout,
            RagError::Completion,
            || self.inner.complete(prompt),
        )
        .await
    }
}
