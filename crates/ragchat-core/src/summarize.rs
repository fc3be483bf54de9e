//! Summarization over a single fixed prompt template.
//!
//! Both retrieval paths (local index and web fallback) hand their aggregated
//! context to [`Summarizer::summarize`], so the completion backend always
//! sees the same prompt shape.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;

/// A language-model completion backend.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Returns the model identifier (e.g. `"llama-3.1-8b-instant"`).
    fn model_name(&self) -> &str;
    /// Submit `prompt` and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Render the summarization prompt for `query` over `context`.
///
/// ```rust
/// use ragchat_core::summarize::summary_prompt;
///
/// assert_eq!(
///     summary_prompt("q", "ctx"),
///     "Summarize the following context for the query: 'q'\n\nContext:\nctx\n\nSummary:"
/// );
/// ```
pub fn summary_prompt(query: &str, context: &str) -> String {
    format!(
        "Summarize the following context for the query: '{}'\n\nContext:\n{}\n\nSummary:",
        query, context
    )
}

/// Wraps a [`Completer`] with the summarization template.
#[derive(Clone)]
pub struct Summarizer {
    completer: Arc<dyn Completer>,
}

impl Summarizer {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    /// Summarize `context` for `query`. The backend's text is returned
    /// verbatim; failures are not retried here.
    pub async fn summarize(&self, query: &str, context: &str) -> Result<String> {
        let prompt = summary_prompt(query, context);
        debug!(
            model = self.completer.model_name(),
            prompt_chars = prompt.len(),
            "requesting summary"
        );
        self.completer.complete(&prompt).await
    }
}
