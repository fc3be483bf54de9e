//! OpenAI-compatible chat-completions backend.
//!
//! Groq (the default) and OpenAI both expose `POST {base}/chat/completions`.
//! The prompt is sent as a single user message and the first choice's
//! content is returned verbatim. Timeouts and the single retry are applied
//! by [`Guarded`](crate::guard::Guarded), not here.

use anyhow::Context;
use async_trait::async_trait;
use ragchat_core::summarize::Completer;
use ragchat_core::{RagError, Result};

use crate::config::CompletionConfig;

pub struct ChatCompleter {
    model: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl ChatCompleter {
    /// Build from config, reading the API key from `completion.api_key_env`.
    pub fn new(config: &CompletionConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} environment variable not set", config.api_key_env))?;
        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url()?),
            api_key,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Completer for ChatCompleter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Completion(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Completion(format!("API error {}: {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::Completion(format!("invalid response body: {}", e)))?;
        parse_completion(&json)
    }
}

/// Extract `choices[0].message.content`.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            RagError::Completion("response has no choices[0].message.content".to_string())
        })
}
