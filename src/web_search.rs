//! Tavily web search adapter.
//!
//! One `POST /search` per query; `results[].title` and `results[].content`
//! are returned in the order Tavily ranks them. Transport errors, non-2xx
//! statuses and malformed bodies all surface as
//! [`RagError::SearchUnavailable`].

use anyhow::Context;
use async_trait::async_trait;
use ragchat_core::models::WebResult;
use ragchat_core::web::WebSearch;
use ragchat_core::{RagError, Result};
use serde::Deserialize;

use crate::config::WebSearchConfig;

const TAVILY_URL: &str = "https://api.tavily.com/search";

pub struct TavilySearch {
    endpoint: String,
    api_key: String,
    max_results: usize,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl TavilySearch {
    /// Build from config, reading the API key from `web_search.api_key_env`.
    pub fn new(config: &WebSearchConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} environment variable not set", config.api_key_env))?;
        Ok(Self {
            endpoint: config.url.clone().unwrap_or_else(|| TAVILY_URL.to_string()),
            api_key,
            max_results: config.max_results,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<WebResult>> {
        let body = serde_json::json!({
            "query": query,
            "max_results": self.max_results,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::SearchUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::SearchUnavailable(format!(
                "Tavily API error {}: {}",
                status, text
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RagError::SearchUnavailable(format!("reading response: {}", e)))?;
        parse_results(&text)
    }
}

fn parse_results(body: &str) -> Result<Vec<WebResult>> {
    let parsed: TavilyResponse = serde_json::from_str(body)
        .map_err(|e| RagError::SearchUnavailable(format!("invalid response body: {}", e)))?;
    Ok(parsed
        .results
        .into_iter()
        .map(|r| WebResult {
            title: r.title,
            content: r.content,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results_keeps_order() {
        let body = r#"{
            "query": "q",
            "results": [
                {"title": "A", "url": "https://a", "content": "foo", "score": 0.2},
                {"title": "B", "url": "https://b", "content": "bar", "score": 0.9}
            ]
        }"#;
        let results = parse_results(body).unwrap();
        assert_eq!(
            results,
            vec![
                WebResult { title: "A".to_string(), content: "foo".to_string() },
                WebResult { title: "B".to_string(), content: "bar".to_string() },
            ]
        );
    }

    #[test]
    fn test_parse_results_missing_fields_default_empty() {
        let results = parse_results(r#"{"results": [{"url": "https://x"}]}"#).unwrap();
        assert_eq!(results[0].title, "");
        assert_eq!(results[0].content, "");
    }

    #[test]
    fn test_parse_results_rejects_garbage() {
        assert!(matches!(
            parse_results("<html>rate limited</html>"),
            Err(RagError::SearchUnavailable(_))
        ));
    }

    #[test]
    fn test_new_requires_key() {
        let cfg = WebSearchConfig {
            api_key_env: "RAGCHAT_TEST_UNSET_TAVILY_KEY".to_string(),
            ..Default::default()
        };
        assert!(TavilySearch::new(&cfg).is_err());
    }
}
