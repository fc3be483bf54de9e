//! Web search capability used when the local index yields no context.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::WebResult;

/// An external web search API.
///
/// Implementations issue one request per call and return the provider's
/// results unmodified, in provider order. Transport and API failures are
/// reported as [`RagError::SearchUnavailable`](crate::error::RagError::SearchUnavailable);
/// an implementation never turns a failure into an empty result.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Provider identifier (e.g. `"tavily"`).
    fn name(&self) -> &str;
    async fn search(&self, query: &str) -> Result<Vec<WebResult>>;
}

/// Flatten web results into a summarization context.
///
/// Each result becomes `"title is {title} and content is {content}"`; lines
/// are concatenated with no separator.
pub fn web_context(results: &[WebResult]) -> String {
    results
        .iter()
        .map(|r| format!("title is {} and content is {}", r.title, r.content))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_context_no_separator() {
        let results = vec![
            WebResult {
                title: "A".to_string(),
                content: "foo".to_string(),
            },
            WebResult {
                title: "B".to_string(),
                content: "bar".to_string(),
            },
        ];
        assert_eq!(
            web_context(&results),
            "title is A and content is footitle is B and content is bar"
        );
    }

    #[test]
    fn test_web_context_empty() {
        assert_eq!(web_context(&[]), "");
    }
}
