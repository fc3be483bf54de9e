//! Retrieval orchestration: local index first, web search as fallback.
//!
//! # Decision rule
//!
//! 1. Query the [`VectorIndex`] for `top_k` chunks and join their non-empty
//!    texts with a blank line into the local context.
//! 2. If the local context is non-empty, summarize it.
//! 3. Otherwise run one web search, flatten its results with
//!    [`web_context`], and summarize that.
//!
//! The check is on presence, not relevance: any retrieved chunk with text
//! suppresses the web path, however low its score. Every collaborator
//! failure is returned to the caller as-is.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::ScoredChunk;
use crate::summarize::Summarizer;
use crate::web::{web_context, WebSearch};

/// Which context the summary was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSource {
    Local,
    Web,
}

impl std::fmt::Display for ContextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextSource::Local => write!(f, "local"),
            ContextSource::Web => write!(f, "web"),
        }
    }
}

/// A summary plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub summary: String,
    pub source: ContextSource,
    /// The exact context string handed to the summarizer.
    pub context: String,
}

/// Join the non-empty texts of retrieved chunks with a blank line.
pub fn local_context(results: &[ScoredChunk]) -> String {
    results
        .iter()
        .map(|r| r.chunk.context_text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The retrieval orchestrator. Stateless per call.
pub struct Retriever {
    index: Arc<VectorIndex>,
    web: Arc<dyn WebSearch>,
    summarizer: Summarizer,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, web: Arc<dyn WebSearch>, summarizer: Summarizer) -> Self {
        Self {
            index,
            web,
            summarizer,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Answer `query`, returning only the summary text.
    pub async fn answer(&self, query: &str, top_k: NonZeroUsize) -> Result<String> {
        Ok(self.answer_detailed(query, top_k).await?.summary)
    }

    /// Answer `query`, also reporting which path was taken.
    pub async fn answer_detailed(&self, query: &str, top_k: NonZeroUsize) -> Result<Answer> {
        let results = self.index.query(query, top_k).await?;
        let local = local_context(&results);

        let (source, context) = if !local.is_empty() {
            info!(
                retrieved = results.len(),
                top_score = results.first().map(|r| r.score),
                "answering from local index"
            );
            (ContextSource::Local, local)
        } else {
            info!(
                retrieved = results.len(),
                provider = self.web.name(),
                "no local context, falling back to web search"
            );
            let web_results = self.web.search(query).await?;
            info!(results = web_results.len(), "web search returned");
            (ContextSource::Web, web_context(&web_results))
        };

        let summary = self.summarizer.summarize(query, &context).await?;
        Ok(Answer {
            summary,
            source,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn scored(text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new(text),
            score: 0.5,
        }
    }

    #[test]
    fn test_local_context_joins_with_blank_line() {
        let results = vec![scored("one"), scored(""), scored("two")];
        assert_eq!(local_context(&results), "one\n\ntwo");
    }

    #[test]
    fn test_local_context_all_empty() {
        assert_eq!(local_context(&[scored(""), scored("")]), "");
        assert_eq!(local_context(&[]), "");
    }

    #[test]
    fn test_local_context_uses_text_metadata() {
        let results = vec![ScoredChunk {
            chunk: Chunk::new("").with_metadata("text", "from metadata"),
            score: 0.1,
        }];
        assert_eq!(local_context(&results), "from metadata");
    }
}
