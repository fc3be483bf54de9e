//! Error taxonomy shared by every component.
//!
//! Collaborator failures propagate unchanged to the caller of
//! [`Retriever::answer`](crate::retriever::Retriever::answer); nothing in
//! this crate swallows an error or substitutes an empty result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// Building the index failed (empty corpus, embedding failure, dimension
    /// mismatch, or persisting the result). Nothing is kept from a failed build.
    #[error("index build failed: {0}")]
    IndexBuild(String),

    /// The persisted index could not be restored.
    #[error("index load failed: {0}")]
    IndexLoad(String),

    /// `query` was called before `build` or `load`.
    #[error("index is not loaded; build or load it first")]
    NotLoaded,

    /// Embedding a query failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The web search provider could not be reached or returned an error.
    #[error("web search unavailable: {0}")]
    SearchUnavailable(String),

    /// The completion backend failed.
    #[error("completion failed: {0}")]
    Completion(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
