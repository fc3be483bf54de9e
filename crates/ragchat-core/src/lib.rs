//! # ragchat core
//!
//! Runtime-free logic for ragchat: the data model, the vector index, the
//! summarization prompt, the retrieval orchestrator that chooses between
//! local and web context, and the chat session transcript.
//!
//! This crate contains no tokio, filesystem I/O, or network code. Every
//! external collaborator (embedding model, completion backend, web search
//! API, durable storage) is consumed through a trait and supplied by the
//! application crate.
//!
//! ```text
//!            ┌──────────────┐
//!  query ──▶ │  Retriever   │──▶ VectorIndex::query ──▶ local context?
//!            └──────┬───────┘            │ yes                 │ no
//!                   │                    ▼                     ▼
//!                   │              Summarizer  ◀──  WebSearch::search
//!                   ▼
//!             ChatSession (transcript)
//! ```

pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod retriever;
pub mod session;
pub mod storage;
pub mod summarize;
pub mod web;

pub use error::{RagError, Result};
