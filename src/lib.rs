//! # ragchat
//!
//! A retrieval-augmented chatbot. Questions are answered from a persisted
//! vector index over a local document corpus; when the index returns
//! nothing usable the question goes to a web search provider instead.
//! Either way the gathered context is summarized by an LLM.
//!
//! The orchestration itself (index, retriever, summarizer, session) lives
//! in `ragchat-core` and talks to the outside world only through traits.
//! This crate supplies the concrete adapters and the CLI.
//!
//! ```text
//!  corpus ──▶ ingest ──▶ chunk ──▶ VectorIndex ──▶ index.bin + metadata.json
//!                                      │
//!  question ──▶ Retriever ─────────────┤ local context?
//!                  │ no                │ yes
//!                  ▼                   ▼
//!             web search ──────▶ Summarizer ──▶ answer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | tracing subscriber setup |
//! | [`ingest`] | Corpus discovery and loading |
//! | [`extract`] | Document readers (UTF-8 text, PDF) |
//! | [`chunk`] | Paragraph-aware chunking |
//! | [`embedding`] | Embedding providers (hash, OpenAI, Ollama, local) |
//! | [`index_store`] | Two-file on-disk index storage |
//! | [`completion`] | OpenAI-compatible chat completion client |
//! | [`web_search`] | Tavily web search client |
//! | [`guard`] | Timeout and single retry around remote calls |
//! | [`pipeline`] | Index and retriever assembly |
//! | [`commands`] | One-shot CLI commands |
//! | [`chat`] | Interactive chat loop |

pub mod chat;
pub mod chunk;
pub mod commands;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod guard;
pub mod index_store;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod web_search;
