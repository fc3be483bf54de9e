//! Chat session: an ordered transcript driven by a [`Retriever`].
//!
//! One [`ChatSession`] per conversation. `ask` takes `&mut self`, so a
//! session resolves one query at a time and each user turn is immediately
//! followed by its assistant turn.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::warn;

use crate::error::{RagError, Result};
use crate::models::Turn;
use crate::retriever::{Answer, Retriever};

pub struct ChatSession {
    retriever: Arc<Retriever>,
    top_k: NonZeroUsize,
    transcript: Vec<Turn>,
}

impl ChatSession {
    pub fn new(retriever: Arc<Retriever>, top_k: NonZeroUsize) -> Self {
        Self {
            retriever,
            top_k,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// Answer one user query and record both turns.
    ///
    /// On failure the assistant turn holds [`failure_message`] and the error
    /// is returned so the surface can report it.
    pub async fn ask(&mut self, query: &str) -> Result<Answer> {
        let outcome = self.retriever.answer_detailed(query, self.top_k).await;
        self.transcript.push(Turn::user(query));
        match outcome {
            Ok(answer) => {
                self.transcript.push(Turn::assistant(answer.summary.clone()));
                Ok(answer)
            }
            Err(e) => {
                warn!(error = %e, "query failed");
                self.transcript.push(Turn::assistant(failure_message(&e)));
                Err(e)
            }
        }
    }
}

/// User-facing text for a failed query.
pub fn failure_message(err: &RagError) -> String {
    match err {
        RagError::NotLoaded | RagError::IndexLoad(_) | RagError::IndexBuild(_) => {
            format!("Sorry, the local knowledge base is unavailable ({}).", err)
        }
        RagError::SearchUnavailable(_) => {
            format!("Sorry, I have no local data on that and web search failed ({}).", err)
        }
        RagError::Embedding(_) | RagError::Completion(_) => {
            format!("Sorry, I couldn't produce an answer ({}).", err)
        }
    }
}

/// Split a summary into the word-by-word presentation stream.
///
/// Each item is a space-separated word followed by a single space.
pub fn stream_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(' ').map(|w| format!("{} ", w))
}
