//! Interactive chat loop.
//!
//! Reads one question per line from stdin and streams each answer back
//! word by word. `/exit`, `/quit` or end of input ends the session.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ragchat_core::session::{failure_message, stream_words, ChatSession};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::pipeline::build_retriever;

pub async fn run_chat(config: &Config) -> Result<()> {
    let retriever = Arc::new(build_retriever(config).await?);
    let mut session = ChatSession::new(retriever, config.retrieval.top_k()?);

    // Pacing only makes sense for a human watching a terminal.
    let delay = if atty::is(atty::Stream::Stdout) {
        Duration::from_millis(config.chat.stream_delay_ms)
    } else {
        Duration::ZERO
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "/exit" || query == "/quit" {
            break;
        }

        match session.ask(query).await {
            Ok(answer) => {
                tracing::debug!(source = %answer.source, "answered");
                print_streamed(&answer.summary, delay).await?;
            }
            Err(e) => println!("error: {}", failure_message(&e)),
        }
    }

    tracing::info!(turns = session.transcript().len(), "chat ended");
    Ok(())
}

fn prompt() -> Result<()> {
    let mut out = std::io::stdout();
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

async fn print_streamed(text: &str, delay: Duration) -> Result<()> {
    let mut out = std::io::stdout();
    for word in stream_words(text) {
        write!(out, "{}", word)?;
        out.flush()?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    writeln!(out)?;
    Ok(())
}
