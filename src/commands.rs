//! One-shot CLI commands: `build`, `query`, `ask`.

use std::num::NonZeroUsize;

use anyhow::Result;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::pipeline::{build_retriever, open_index, rebuild_index};

pub async fn run_build(config: &Config) -> Result<()> {
    let embedder = create_embedder(&config.embedding)?;
    let index = rebuild_index(config, embedder).await?;
    println!("build ok");
    println!("  entries: {}", index.len());
    println!("  dims: {}", index.dims());
    println!("  stored in: {}", config.index.persist_dir.display());
    Ok(())
}

pub async fn run_query(config: &Config, query: &str, top_k: NonZeroUsize) -> Result<()> {
    let embedder = create_embedder(&config.embedding)?;
    let index = open_index(config, embedder).await?;
    let results = index.query(query, top_k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        let source = r
            .chunk
            .metadata
            .get("source")
            .map(String::as_str)
            .unwrap_or("(unknown)");
        println!("{}. [{:.3}] {}", i + 1, r.score, source);
        let excerpt: String = r.chunk.context_text().chars().take(240).collect();
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " "));
    }
    Ok(())
}

pub async fn run_ask(config: &Config, query: &str, top_k: NonZeroUsize) -> Result<()> {
    let retriever = build_retriever(config).await?;
    let answer = retriever.answer_detailed(query, top_k).await?;
    tracing::info!(source = %answer.source, "answered");
    println!("{}", answer.summary);
    Ok(())
}
