//! Filesystem ingestion: walk the corpus directory and chunk every file.
//!
//! Files are selected with include/exclude globs relative to
//! `[ingest].root` and visited in sorted order so the resulting corpus, and
//! therefore the built index, is deterministic. Markdown and text files are
//! read as UTF-8; PDFs go through [`extract`](crate::extract). A file that
//! cannot be read is skipped with a warning.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ragchat_core::models::Chunk;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::IngestConfig;
use crate::extract::read_document;

/// Result of scanning the corpus directory.
#[derive(Debug, Default)]
pub struct Corpus {
    pub chunks: Vec<Chunk>,
    pub files: usize,
    pub skipped: usize,
}

pub fn load_corpus(config: &IngestConfig) -> Result<Corpus> {
    let root = &config.root;
    if !root.exists() {
        bail!("Ingest root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        paths.push((path.to_path_buf(), rel_str));
    }
    paths.sort_by(|a, b| a.1.cmp(&b.1));

    let mut corpus = Corpus::default();
    for (path, rel_str) in paths {
        match read_document(&path) {
            Ok(text) => {
                let chunks = chunk_text(&rel_str, &text, config.max_tokens);
                debug!(file = %rel_str, chunks = chunks.len(), "chunked");
                corpus.files += 1;
                corpus.chunks.extend(chunks);
            }
            Err(e) => {
                warn!(file = %rel_str, error = %e, "skipping unreadable file");
                corpus.skipped += 1;
            }
        }
    }

    info!(
        files = corpus.files,
        skipped = corpus.skipped,
        chunks = corpus.chunks.len(),
        root = %root.display(),
        "corpus loaded"
    );
    Ok(corpus)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
