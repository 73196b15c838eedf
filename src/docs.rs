//! Knowledge-base document loader.
//!
//! Walks the configured docs root, applies the include globs, and returns
//! trimmed [`Document`]s in deterministic name order. Files that trim to
//! nothing are skipped with a warning, not an error.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::Document;

pub fn load_documents(config: &Config) -> Result<Vec<Document>> {
    let root = &config.docs.root;
    if !root.exists() {
        bail!("Document source not found: {}", root.display());
    }

    let include_set = build_globset(&config.docs.include_globs)?;

    let mut documents = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = relative.to_string_lossy().to_string();

        if !include_set.is_match(&name) {
            continue;
        }

        let raw = std::fs::read_to_string(path)?;
        let text = raw.trim();
        if text.is_empty() {
            eprintln!("Warning: skipping empty document: {}", name);
            continue;
        }

        documents.push(Document {
            name,
            text: text.to_string(),
        });
    }

    // Sort for deterministic ordering
    documents.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(documents)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
