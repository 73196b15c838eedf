//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow: load documents → chunk → diff against the
//! store → batch-embed only the new chunks → upsert. Re-runs without
//! `overwrite` are idempotent: deterministic chunk ids let the store
//! report what is already present, and only the complement is embedded.

use anyhow::{bail, Result};

use crate::chunk::chunk_document;
use crate::config::Config;
use crate::docs;
use crate::embedding::Embedder;
use crate::models::{Chunk, IngestSummary};
use crate::store::{ChunkRecord, VectorStore};

pub async fn run_ingest(
    config: &Config,
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    overwrite: bool,
    dry_run: bool,
) -> Result<IngestSummary> {
    let documents = docs::load_documents(config)?;

    if documents.is_empty() {
        bail!(
            "No documents found in source: {}",
            config.docs.root.display()
        );
    }

    let mut all_chunks: Vec<Chunk> = Vec::new();
    for doc in &documents {
        all_chunks.extend(chunk_document(
            &doc.name,
            &doc.text,
            config.chunking.target_chars,
            config.chunking.overlap_chars,
        ));
    }

    if dry_run {
        return Ok(dry_run_summary(documents.len(), all_chunks.len()));
    }

    let total = all_chunks.len();

    let pending: Vec<Chunk> = if overwrite {
        // Deletion of a non-existent collection is not an error.
        store.reset().await?;
        all_chunks
    } else {
        let ids: Vec<String> = all_chunks.iter().map(|c| c.id.clone()).collect();
        let existing = store.existing_ids(&ids).await?;
        all_chunks
            .into_iter()
            .filter(|c| !existing.contains(&c.id))
            .collect()
    };

    if pending.is_empty() {
        return Ok(IngestSummary {
            chunks_ingested: 0,
            message: format!(
                "All {} chunks from {} documents already ingested; nothing to do",
                total,
                documents.len()
            ),
        });
    }

    let mut ingested = 0usize;

    // All-or-nothing per batch: a batch that exhausts its retries aborts
    // the run; batches upserted before it remain in the store.
    for batch in pending.chunks(config.cohere.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_documents(&texts).await?;

        if vectors.len() != batch.len() {
            bail!(
                "Embedding batch returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            );
        }

        let records: Vec<ChunkRecord> = batch
            .iter()
            .zip(vectors.into_iter())
            .map(|(chunk, embedding)| ChunkRecord {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                chunk_index: chunk.chunk_index,
                embedding,
            })
            .collect();

        store.upsert(&records).await?;
        ingested += records.len();
    }

    Ok(IngestSummary {
        chunks_ingested: ingested,
        message: format!(
            "Ingested {} of {} chunks from {} documents",
            ingested,
            total,
            documents.len()
        ),
    })
}

/// Count what a full ingest would process, without an embedder, a store,
/// or an API key. Backs `tia ingest --dry-run`.
pub fn run_dry_run(config: &Config) -> Result<IngestSummary> {
    let documents = docs::load_documents(config)?;

    if documents.is_empty() {
        bail!(
            "No documents found in source: {}",
            config.docs.root.display()
        );
    }

    let chunk_count: usize = documents
        .iter()
        .map(|doc| {
            chunk_document(
                &doc.name,
                &doc.text,
                config.chunking.target_chars,
                config.chunking.overlap_chars,
            )
            .len()
        })
        .sum();

    Ok(dry_run_summary(documents.len(), chunk_count))
}

fn dry_run_summary(documents: usize, chunks: usize) -> IngestSummary {
    IngestSummary {
        chunks_ingested: 0,
        message: format!(
            "dry-run: {} documents, {} chunks; nothing written",
            documents, chunks
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DbConfig, DocsConfig, ServerConfig};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder fake: deterministic vectors, counts texts embedded.
    #[derive(Default)]
    struct FakeEmbedder {
        texts_embedded: AtomicUsize,
    }

    fn pseudo_vector(text: &str) -> Vec<f32> {
        let sum: u32 = text.bytes().map(u32::from).sum();
        vec![(sum % 97) as f32, text.len() as f32, 1.0]
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| pseudo_vector(t)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(pseudo_vector(text))
        }
    }

    fn test_config(root: std::path::PathBuf) -> Config {
        Config {
            db: DbConfig {
                path: "unused.sqlite".into(),
            },
            docs: DocsConfig {
                root,
                include_globs: vec!["**/*.txt".to_string()],
            },
            chunking: crate::config::ChunkingConfig {
                target_chars: 80,
                overlap_chars: 16,
            },
            retrieval: Default::default(),
            cohere: Default::default(),
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
        }
    }

    fn write_docs(tmp: &tempfile::TempDir) {
        std::fs::write(
            tmp.path().join("sop_wires.txt"),
            "Wire transfers are released in two batches daily.\n\n\
             The first batch closes at 11:00 and the second at 16:00.\n\n\
             Transfers submitted after the cutoff roll to the next batch.",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("sanctions.txt"),
            "Transfers flagged for sanctions screening are held in a review queue.\n\n\
             The review SLA is two business days.",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_ingest_then_reingest_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_docs(&tmp);
        let config = test_config(tmp.path().to_path_buf());
        let store = MemoryStore::new();
        let embedder = FakeEmbedder::default();

        let first = run_ingest(&config, &store, &embedder, false, false)
            .await
            .unwrap();
        assert!(first.chunks_ingested > 0);
        let ids_after_first = store.ids();
        let embedded_after_first = embedder.texts_embedded.load(Ordering::SeqCst);
        assert_eq!(embedded_after_first, first.chunks_ingested);

        let second = run_ingest(&config, &store, &embedder, false, false)
            .await
            .unwrap();
        assert_eq!(second.chunks_ingested, 0);
        assert!(second.message.contains("already ingested"));
        assert_eq!(store.ids(), ids_after_first);
        // No embedding calls on the no-op run.
        assert_eq!(
            embedder.texts_embedded.load(Ordering::SeqCst),
            embedded_after_first
        );
    }

    #[tokio::test]
    async fn test_only_new_documents_embedded_on_rerun() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_docs(&tmp);
        let config = test_config(tmp.path().to_path_buf());
        let store = MemoryStore::new();
        let embedder = FakeEmbedder::default();

        run_ingest(&config, &store, &embedder, false, false)
            .await
            .unwrap();
        let before = embedder.texts_embedded.load(Ordering::SeqCst);

        std::fs::write(
            tmp.path().join("chargebacks.txt"),
            "Chargebacks are handled by the disputes team.",
        )
        .unwrap();

        let second = run_ingest(&config, &store, &embedder, false, false)
            .await
            .unwrap();
        assert!(second.chunks_ingested > 0);
        assert_eq!(
            embedder.texts_embedded.load(Ordering::SeqCst) - before,
            second.chunks_ingested
        );
        assert!(store.ids().contains("chargebacks.txt::0"));
    }

    #[tokio::test]
    async fn test_overwrite_resets_and_reembeds_everything() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_docs(&tmp);
        let config = test_config(tmp.path().to_path_buf());
        let store = MemoryStore::new();
        let embedder = FakeEmbedder::default();

        let first = run_ingest(&config, &store, &embedder, false, false)
            .await
            .unwrap();
        let ids = store.ids();

        let rebuilt = run_ingest(&config, &store, &embedder, true, false)
            .await
            .unwrap();
        assert_eq!(rebuilt.chunks_ingested, first.chunks_ingested);
        // Deterministic ids: the rebuilt collection matches the original.
        assert_eq!(store.ids(), ids);
    }

    #[tokio::test]
    async fn test_chunk_ids_are_deterministic_and_scoped() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_docs(&tmp);
        let config = test_config(tmp.path().to_path_buf());
        let store = MemoryStore::new();
        let embedder = FakeEmbedder::default();

        run_ingest(&config, &store, &embedder, false, false)
            .await
            .unwrap();

        let ids = store.ids();
        assert!(ids.contains("sop_wires.txt::0"));
        assert!(ids.contains("sanctions.txt::0"));
        let expected: HashSet<String> = ids
            .iter()
            .filter(|id| id.starts_with("sop_wires.txt::") || id.starts_with("sanctions.txt::"))
            .cloned()
            .collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path().join("missing"));
        let store = MemoryStore::new();
        let embedder = FakeEmbedder::default();

        let err = run_ingest(&config, &store, &embedder, false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_empty_source_is_no_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("blank.txt"), "   \n").unwrap();
        let config = test_config(tmp.path().to_path_buf());
        let store = MemoryStore::new();
        let embedder = FakeEmbedder::default();

        let err = run_ingest(&config, &store, &embedder, false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No documents"));
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_docs(&tmp);
        let config = test_config(tmp.path().to_path_buf());
        let store = MemoryStore::new();
        let embedder = FakeEmbedder::default();

        let summary = run_ingest(&config, &store, &embedder, false, true)
            .await
            .unwrap();
        assert_eq!(summary.chunks_ingested, 0);
        assert!(summary.message.contains("dry-run"));
        assert!(store.is_empty());
        assert_eq!(embedder.texts_embedded.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_run() {
        struct FailingEmbedder;

        #[async_trait]
        impl Embedder for FailingEmbedder {
            async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
                bail!("Cohere embed error 500: down")
            }
            async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
                bail!("unused")
            }
        }

        let tmp = tempfile::TempDir::new().unwrap();
        write_docs(&tmp);
        let config = test_config(tmp.path().to_path_buf());
        let store = MemoryStore::new();

        let err = run_ingest(&config, &store, &FailingEmbedder, false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(store.is_empty());
    }
}
