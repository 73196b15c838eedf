//! Vector store abstraction.
//!
//! The [`VectorStore`] trait defines the four operations the orchestrators
//! need — reset, id diff, upsert, nearest-neighbour query — enabling
//! pluggable backends: SQLite for deployment, in-memory for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

use crate::models::RetrievedChunk;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A chunk plus its embedding, ready for upsert.
///
/// Keyed by the deterministic chunk id; `source` and `chunk_index` are the
/// metadata carried alongside the text so every query hit is traceable to
/// its document.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub source: String,
    pub chunk_index: i64,
    pub embedding: Vec<f32>,
}

/// Abstract vector-store backend.
///
/// The store serializes conflicting writes itself; upsert by deterministic
/// id makes repeated ingestion runs converge to the same state.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Drop and recreate the collection. Dropping a collection that does
    /// not exist is not an error.
    async fn reset(&self) -> Result<()>;

    /// Return the subset of `ids` already present in the collection.
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>>;

    /// Insert or replace records, keyed by chunk id.
    async fn upsert(&self, records: &[ChunkRecord]) -> Result<()>;

    /// Return the `top_k` chunks nearest to `query_vec` by cosine
    /// distance, most similar first.
    async fn query(&self, query_vec: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>>;
}
