//! In-memory [`VectorStore`] implementation for testing.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety. Query is
//! brute-force cosine distance over all stored vectors.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::RetrievedChunk;

use super::{ChunkRecord, VectorStore};

/// In-memory store for tests and local experiments.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ChunkRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored ids, for test assertions.
    pub fn ids(&self) -> HashSet<String> {
        self.records.read().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn reset(&self) -> Result<()> {
        self.records.write().unwrap().clear();
        Ok(())
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let records = self.records.read().unwrap();
        Ok(ids
            .iter()
            .filter(|id| records.contains_key(*id))
            .cloned()
            .collect())
    }

    async fn upsert(&self, new: &[ChunkRecord]) -> Result<()> {
        let mut records = self.records.write().unwrap();
        for record in new {
            records.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(&self, query_vec: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let records = self.records.read().unwrap();

        let mut hits: Vec<RetrievedChunk> = records
            .values()
            .map(|r| RetrievedChunk {
                text: r.text.clone(),
                source: r.source.clone(),
                distance: cosine_distance(query_vec, &r.embedding) as f64,
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }
}
