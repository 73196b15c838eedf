//! SQLite-backed [`VectorStore`].
//!
//! Embeddings live in a single `chunks` table as little-endian f32 BLOBs,
//! keyed by deterministic chunk id. Query is a full scan with cosine
//! distance computed in Rust — the knowledge base is small (hundreds of
//! chunks), so no ANN index is needed.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::migrate;
use crate::models::RetrievedChunk;

use super::{ChunkRecord, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the configured database and ensure the schema exists.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn reset(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS chunks")
            .execute(&self.pool)
            .await?;
        migrate::ensure_schema(&self.pool).await?;
        Ok(())
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT id FROM chunks")
            .fetch_all(&self.pool)
            .await?;

        let stored: HashSet<String> = rows.iter().map(|row| row.get("id")).collect();

        Ok(ids
            .iter()
            .filter(|id| stored.contains(*id))
            .cloned()
            .collect())
    }

    async fn upsert(&self, records: &[ChunkRecord]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, source, chunk_index, text, embedding, upserted_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    source = excluded.source,
                    chunk_index = excluded.chunk_index,
                    text = excluded.text,
                    embedding = excluded.embedding,
                    upserted_at = excluded.upserted_at
                "#,
            )
            .bind(&record.id)
            .bind(&record.source)
            .bind(record.chunk_index)
            .bind(&record.text)
            .bind(vec_to_blob(&record.embedding))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, query_vec: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let rows = sqlx::query("SELECT source, text, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await?;

        let mut hits: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                RetrievedChunk {
                    text: row.get("text"),
                    source: row.get("source"),
                    distance: cosine_distance(query_vec, &vec) as f64,
                }
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
