//! Embedding collaborator abstraction and the Cohere implementation.
//!
//! Defines the [`Embedder`] trait used by both orchestrators and a
//! [`CohereEmbedder`] that calls the Cohere `/v1/embed` endpoint with
//! retry and backoff via [`RetryPolicy`].
//!
//! Also provides vector utilities shared with the store backends:
//! [`vec_to_blob`] / [`blob_to_vec`] for SQLite BLOB storage and
//! [`cosine_similarity`] / [`cosine_distance`] for ranking.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CohereConfig;
use crate::retry::{CallError, RetryPolicy};

/// Embedding input mode. Query and document embeddings may be optimized
/// differently by the model, so the two sides of the pipeline declare
/// which one they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    SearchDocument,
    SearchQuery,
}

impl InputType {
    fn as_str(self) -> &'static str {
        match self {
            InputType::SearchDocument => "search_document",
            InputType::SearchQuery => "search_query",
        }
    }
}

/// Trait for the embedding collaborator.
///
/// The orchestrators only depend on this seam, so tests substitute fakes
/// and the HTTP client stays at the edge.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document chunks, one vector per input, in order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embedder backed by the Cohere embed API.
///
/// Requires the `COHERE_API_KEY` environment variable; its absence is a
/// hard configuration error at construction time.
pub struct CohereEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    retry: RetryPolicy,
}

impl CohereEmbedder {
    pub fn new(config: &CohereConfig) -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| anyhow::anyhow!("COHERE_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embed_model.clone(),
            api_key,
            retry: RetryPolicy::new(config.max_attempts, Duration::from_secs(1)),
        })
    }

    /// Replace the retry policy. Tests use this to shrink the backoff.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embed", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "texts": texts,
            "input_type": input_type.as_str(),
        });

        self.retry
            .run(|| async {
                let resp = self
                    .client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&body)
                    .send()
                    .await;

                match resp {
                    Ok(response) => {
                        let status = response.status();

                        if status.is_success() {
                            let json: serde_json::Value = response
                                .json()
                                .await
                                .map_err(|e| CallError::Transient(e.into()))?;
                            return parse_embed_response(&json).map_err(CallError::Fatal);
                        }

                        let body_text = response.text().await.unwrap_or_default();
                        let err =
                            anyhow::anyhow!("Cohere embed error {}: {}", status, body_text);

                        if status.as_u16() == 429 || status.is_server_error() {
                            Err(CallError::Transient(err))
                        } else {
                            Err(CallError::Fatal(err))
                        }
                    }
                    Err(e) => Err(CallError::Transient(e.into())),
                }
            })
            .await
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts, InputType::SearchDocument).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self
            .embed(&[text.to_string()], InputType::SearchQuery)
            .await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

/// Parse the Cohere embed response JSON, extracting `embeddings[][]` in
/// input order.
fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embed response: missing embeddings array"))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let values = item
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid embed response: embedding is not an array"))?;

        let mut vec = Vec::with_capacity(values.len());
        for v in values {
            let n = v.as_f64().ok_or_else(|| {
                anyhow::anyhow!("Invalid embed response: non-numeric embedding value")
            })?;
            vec.push(n as f32);
        }

        if vec.is_empty() {
            bail!("Invalid embed response: empty embedding vector");
        }

        embeddings.push(vec);
    }

    Ok(embeddings)
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing a
/// BLOB of `vec.len() × 4` bytes for SQLite storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values
/// from the byte slice.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance: `1 − cosine_similarity`. Lower is more similar, which
/// is the ordering the retrieval contract exposes.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
