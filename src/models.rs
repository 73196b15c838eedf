//! Core data models used throughout the Transfer Investigation Harness.
//!
//! These types represent the documents, chunks, and investigation results
//! that flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// A source document loaded from the knowledge base.
///
/// `name` is the file path relative to the docs root and doubles as the
/// document's unique key. `text` is non-empty after trimming; the loader
/// skips files that trim to nothing.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub text: String,
}

/// A bounded, overlap-carrying substring of a source document — the unit
/// of embedding and retrieval.
///
/// `id` is `"<document_name>::<chunk_index>"` and is deterministic:
/// re-chunking the same document with the same parameters reproduces
/// identical ids, which is what makes re-ingestion idempotent.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub chunk_index: i64,
}

/// A chunk annotated with its query distance, produced per investigation.
///
/// `distance` is cosine distance (1 − cosine similarity); lower is more
/// similar.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub source: String,
    pub distance: f64,
}

/// A single source document cited in the investigation output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub document_name: String,
    pub excerpt: String,
}

/// Structured output of the investigation pipeline.
///
/// The draft is advisory: every caller is contractually obliged to route
/// it through human review before anything reaches a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationResult {
    /// Reconstructed transfer timeline.
    pub timeline: String,
    /// The likely step in the transfer process where the failure occurred.
    pub failure_point: String,
    /// Draft client-facing response, pending human sign-off.
    pub draft_response: String,
    /// Retrieved passages that informed the answer, populated regardless of
    /// whether the model named them.
    pub citations: Vec<Citation>,
}

/// Summary returned by an ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    /// Number of chunks embedded and upserted in this run (not file count).
    pub chunks_ingested: usize,
    pub message: String,
}
