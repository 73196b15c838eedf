//! # Transfer Investigation Harness
//!
//! A retrieval-augmented pipeline that investigates stuck or failed
//! payment transfers against a knowledge base of internal process
//! documentation.
//!
//! The system has two flows. **Ingestion** loads plain-text process
//! documents, chunks them at natural boundaries, embeds each chunk via
//! Cohere, and upserts the vectors into SQLite under deterministic ids so
//! re-runs are idempotent. **Investigation** embeds a client complaint,
//! retrieves the nearest chunks, and asks a chat model to reconstruct the
//! transfer timeline, name the likely failure point, and draft a
//! client-facing response — always grounded by citations taken from
//! retrieval itself.
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │  Docs    │──▶│ Chunk+Embed  │──▶│  SQLite   │
//! │ (*.txt)  │   │  (Cohere)    │   │ (vectors) │
//! └──────────┘   └──────────────┘   └────┬─────┘
//!                                        │
//!                    ┌───────────────────┤
//!                    ▼                   ▼
//!               ┌──────────┐       ┌──────────┐
//!               │   CLI    │       │   HTTP   │
//!               │  (tia)   │       │  (JSON)  │
//!               └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tia init                          # create database
//! tia ingest                        # chunk + embed the knowledge base
//! tia investigate "My $4,200 transfer never arrived"
//! tia serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`docs`] | Knowledge-base document loading |
//! | [`chunk`] | Boundary-aware text chunking |
//! | [`embedding`] | Embedder seam + Cohere embed client |
//! | [`generation`] | Generator seam + Cohere chat client |
//! | [`retry`] | Retry policy for transient upstream failures |
//! | [`store`] | Vector store seam (SQLite + in-memory) |
//! | [`ingest`] | Ingestion orchestration |
//! | [`investigate`] | Investigation orchestration |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod docs;
pub mod embedding;
pub mod generation;
pub mod ingest;
pub mod investigate;
pub mod migrate;
pub mod models;
pub mod retry;
pub mod server;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support {
    /// Serializes tests that mutate the process-wide `COHERE_API_KEY`.
    pub static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
}
