//! Generation collaborator abstraction and the Cohere chat implementation.
//!
//! The investigation pipeline calls the model exactly once per complaint
//! through the [`Generator`] seam; tests substitute canned fakes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CohereConfig;

/// Trait for the generation collaborator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce raw text for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generator backed by the Cohere chat API.
///
/// Requires the `COHERE_API_KEY` environment variable; its absence is a
/// hard configuration error at construction time.
pub struct CohereGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl CohereGenerator {
    pub fn new(config: &CohereConfig) -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| anyhow::anyhow!("COHERE_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Generator for CohereGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "message": prompt,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("Cohere chat request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Cohere chat error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse Cohere chat response")?;

        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid chat response: missing text field"))?;

        Ok(text.to_string())
    }
}
