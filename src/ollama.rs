//! Ollama client for iai_core
//!
//! Thin HTTP client for a locally hosted Ollama service. Non-streaming
//! generation only; the assistant reads whole responses before scanning
//! them for commands.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "llama3.1:latest";
pub const DEFAULT_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for one Ollama endpoint and model
pub struct OllamaClient {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a completion for a prompt, optionally with a system
    /// instruction block. Bounded by a 120 second request timeout.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            system,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "querying Ollama");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(Duration::from_secs(120))
            .send()
            .await
            .context("Ollama request failed")?;

        if !response.status().is_success() {
            bail!("Ollama returned HTTP {}", response.status());
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("failed to parse Ollama response")?;
        Ok(parsed.response)
    }

    /// Quick liveness probe against /api/tags
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .http
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List model names known to the service
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let value: serde_json::Value = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("failed to reach Ollama")?
            .json()
            .await
            .context("failed to parse model list")?;

        let models = value["models"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["name"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", DEFAULT_MODEL);
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Port 9 (discard) is a safe dead endpoint
        let client = OllamaClient::new("http://127.0.0.1:9", DEFAULT_MODEL);
        assert!(!client.is_reachable().await);
    }
}
