//! Generation provider implementations.
//!
//! Providers implement the core [`Generator`] trait and share the
//! retry plumbing in [`crate::http`]:
//!
//! - **[`DisabledGenerator`]** — fails every call. Question answering
//!   still works: the composer turns the failure into its fixed
//!   fallback payload.
//! - **[`OllamaGenerator`]** — `POST /api/generate` on a local Ollama
//!   instance, non-streaming.
//! - **[`OpenAiGenerator`]** — `POST /v1/chat/completions`. Requires
//!   `OPENAI_API_KEY`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::Value;

use docent_core::traits::Generator;
use docent_core::{Result, TutorError};

use crate::config::GenerationConfig;
use crate::http::post_json_with_retry;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Title used when module title generation fails or comes back empty.
pub const UNTITLED_MODULE: &str = "Untitled Module";

/// Build the generator the configuration names.
pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

/// No-op generator for deployments without a generation backend.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(TutorError::Upstream(
            "generation provider is disabled".to_string(),
        ))
    }
}

/// Local Ollama generation client, non-streaming.
pub struct OllamaGenerator {
    client: reqwest::Client,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model,
            base_url,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let json = post_json_with_retry(
            &self.client,
            &format!("{}/api/generate", self.base_url),
            None,
            &body,
            self.max_retries,
            "Ollama generation",
        )
        .await?;
        json.get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                TutorError::Upstream("generation response missing response field".to_string())
            })
    }
}

/// OpenAI chat completions client.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = post_json_with_retry(
            &self.client,
            OPENAI_CHAT_URL,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI generation",
        )
        .await?;
        json.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                TutorError::Upstream("generation response missing message content".to_string())
            })
    }
}

/// Generate a short display title for one module's text.
///
/// Any failure, and any answer that trims down to nothing, falls back
/// to [`UNTITLED_MODULE`]; a title is decoration, never worth failing a
/// module fetch over.
pub async fn module_title(generator: &dyn Generator, text: &str) -> String {
    let prompt = format!(
        "Give a concise 3-6 word title for this study module. \
         Respond with the title only, no quotes and no punctuation around it.\n\n{}",
        text
    );
    match generator.generate(&prompt).await {
        Ok(raw) => {
            let title = clean_title(&raw);
            if title.is_empty() {
                UNTITLED_MODULE.to_string()
            } else {
                title
            }
        }
        Err(err) => {
            tracing::warn!("module title generation failed: {}", err);
            UNTITLED_MODULE.to_string()
        }
    }
}

/// First line of the raw output with surrounding quotes stripped.
fn clean_title(raw: &str) -> String {
    raw.lines()
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}
