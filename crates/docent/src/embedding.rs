//! Embedding provider implementations.
//!
//! Every provider implements the core [`Embedder`] trait:
//!
//! - **[`DisabledEmbedder`]** — fails every call; used when embeddings
//!   are not configured. With the default deferred-indexing policy a
//!   document still ingests, it just stays unindexed until a provider
//!   is configured and `reindex` runs.
//! - **[`OpenAiEmbedder`]** — `POST /v1/embeddings`, batched, with
//!   retry and backoff. Requires `OPENAI_API_KEY`.
//! - **[`OllamaEmbedder`]** — `POST /api/embed` on a local Ollama
//!   instance.
//! - **`LocalEmbedder`** — fastembed models running in-process; no
//!   network after the first model download.
//!
//! Use [`create_embedder`] to build the provider the config names.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::Value;

use docent_core::embed::Embedder;
use docent_core::{Result, TutorError};

use crate::config::EmbeddingConfig;
use crate::http::post_json_with_retry;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Build the embedder the configuration names.
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embedding provider requires --features local-embeddings-fastembed"
        ),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// No-op embedder for deployments without an embedding backend.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(TutorError::Upstream(
            "embedding provider is disabled".to_string(),
        ))
    }
}

/// OpenAI embeddings API client.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            dims,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_json_with_retry(
                &self.client,
                OPENAI_EMBEDDINGS_URL,
                Some(&self.api_key),
                &body,
                self.max_retries,
                "OpenAI embeddings",
            )
            .await?;
            all.extend(parse_openai_embeddings(&json)?);
        }
        if all.len() != texts.len() {
            return Err(TutorError::Upstream(
                "embedding response count does not match input".to_string(),
            ));
        }
        Ok(all)
    }
}

/// Extract the `data[].embedding` arrays, in input order.
fn parse_openai_embeddings(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json.get("data").and_then(|d| d.as_array()).ok_or_else(|| {
        TutorError::Upstream("embedding response missing data array".to_string())
    })?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                TutorError::Upstream("embedding response missing embedding".to_string())
            })?;
        embeddings.push(
            embedding
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        );
    }
    Ok(embeddings)
}

/// Local Ollama embeddings client.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    base_url: String,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
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
            dims,
            base_url,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_json_with_retry(
            &self.client,
            &format!("{}/api/embed", self.base_url),
            None,
            &body,
            self.max_retries,
            "Ollama embeddings",
        )
        .await?;
        let embeddings = parse_ollama_embeddings(&json)?;
        if embeddings.len() != texts.len() {
            return Err(TutorError::Upstream(
                "embedding response count does not match input".to_string(),
            ));
        }
        Ok(embeddings)
    }
}

/// Extract the `embeddings` array of arrays.
fn parse_ollama_embeddings(json: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            TutorError::Upstream("embedding response missing embeddings array".to_string())
        })?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| {
                TutorError::Upstream("embedding response element is not an array".to_string())
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }
    Ok(result)
}

/// In-process fastembed embedder. Models download from Hugging Face on
/// first use and are cached; after that, no network calls.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalEmbedder {
    model: String,
    dims: usize,
    batch_size: usize,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        // Validate the model name up front so a typo fails at startup.
        config_to_fastembed_model(&model)?;
        let dims = config.dims.unwrap_or(match model.as_str() {
            "all-minilm-l6-v2" | "bge-small-en-v1.5" | "multilingual-e5-small" => 384,
            "bge-base-en-v1.5" | "nomic-embed-text-v1" | "nomic-embed-text-v1.5"
            | "multilingual-e5-base" => 768,
            "bge-large-en-v1.5" | "multilingual-e5-large" => 1024,
            _ => 384,
        });

        Ok(Self {
            model,
            dims,
            batch_size: config.batch_size,
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> anyhow::Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let fastembed_model = config_to_fastembed_model(&self.model)
            .map_err(|e| TutorError::Upstream(e.to_string()))?;
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        let result = tokio::task::spawn_blocking(move || {
            let mut model = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
            )
            .map_err(|e| {
                tracing::warn!("failed to initialize local embedding model: {}", e);
                TutorError::Upstream("local embedding model initialization failed".to_string())
            })?;

            model.embed(texts, Some(batch_size)).map_err(|e| {
                tracing::warn!("local embedding failed: {}", e);
                TutorError::Upstream("local embedding failed".to_string())
            })
        })
        .await;

        match result {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::warn!("local embedding task panicked: {}", e);
                Err(TutorError::Upstream("local embedding failed".to_string()))
            }
        }
    }
}
