//! Embedding generation: OpenAI service and an offline hashing fallback

use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client as OpenAIClient,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::Embedder;
use crate::config::{Config, EmbeddingBackend, DEFAULT_EMBEDDING_MODEL};
use crate::{Error, Result};

/// Service for generating text embeddings
pub struct EmbeddingService {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
}

impl EmbeddingService {
    /// Create a new embedding service
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::ConfigError("OPENAI_API_KEY not set".to_string()));
        }

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url.trim_end_matches('/'));
        let client = OpenAIClient::with_config(config);

        Ok(Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        })
    }

    /// Create with custom model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

}

#[async_trait]
impl Embedder for EmbeddingService {
    /// Generate embeddings for multiple texts in batch
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        // Filter out empty texts and truncate long ones
        let processed: Vec<String> = texts
            .iter()
            .map(|t| t.trim().chars().take(8000).collect::<String>())
            .filter(|t| !t.is_empty())
            .collect();

        if processed.is_empty() {
            return Ok(vec![Vec::new(); texts.len()]);
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(processed))
            .build()
            .map_err(|e| Error::EmbeddingError(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| Error::EmbeddingError(e.to_string()))?;

        debug!(
            "Generated {} embeddings, tokens used: {}",
            response.data.len(),
            response.usage.total_tokens
        );

        // Map back to original indices (empty texts get empty vectors)
        let mut result = Vec::with_capacity(texts.len());
        let mut embed_iter = response.data.into_iter();

        for text in texts {
            if text.trim().is_empty() {
                result.push(Vec::new());
            } else if let Some(embed) = embed_iter.next() {
                result.push(embed.embedding);
            }
        }

        if result.len() != texts.len() {
            return Err(Error::EmbeddingError(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.len()
            )));
        }

        Ok(result)
    }

    /// Known for the OpenAI embedding models; `None` for anything else.
    fn dimension(&self) -> Option<usize> {
        match self.model.as_str() {
            "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
            "text-embedding-3-large" => Some(3072),
            _ => None,
        }
    }
}

/// Deterministic, fast embedding for offline/local use.
///
/// Hashes character unigrams and bigrams so it works on unsegmented Chinese text.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dim: usize,
}

impl LocalEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vec = vec![0.0f32; self.dim];
        let chars: Vec<char> = text
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect();

        let mut bump = |feature: &[char], weight: f32| {
            let mut hasher = DefaultHasher::new();
            feature.hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.dim;
            vec[idx] += weight;
        };

        for unigram in chars.windows(1) {
            bump(unigram, 1.0);
        }
        for bigram in chars.windows(2) {
            bump(bigram, 2.0);
        }

        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dim)
    }
}

/// Build the configured embedder, falling back to local embeddings without a key.
pub fn build_embedder(config: &Config) -> Arc<dyn Embedder> {
    match config.embedding_backend {
        EmbeddingBackend::Local => {
            info!("Using local embeddings (dim {})", config.embedding_dim);
            Arc::new(LocalEmbedder::new(config.embedding_dim))
        }
        EmbeddingBackend::OpenAI => {
            match EmbeddingService::new(&config.openai_api_key, &config.openai_base_url) {
                Ok(service) => {
                    info!("Using OpenAI embeddings ({})", config.embedding_model);
                    Arc::new(service.with_model(config.embedding_model.clone()))
                }
                Err(err) => {
                    warn!("Falling back to local embeddings ({err})");
                    Arc::new(LocalEmbedder::new(config.embedding_dim))
                }
            }
        }
    }
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}
