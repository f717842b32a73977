//! External integrations module.
//!
//! Provides the service contracts the agent depends on and their clients:
//! - OpenAI chat completions (text generation)
//! - OpenAI / local embeddings
//! - Neo4j (structured graph store)
//! - Web page fetching (search engine results)

pub mod embeddings;
pub mod neo4j;
pub mod openai;
pub mod web;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{metrics, Error, Result};

pub use embeddings::{EmbeddingService, LocalEmbedder};
pub use neo4j::{GraphRow, Neo4jStore};
pub use openai::OpenAIClient;
pub use web::WebFetcher;

/// Single-turn text completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Text to fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingError("No embedding returned".to_string()))
    }

    /// Vector length, when known without calling the service.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// Executes a graph query statement and returns its rows.
#[async_trait]
pub trait StructuredGraphStore: Send + Sync {
    async fn run(&self, statement: &str) -> Result<Vec<GraphRow>>;
}

/// Fetches a page and returns its readable text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Await an outbound call with a deadline, recording its latency.
pub async fn with_timeout<T, F>(service: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let outcome = tokio::time::timeout(limit, fut).await;
    metrics::record_external_call(service, start.elapsed());

    match outcome {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: service.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}

/// Wraps a service so every call gets a deadline and is timed.
///
/// Generation prompts are logged at info level in verbose mode, debug otherwise.
pub struct Instrumented<T: ?Sized> {
    inner: Arc<T>,
    limit: Duration,
    verbose: bool,
}

impl<T: ?Sized> Instrumented<T> {
    pub fn new(inner: Arc<T>, limit: Duration, verbose: bool) -> Self {
        Self {
            inner,
            limit,
            verbose,
        }
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Instrumented<T> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.verbose {
            info!("Prompt:\n{}", prompt);
        } else {
            debug!(chars = prompt.chars().count(), "Sending prompt");
        }

        let reply = with_timeout("generation", self.limit, self.inner.generate(prompt)).await?;
        if self.verbose {
            info!("Reply:\n{}", reply);
        }
        Ok(reply)
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Instrumented<T> {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        with_timeout("embedding", self.limit, self.inner.embed_batch(texts)).await
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.dimension()
    }
}

#[async_trait]
impl<T: StructuredGraphStore + ?Sized> StructuredGraphStore for Instrumented<T> {
    async fn run(&self, statement: &str) -> Result<Vec<GraphRow>> {
        debug!(%statement, "Running graph query");
        with_timeout("graph", self.limit, self.inner.run(statement)).await
    }
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Instrumented<T> {
    async fn fetch(&self, url: &str) -> Result<String> {
        with_timeout("page_fetch", self.limit, self.inner.fetch(url)).await
    }
}
