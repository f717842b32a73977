//! Document index backed by a Qdrant collection

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

use super::chunker::Chunk;
use super::documents::{DocumentIndex, ScoredPassage, EMBED_BATCH_SIZE};
use super::index::relevance;
use crate::config::Config;
use crate::integrations::Embedder;
use crate::{Error, Result};

/// Passages stored as points with `text` and `source` payload fields.
pub struct QdrantDocumentIndex {
    client: Qdrant,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl QdrantDocumentIndex {
    /// Connect to Qdrant server
    pub fn new(url: &str, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            embedder,
        })
    }

    pub fn from_config(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::new(&config.qdrant_url, &config.qdrant_collection, embedder)
    }

    /// Create the collection if it doesn't exist
    pub async fn init_collection(&self, dimension: usize) -> Result<()> {
        let collections = self.client.list_collections().await?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if exists {
            debug!("Collection '{}' already exists", self.collection);
            return Ok(());
        }

        info!("Creating collection '{}' (dim {})", self.collection, dimension);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await?;

        Ok(())
    }

    /// Embed and upsert chunks, creating the collection on first use.
    pub async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut total = 0;

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if total == 0 {
                let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
                if dimension == 0 {
                    return Err(Error::EmbeddingError(
                        "embedder returned empty vectors".to_string(),
                    ));
                }
                self.init_collection(dimension).await?;
            }

            let points: Vec<PointStruct> = batch
                .iter()
                .zip(embeddings)
                .filter(|(_, embedding)| !embedding.is_empty())
                .map(|(chunk, embedding)| {
                    let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                    payload.insert("text".into(), chunk.text.clone().into());
                    payload.insert("source".into(), chunk.source.clone().into());
                    PointStruct::new(chunk.id.to_string(), embedding, payload)
                })
                .collect();

            if points.is_empty() {
                continue;
            }

            let count = points.len();
            self.client
                .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
                .await?;
            total += count;
            debug!("Upserted {} points ({} total)", count, total);
        }

        info!("Indexed {} passages into '{}'", total, self.collection);
        Ok(total)
    }
}

#[async_trait]
impl DocumentIndex for QdrantDocumentIndex {
    async fn search_with_score(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        let embedding = self.embedder.embed(query).await?;
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, embedding, k as u64).with_payload(true),
            )
            .await?;

        // Qdrant reports raw cosine similarity.
        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let text = point.payload.get("text")?.as_str()?.to_string();
                let source = point
                    .payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                Some(ScoredPassage {
                    text,
                    source,
                    score: relevance(point.score),
                })
            })
            .collect())
    }
}
