//! Passage store searched by the retrieval strategy.
//!
//! The local backend keeps every passage in memory and persists a JSON
//! snapshot; [`super::qdrant::QdrantDocumentIndex`] keeps them in Qdrant.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::chunker::{Chunk, Chunker};
use super::index::VectorIndex;
use crate::integrations::Embedder;
use crate::{Error, Result};

/// Embedding requests are sent in batches of this size while indexing.
pub const EMBED_BATCH_SIZE: usize = 64;

/// Passage returned by a document search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Similarity-searchable passage store.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Up to `k` passages, best first, each scored in [0, 1].
    async fn search_with_score(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>>;
}

/// Passage persisted in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPassage {
    id: String,
    text: String,
    source: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    dimension: usize,
    passages: Vec<StoredPassage>,
}

/// In-memory document index with a JSON snapshot on disk.
pub struct LocalDocumentIndex {
    index: VectorIndex<String>,
    stored: Vec<StoredPassage>,
}

impl LocalDocumentIndex {
    /// Embed chunks and index them.
    pub async fn from_chunks(embedder: Arc<dyn Embedder>, chunks: Vec<Chunk>) -> Result<Self> {
        let mut stored = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::EmbeddingError(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                stored.push(StoredPassage {
                    id: chunk.id.to_string(),
                    text: chunk.text.clone(),
                    source: chunk.source.clone(),
                    embedding,
                });
            }
            debug!("Embedded {} of {} passages", stored.len(), chunks.len());
        }

        Ok(Self::from_stored(embedder, stored))
    }

    fn from_stored(embedder: Arc<dyn Embedder>, stored: Vec<StoredPassage>) -> Self {
        let entries = stored
            .iter()
            .map(|p| (p.text.clone(), p.embedding.clone(), p.source.clone()))
            .collect();

        Self {
            index: VectorIndex::from_embedded(embedder, entries),
            stored,
        }
    }

    /// Load a snapshot written by [`LocalDocumentIndex::save`].
    pub fn load(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::VectorStoreError(format!("Failed to read index {}: {}", path.display(), e))
        })?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;

        if let Some(expected) = embedder.dimension() {
            if snapshot.dimension != 0 && snapshot.dimension != expected {
                return Err(Error::VectorStoreError(format!(
                    "Index {} was built with {}-dimensional embeddings, embedder produces {}",
                    path.display(),
                    snapshot.dimension,
                    expected
                )));
            }
        }

        info!(
            "Loaded {} passages (dim {}) from {}",
            snapshot.passages.len(),
            snapshot.dimension,
            path.display()
        );
        Ok(Self::from_stored(embedder, snapshot.passages))
    }

    /// Write the index as a JSON snapshot, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let snapshot = Snapshot {
            dimension: self.stored.first().map(|p| p.embedding.len()).unwrap_or(0),
            passages: self.stored.clone(),
        };
        fs::write(path, serde_json::to_string(&snapshot)?)?;

        info!("Saved {} passages to {}", self.stored.len(), path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl DocumentIndex for LocalDocumentIndex {
    async fn search_with_score(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        let hits = self.index.search_with_score(query, k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| ScoredPassage {
                text: hit.text,
                source: hit.item,
                score: hit.score,
            })
            .collect())
    }
}

/// Index with no passages; every search comes back empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyDocumentIndex;

#[async_trait]
impl DocumentIndex for EmptyDocumentIndex {
    async fn search_with_score(&self, _query: &str, _k: usize) -> Result<Vec<ScoredPassage>> {
        Ok(Vec::new())
    }
}

/// Read every `.txt` / `.md` file under `dir` and chunk it.
pub fn load_chunks(dir: impl AsRef<Path>, chunker: &Chunker) -> Result<Vec<Chunk>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut chunks = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext, "txt" | "md"))
            .unwrap_or(false);
        if !is_text {
            continue;
        }

        match fs::read_to_string(path) {
            Ok(content) => {
                let source = path
                    .strip_prefix(dir)
                    .unwrap_or(path)
                    .display()
                    .to_string();
                let file_chunks = chunker.chunk(&content, source);
                debug!("{}: {} chunks", path.display(), file_chunks.len());
                chunks.extend(file_chunks);
            }
            Err(err) => warn!("Skipping {}: {}", path.display(), err),
        }
    }

    info!("Chunked {} passages from {}", chunks.len(), dir.display());
    Ok(chunks)
}
