//! In-memory similarity index shared by the document and template indexes.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::integrations::Embedder;
use crate::{Error, Result};

/// Search hit with its relevance score in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<M> {
    pub text: String,
    pub score: f32,
    pub item: M,
}

/// Stored entry with metadata.
#[derive(Debug, Clone)]
struct IndexedEntry<M> {
    text: String,
    embedding: Vec<f32>,
    item: M,
}

/// Brute-force cosine index over `(text, metadata)` pairs.
pub struct VectorIndex<M> {
    embedder: Arc<dyn Embedder>,
    entries: Vec<IndexedEntry<M>>,
}

impl<M: Clone> VectorIndex<M> {
    /// Embed every text and index it with its metadata.
    pub async fn build(embedder: Arc<dyn Embedder>, items: Vec<(String, M)>) -> Result<Self> {
        let texts: Vec<String> = items.iter().map(|(text, _)| text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&texts).await?
        };

        if embeddings.len() != items.len() {
            return Err(Error::EmbeddingError(format!(
                "expected {} embeddings, got {}",
                items.len(),
                embeddings.len()
            )));
        }

        let entries = items
            .into_iter()
            .zip(embeddings)
            .map(|((text, item), embedding)| IndexedEntry {
                text,
                embedding,
                item,
            })
            .collect();

        Ok(Self { embedder, entries })
    }

    /// Index pre-computed vectors (e.g. loaded from a snapshot).
    pub fn from_embedded(embedder: Arc<dyn Embedder>, entries: Vec<(String, Vec<f32>, M)>) -> Self {
        Self {
            embedder,
            entries: entries
                .into_iter()
                .map(|(text, embedding, item)| IndexedEntry {
                    text,
                    embedding,
                    item,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the indexed vectors; `None` until a non-empty one is stored.
    pub fn dimension(&self) -> Option<usize> {
        self.entries
            .iter()
            .map(|entry| entry.embedding.len())
            .find(|&len| len > 0)
    }

    /// Top `k` entries by relevance to `query`, best first.
    ///
    /// A query vector whose length differs from the indexed vectors is an
    /// error rather than a page of zero scores.
    pub async fn search_with_score(&self, query: &str, k: usize) -> Result<Vec<Scored<M>>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(query).await?;
        if query_embedding.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(dimension) = self.dimension() {
            if query_embedding.len() != dimension {
                return Err(Error::VectorStoreError(format!(
                    "query embedding has {} dimensions, index has {}",
                    query_embedding.len(),
                    dimension
                )));
            }
        }
        Ok(self.rank(&query_embedding, k))
    }

    /// Rank against an already embedded query.
    pub fn rank(&self, query_embedding: &[f32], k: usize) -> Vec<Scored<M>> {
        let mut scored: Vec<Scored<M>> = self
            .entries
            .iter()
            .map(|entry| Scored {
                text: entry.text.clone(),
                score: relevance(cosine_similarity(query_embedding, &entry.embedding)),
                item: entry.item.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// Map cosine similarity to a [0, 1] relevance score.
///
/// Euclidean relevance of unit vectors: `1 - d / sqrt(2)` with `d = sqrt(2 - 2cos)`.
pub fn relevance(cosine: f32) -> f32 {
    (1.0 - (1.0 - cosine).max(0.0).sqrt()).clamp(0.0, 1.0)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
