//! Document chunking, embedding indexes and passage search.

pub mod chunker;
pub mod documents;
pub mod index;
pub mod qdrant;

use std::sync::Arc;

use tracing::warn;

use crate::config::{Config, DocumentBackend};
use crate::integrations::Embedder;
use crate::Result;

pub use chunker::{Chunk, Chunker, ChunkingStrategy};
pub use documents::{
    load_chunks, DocumentIndex, EmptyDocumentIndex, LocalDocumentIndex, ScoredPassage,
};
pub use index::{cosine_similarity, relevance, Scored, VectorIndex};
pub use qdrant::QdrantDocumentIndex;

/// Open the configured document index.
///
/// A missing local snapshot yields an empty index so the agent still starts;
/// retrieval then answers from the "nothing found" marker.
pub fn open_document_index(
    config: &Config,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn DocumentIndex>> {
    match config.document_backend {
        DocumentBackend::Qdrant => Ok(Arc::new(QdrantDocumentIndex::from_config(
            config, embedder,
        )?)),
        DocumentBackend::Local => {
            if config.document_index_path.exists() {
                Ok(Arc::new(LocalDocumentIndex::load(
                    &config.document_index_path,
                    embedder,
                )?))
            } else {
                warn!(
                    "Document index {} not found, retrieval will find nothing",
                    config.document_index_path.display()
                );
                Ok(Arc::new(EmptyDocumentIndex))
            }
        }
    }
}
