//! Build the document index from a directory of text files

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;

use crate::config::{Config, DocumentBackend};
use crate::integrations::embeddings::build_embedder;
use crate::integrations::{Embedder, Instrumented};
use crate::retrieval::{load_chunks, Chunker, LocalDocumentIndex, QdrantDocumentIndex};

/// Summary of an indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexResult {
    pub passages: usize,
    pub indexed: usize,
    pub destination: String,
}

/// Chunk, embed and store every `.txt` / `.md` file under `input`.
pub async fn run(config: &Config, input: &Path) -> Result<IndexResult> {
    run_with_embedder(config, input, build_embedder(config)).await
}

/// Index with the given embedder; every embedding call gets the configured timeout.
pub async fn run_with_embedder(
    config: &Config,
    input: &Path,
    embedder: Arc<dyn Embedder>,
) -> Result<IndexResult> {
    let chunker = Chunker::new(config.chunk_size, config.chunk_overlap);
    let chunks = load_chunks(input, &chunker)?;
    if chunks.is_empty() {
        bail!("No .txt or .md content found under {}", input.display());
    }

    let embedder: Arc<dyn Embedder> = Arc::new(Instrumented::new(
        embedder,
        config.request_timeout(),
        config.verbose,
    ));
    let passages = chunks.len();

    let result = match config.document_backend {
        DocumentBackend::Local => {
            let index = LocalDocumentIndex::from_chunks(embedder, chunks).await?;
            index.save(&config.document_index_path)?;
            IndexResult {
                passages,
                indexed: index.len(),
                destination: config.document_index_path.display().to_string(),
            }
        }
        DocumentBackend::Qdrant => {
            let index = QdrantDocumentIndex::from_config(config, embedder)?;
            let indexed = index.upsert_chunks(&chunks).await?;
            IndexResult {
                passages,
                indexed,
                destination: format!("{}/{}", config.qdrant_url, config.qdrant_collection),
            }
        }
    };

    info!(
        "Indexed {} of {} passages into {}",
        result.indexed, result.passages, result.destination
    );
    println!(
        "Indexed {} passages into {}",
        result.indexed, result.destination
    );
    Ok(result)
}
