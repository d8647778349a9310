//! Similarity index over ingested document chunks.
//!
//! Built once (load → chunk → embed) and persisted as JSON under the index
//! directory. While serving, the index is read-only and shared behind an `Arc`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::llm_client::LlmError;
use crate::rag::chunker::TextChunker;
use crate::rag::embedder::Embedder;
use crate::rag::loader::{load_documents, LoadError, SourceDocument};
use crate::rag::RetrievedPassage;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Document loading failed: {0}")]
    Load(#[from] LoadError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] LlmError),

    #[error("Index I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index file is malformed: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Chunk {source_name} has dimension {actual}, expected {expected}")]
    InconsistentDimension {
        source_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Documents produced no chunks to index")]
    Empty,

    #[error("Blocking index task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: Uuid,
    pub source: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    embedding_model: String,
    dimension: usize,
    created_at: DateTime<Utc>,
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// An index with no chunks. Retrieval against it reports the index as missing.
    pub fn empty(embedding_model: &str) -> Self {
        Self {
            embedding_model: embedding_model.to_string(),
            dimension: 0,
            created_at: Utc::now(),
            chunks: Vec::new(),
        }
    }

    /// Builds an index from pre-embedded chunks. All vectors must share one dimension.
    pub fn from_chunks(embedding_model: &str, chunks: Vec<IndexedChunk>) -> Result<Self, IndexError> {
        let dimension = chunks.first().map(|c| c.embedding.len()).ok_or(IndexError::Empty)?;

        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimension) {
            return Err(IndexError::InconsistentDimension {
                source_name: bad.source.clone(),
                expected: dimension,
                actual: bad.embedding.len(),
            });
        }

        Ok(Self {
            embedding_model: embedding_model.to_string(),
            dimension,
            created_at: Utc::now(),
            chunks,
        })
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the `k` chunks most similar to `query`, best first.
    /// Chunks whose similarity is undefined (zero vectors) are never returned.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievedPassage> {
        let mut scored: Vec<(&IndexedChunk, f32)> = self
            .chunks
            .iter()
            .filter_map(|chunk| cosine_similarity(query, &chunk.embedding).map(|s| (chunk, s)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(chunk, score)| RetrievedPassage {
                source: chunk.source.clone(),
                text: chunk.text.clone(),
                score,
            })
            .collect()
    }

    /// Reads `{dir}/index.json`. Returns `Ok(None)` when no index has been persisted yet.
    pub fn load(dir: &Path) -> Result<Option<Self>, IndexError> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Writes `{dir}/index.json`, creating the directory if needed.
    /// The file is written to a temporary name first and renamed into place.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        std::fs::create_dir_all(dir)?;
        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));
        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, dir.join(INDEX_FILE))?;
        Ok(())
    }
}

/// Chunks and embeds `documents` into a new index.
pub async fn build_index(
    documents: &[SourceDocument],
    chunker: &TextChunker,
    embedder: &dyn Embedder,
) -> Result<VectorIndex, IndexError> {
    let mut sources = Vec::new();
    let mut texts = Vec::new();
    for document in documents {
        for chunk in chunker.split(&document.text) {
            sources.push(document.source.clone());
            texts.push(chunk);
        }
    }

    if texts.is_empty() {
        return Err(IndexError::Empty);
    }

    info!(
        "Embedding {} chunks from {} documents with {}",
        texts.len(),
        documents.len(),
        embedder.model()
    );
    let embeddings = embedder.embed_batch(&texts).await?;
    if embeddings.len() != texts.len() {
        return Err(IndexError::Embedding(LlmError::EmbeddingCount {
            expected: texts.len(),
            actual: embeddings.len(),
        }));
    }

    let chunks = sources
        .into_iter()
        .zip(texts)
        .zip(embeddings)
        .map(|((source, text), embedding)| IndexedChunk {
            id: Uuid::new_v4(),
            source,
            text,
            embedding,
        })
        .collect();

    VectorIndex::from_chunks(embedder.model(), chunks)
}

/// Loads the persisted index, or builds and persists a new one from `documents_dir`.
/// A persisted index built with a different embedding model is rebuilt.
/// File reads, PDF extraction and the index write run on the blocking pool.
pub async fn load_or_build(
    index_dir: &Path,
    documents_dir: &Path,
    chunker: &TextChunker,
    embedder: &dyn Embedder,
) -> Result<VectorIndex, IndexError> {
    let dir = index_dir.to_path_buf();
    let persisted = tokio::task::spawn_blocking(move || VectorIndex::load(&dir)).await??;

    match persisted {
        Some(index) if index.embedding_model() == embedder.model() && !index.is_empty() => {
            info!(
                "Loaded similarity index: {} chunks, dimension {}",
                index.len(),
                index.dimension()
            );
            return Ok(index);
        }
        Some(index) => info!(
            "Persisted index uses model '{}' ({} chunks); rebuilding with '{}'",
            index.embedding_model(),
            index.len(),
            embedder.model()
        ),
        None => info!("No similarity index at {}; building", index_dir.display()),
    }

    let docs_dir = documents_dir.to_path_buf();
    let documents = tokio::task::spawn_blocking(move || load_documents(&docs_dir)).await??;
    let index = build_index(&documents, chunker, embedder).await?;

    let dir = index_dir.to_path_buf();
    let index = tokio::task::spawn_blocking(move || index.save(&dir).map(|()| index)).await??;

    info!(
        "Built similarity index: {} chunks, dimension {}",
        index.len(),
        index.dimension()
    );
    Ok(index)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some((dot / denom) as f32)
}
