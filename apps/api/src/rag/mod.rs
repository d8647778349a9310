// Retrieval-augmented generation: ingestion, similarity index, prompt assembly,
// and the two capability traits the chat pipeline depends on.

pub mod assembler;
pub mod chunker;
pub mod embedder;
pub mod generator;
pub mod index;
pub mod loader;
pub mod prompts;
pub mod retriever;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::rag::assembler::AssembledPrompt;

/// A passage returned by retrieval, ranked by `score` (higher is more similar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub source: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Similarity index is not available")]
    IndexMissing,

    #[error("Query embedding failed: {0}")]
    Embedding(#[from] LlmError),

    #[error("No passage is similar enough to ground an answer")]
    NoPassages,

    #[error("Query embedding has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),
}

/// Returns up to `k` passages relevant to `query`, best first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize)
        -> Result<Vec<RetrievedPassage>, RetrievalError>;
}

/// Produces the answer text for an assembled prompt. Implementations do not retry.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &AssembledPrompt) -> Result<String, GenerationError>;
}
