use async_trait::async_trait;

use crate::llm_client::{LlmError, OllamaClient};

/// Inputs sent per embedding request during ingestion.
const EMBED_BATCH_SIZE: usize = 32;

/// Text embedding capability. Used at ingestion time and for every query.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Name of the embedding model; stored with the index so a model change forces a rebuild.
    fn model(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(LlmError::EmbeddingCount {
            expected: 1,
            actual: 0,
        })
    }
}

/// Embeddings served by an Ollama endpoint (`all-minilm` by default).
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            vectors.extend(self.client.embed(&self.model, batch).await?);
        }
        Ok(vectors)
    }
}
