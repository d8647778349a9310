use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::rag::embedder::Embedder;
use crate::rag::index::VectorIndex;
use crate::rag::{RetrievalError, RetrievedPassage, Retriever};

/// Retriever over the in-memory similarity index.
/// Embeds the query with the same model the index was built with.
pub struct IndexRetriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl IndexRetriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        if self.index.is_empty() {
            return Err(RetrievalError::IndexMissing);
        }

        let query_vector = self.embedder.embed(query).await?;
        if query_vector.len() != self.index.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: query_vector.len(),
            });
        }

        let passages = self.index.search(&query_vector, k);
        debug!(
            "Retrieved {} passages (k={}), top score {:?}",
            passages.len(),
            k,
            passages.first().map(|p| p.score)
        );
        Ok(passages)
    }
}
