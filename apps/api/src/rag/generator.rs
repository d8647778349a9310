use async_trait::async_trait;
use tracing::info;

use crate::llm_client::{LlmError, OllamaClient};
use crate::rag::assembler::AssembledPrompt;
use crate::rag::{AnswerGenerator, GenerationError};

/// Answers with an Ollama chat model (`gemma3:4b` at temperature 0.7 by default).
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &AssembledPrompt) -> Result<String, GenerationError> {
        let response = self
            .client
            .chat(&self.model, &prompt.system, &prompt.user, self.temperature)
            .await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        info!(
            "Generated answer: model={}, passages={}, chars={}",
            self.model,
            prompt.passages_used,
            text.chars().count()
        );
        Ok(text.to_string())
    }
}
