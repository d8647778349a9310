use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::chat::pipeline::{ChatPipeline, PipelineError};
use crate::customers::repository::CustomerStore;

/// What the caller shows the user for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub rejected: bool,
    /// Id of the persisted turn. Absent for anonymous turns or when saving failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<i64>,
}

/// Runs the pipeline and records completed turns for known customers.
pub struct ChatService {
    pipeline: ChatPipeline,
    store: Arc<dyn CustomerStore>,
}

impl ChatService {
    pub fn new(pipeline: ChatPipeline, store: Arc<dyn CustomerStore>) -> Self {
        Self { pipeline, store }
    }

    /// Answered and rejected turns are saved when `customer_id` is known.
    /// Saving is best-effort; pipeline errors are returned without saving anything.
    pub async fn handle_turn(
        &self,
        utterance: &str,
        customer_id: Option<i64>,
    ) -> Result<ChatReply, PipelineError> {
        let outcome = self.pipeline.run(utterance).await?;

        let turn_id = match customer_id.filter(|id| *id > 0) {
            Some(id) => match self.store.save_turn(id, utterance, outcome.message()).await {
                Ok(turn_id) => {
                    info!("Saved turn {turn_id} for customer {id}");
                    Some(turn_id)
                }
                Err(e) => {
                    warn!("Failed to save turn for customer {id}: {e}");
                    None
                }
            },
            None => None,
        };

        Ok(ChatReply {
            response: outcome.message().to_string(),
            rejected: outcome.is_rejected(),
            turn_id,
        })
    }
}
