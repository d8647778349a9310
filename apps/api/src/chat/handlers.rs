use axum::{extract::State, Json};
use serde::Deserialize;

use crate::chat::service::ChatReply;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub customer_id: Option<i64>,
}

/// POST /api/v1/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = state.chat.handle_turn(&req.message, req.customer_id).await?;
    Ok(Json(reply))
}
