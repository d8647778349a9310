use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::chat::pipeline::PipelineError;
use crate::customers::repository::PersistenceError;

/// Shown to the user whenever a turn fails. Deliberately distinct from guard messages.
pub const APOLOGY_MESSAGE: &str =
    "Desculpe, ocorreu um erro ao processar sua pergunta. Tente novamente em instantes.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Chat pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Pipeline(PipelineError::RetrievalUnavailable(e)) => {
                tracing::error!("Retrieval unavailable: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "RETRIEVAL_UNAVAILABLE",
                    APOLOGY_MESSAGE.to_string(),
                )
            }
            AppError::Pipeline(PipelineError::Generation(e)) => {
                tracing::error!("Generation error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_ERROR",
                    APOLOGY_MESSAGE.to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::rag::{GenerationError, RetrievalError};

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Pipeline(PipelineError::RetrievalUnavailable(RetrievalError::IndexMissing)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Pipeline(PipelineError::Generation(GenerationError::Llm(
                    LlmError::EmptyContent,
                ))),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
