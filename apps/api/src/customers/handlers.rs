use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::customers::repository::CustomerUpdate;
use crate::errors::AppError;
use crate::models::customer::{ConversationTurnRow, CustomerRow};
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    pub phone: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

fn require_phone(phone: &str) -> Result<&str, AppError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(AppError::Validation("phone must not be empty".to_string()));
    }
    Ok(phone)
}

/// POST /api/v1/customers/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<CustomerRow>, AppError> {
    let phone = require_phone(&req.phone)?;
    let customer = state
        .customers
        .find_by_phone(phone)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No customer registered with phone {phone}")))?;
    Ok(Json(customer))
}

/// POST /api/v1/customers/identify
pub async fn handle_identify(
    State(state): State<AppState>,
    Json(req): Json<IdentifyRequest>,
) -> Result<Json<CustomerRow>, AppError> {
    let phone = require_phone(&req.phone)?;
    let customer = state
        .customers
        .identify_or_create(phone, req.name.as_deref())
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No customer registered with phone {phone}; provide a name to register"
            ))
        })?;
    Ok(Json(customer))
}

/// GET /api/v1/customers/:id
pub async fn handle_get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CustomerRow>, AppError> {
    let customer = state
        .customers
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {id} not found")))?;
    Ok(Json(customer))
}

/// PATCH /api/v1/customers/:id
pub async fn handle_update_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<CustomerUpdate>,
) -> Result<Json<CustomerRow>, AppError> {
    if let Some(year) = update.vehicle_year {
        if !(1900..=2100).contains(&year) {
            return Err(AppError::Validation(format!("vehicle_year {year} is out of range")));
        }
    }

    let customer = state
        .customers
        .update(id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {id} not found")))?;
    Ok(Json(customer))
}

/// GET /api/v1/customers/:id/conversations
pub async fn handle_list_conversations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<ConversationTurnRow>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }

    if state.customers.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Customer {id} not found")));
    }

    let turns = state.customers.list_turns(id, limit).await?;
    Ok(Json(turns))
}
