use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A shop customer. Every field but `id` may be missing for partially registered customers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CustomerRow {
    pub id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub plate: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// One persisted exchange: the customer's utterance and the reply they were shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ConversationTurnRow {
    pub id: i64,
    pub customer_id: i64,
    pub message: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}
