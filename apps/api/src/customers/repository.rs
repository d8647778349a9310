use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::models::customer::{ConversationTurnRow, CustomerRow};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Customer {0} vanished after insert")]
    MissingAfterInsert(i64),
}

/// Fields accepted when registering a customer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCustomer {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub plate: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
}

/// Partial update: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub plate: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
}

/// Customer and conversation persistence.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<CustomerRow>, PersistenceError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<CustomerRow>, PersistenceError>;

    async fn create(&self, customer: &NewCustomer) -> Result<CustomerRow, PersistenceError>;

    /// Returns `None` when no customer has `id`.
    async fn update(
        &self,
        id: i64,
        update: &CustomerUpdate,
    ) -> Result<Option<CustomerRow>, PersistenceError>;

    /// Stores one exchange and returns the new turn id.
    async fn save_turn(
        &self,
        customer_id: i64,
        message: &str,
        response: &str,
    ) -> Result<i64, PersistenceError>;

    /// The customer's turns, newest first.
    async fn list_turns(
        &self,
        customer_id: i64,
        limit: i64,
    ) -> Result<Vec<ConversationTurnRow>, PersistenceError>;

    /// Finds the customer by phone. When none exists and a non-blank `name` is
    /// given, registers them and returns the stored row; otherwise returns `None`.
    async fn identify_or_create(
        &self,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Option<CustomerRow>, PersistenceError> {
        if let Some(existing) = self.find_by_phone(phone).await? {
            return Ok(Some(existing));
        }

        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };

        let created = self
            .create(&NewCustomer {
                name: Some(name.to_string()),
                phone: Some(phone.to_string()),
                ..NewCustomer::default()
            })
            .await?;
        info!("Registered customer {}", created.id);

        self.find_by_id(created.id)
            .await?
            .map(Some)
            .ok_or(PersistenceError::MissingAfterInsert(created.id))
    }
}

/// PostgreSQL-backed store over the `customers` and `conversation_turns` tables.
#[derive(Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<CustomerRow>, PersistenceError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT * FROM customers WHERE phone = $1 ORDER BY id LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CustomerRow>, PersistenceError> {
        let row = sqlx::query_as::<_, CustomerRow>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create(&self, customer: &NewCustomer) -> Result<CustomerRow, PersistenceError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            INSERT INTO customers (name, phone, email, plate, vehicle_model, vehicle_year)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.plate)
        .bind(&customer.vehicle_model)
        .bind(customer.vehicle_year)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        update: &CustomerUpdate,
    ) -> Result<Option<CustomerRow>, PersistenceError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            UPDATE customers SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                plate = COALESCE($4, plate),
                vehicle_model = COALESCE($5, vehicle_model),
                vehicle_year = COALESCE($6, vehicle_year)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.plate)
        .bind(&update.vehicle_model)
        .bind(update.vehicle_year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save_turn(
        &self,
        customer_id: i64,
        message: &str,
        response: &str,
    ) -> Result<i64, PersistenceError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO conversation_turns (customer_id, message, response)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(customer_id)
        .bind(message)
        .bind(response)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_turns(
        &self,
        customer_id: i64,
        limit: i64,
    ) -> Result<Vec<ConversationTurnRow>, PersistenceError> {
        let rows = sqlx::query_as::<_, ConversationTurnRow>(
            r#"
            SELECT * FROM conversation_turns
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
