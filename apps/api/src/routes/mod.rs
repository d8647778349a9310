pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::customers::handlers as customers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/api/v1/chat", post(chat::handle_chat))
        // Customer API
        .route("/api/v1/customers/login", post(customers::handle_login))
        .route("/api/v1/customers/identify", post(customers::handle_identify))
        .route(
            "/api/v1/customers/:id",
            get(customers::handle_get_customer).patch(customers::handle_update_customer),
        )
        .route(
            "/api/v1/customers/:id/conversations",
            get(customers::handle_list_conversations),
        )
        .with_state(state)
}
