use std::sync::Arc;

use crate::chat::service::ChatService;
use crate::customers::repository::CustomerStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    /// Pluggable customer store. Default: PgCustomerStore.
    pub customers: Arc<dyn CustomerStore>,
    /// Chunks in the similarity index loaded at startup. 0 means retrieval is unavailable.
    pub index_chunks: usize,
}
