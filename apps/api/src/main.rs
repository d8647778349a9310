mod chat;
mod config;
mod customers;
mod db;
mod errors;
mod guards;
mod llm_client;
mod models;
mod rag;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::pipeline::ChatPipeline;
use crate::chat::service::ChatService;
use crate::config::Config;
use crate::customers::repository::PgCustomerStore;
use crate::db::{create_pool, ensure_schema};
use crate::llm_client::OllamaClient;
use crate::rag::assembler::PromptAssembler;
use crate::rag::chunker::TextChunker;
use crate::rag::embedder::{Embedder, OllamaEmbedder};
use crate::rag::generator::OllamaGenerator;
use crate::rag::index::{load_or_build, VectorIndex};
use crate::rag::retriever::IndexRetriever;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AutoCare API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;
    let customers = Arc::new(PgCustomerStore::new(db));

    // Initialize model clients (chat and embeddings may live on different hosts)
    let timeout = Duration::from_secs(config.llm_timeout_secs);
    let chat_client = OllamaClient::new(&config.ollama_base_url, &config.ollama_api_key, timeout)?;
    let embed_client =
        OllamaClient::new(&config.embedding_base_url, &config.ollama_api_key, timeout)?;
    info!(
        "LLM clients initialized (chat: {} @ {}, embeddings: {} @ {})",
        config.chat_model,
        chat_client.base_url(),
        config.embedding_model,
        embed_client.base_url()
    );

    let embedder: Arc<dyn Embedder> =
        Arc::new(OllamaEmbedder::new(embed_client, config.embedding_model.clone()));

    // Load or build the similarity index before accepting requests
    let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap);
    let index = match load_or_build(
        &config.index_dir,
        &config.documents_dir,
        &chunker,
        embedder.as_ref(),
    )
    .await
    {
        Ok(index) => index,
        Err(e) => {
            error!("Similarity index unavailable, chat answers will fail until restart: {e}");
            VectorIndex::empty(embedder.model())
        }
    };
    let index_chunks = index.len();

    // Build the chat pipeline
    let retriever = Arc::new(IndexRetriever::new(Arc::new(index), embedder));
    let generator = Arc::new(OllamaGenerator::new(
        chat_client,
        config.chat_model.clone(),
        config.chat_temperature,
    ));
    let pipeline = ChatPipeline::new(
        retriever,
        PromptAssembler::with_default_persona(config.max_context_chars),
        generator,
        config.retrieval_top_k,
    );
    let chat = Arc::new(ChatService::new(pipeline, customers.clone()));

    // Build app state
    let state = AppState {
        chat,
        customers,
        index_chunks,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the shop's web front end

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
