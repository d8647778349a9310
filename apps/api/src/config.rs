use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub ollama_base_url: String,
    pub ollama_api_key: String,
    pub chat_model: String,
    pub chat_temperature: f32,
    pub embedding_base_url: String,
    pub embedding_model: String,
    pub documents_dir: PathBuf,
    pub index_dir: PathBuf,
    pub retrieval_top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_context_chars: usize,
    pub llm_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Config {
            database_url: require_env("DATABASE_URL")?,
            ollama_base_url: env_or("OLLAMA_BASE_URL", "https://ollama.com"),
            ollama_api_key: env_or("OLLAMA_API_KEY", ""),
            chat_model: env_or("CHAT_MODEL", "gemma3:4b"),
            chat_temperature: parse_env("CHAT_TEMPERATURE", 0.7)?,
            embedding_base_url: env_or("EMBEDDING_BASE_URL", "http://localhost:11434"),
            embedding_model: env_or("EMBEDDING_MODEL", "all-minilm"),
            documents_dir: PathBuf::from(env_or("DOCUMENTS_DIR", "data/documentos")),
            index_dir: PathBuf::from(env_or("INDEX_DIR", "data/index")),
            retrieval_top_k: parse_env("RETRIEVAL_TOP_K", 3)?,
            chunk_size: parse_env("CHUNK_SIZE", 500)?,
            chunk_overlap: parse_env("CHUNK_OVERLAP", 100)?,
            max_context_chars: parse_env("MAX_CONTEXT_CHARS", 6000)?,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        }
        .validated()
    }

    /// Rejects settings that parse but cannot work together.
    fn validated(self) -> Result<Self> {
        if self.retrieval_top_k < 1 {
            bail!("Environment variable 'RETRIEVAL_TOP_K' must be at least 1");
        }
        if self.chunk_size < 1 {
            bail!("Environment variable 'CHUNK_SIZE' must be at least 1");
        }
        if self.chunk_overlap >= self.chunk_size {
            bail!(
                "Environment variable 'CHUNK_OVERLAP' ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap,
                self.chunk_size
            );
        }
        Ok(self)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
