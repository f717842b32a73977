//! Configuration for the agent and its external services
//!
//! Loads configuration from config.yml file, with `.env` and environment
//! variables taking precedence for credentials and endpoints.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "medical_documents";
pub const DEFAULT_INDEX_PATH: &str = "data/document_index.json";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.so.com/s?q=";
pub const DEFAULT_IDENTITY: &str = "我是一个医疗问诊机器人";
pub const RETRIEVAL_TOP_K: usize = 5;
pub const RETRIEVAL_THRESHOLD: f32 = 0.7;
pub const GRAPH_TOP_K: usize = 3;
pub const REQUEST_TIMEOUT_SECS: u64 = 60;
pub const PAGE_MAX_CHARS: usize = 8000;

/// Which embedding implementation backs similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// OpenAI embeddings API
    OpenAI,
    /// Deterministic hashing embedder (offline)
    Local,
}

impl EmbeddingBackend {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "local" | "offline" => EmbeddingBackend::Local,
            _ => EmbeddingBackend::OpenAI,
        }
    }
}

/// Where the document index lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentBackend {
    /// JSON snapshot loaded into memory
    Local,
    /// Qdrant collection
    Qdrant,
}

impl DocumentBackend {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "qdrant" => DocumentBackend::Qdrant,
            _ => DocumentBackend::Local,
        }
    }
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    openai: Option<OpenAIConfig>,
    embeddings: Option<EmbeddingsConfig>,
    neo4j: Option<Neo4jConfig>,
    documents: Option<DocumentsConfig>,
    search: Option<SearchConfig>,
    agent: Option<AgentConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingsConfig {
    backend: Option<String>,
    model: Option<String>,
    dimension: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct Neo4jConfig {
    uri: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentsConfig {
    backend: Option<String>,
    path: Option<String>,
    qdrant_url: Option<String>,
    collection: Option<String>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchConfig {
    endpoint: Option<String>,
    max_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentConfig {
    retrieval_top_k: Option<usize>,
    retrieval_threshold: Option<f32>,
    graph_top_k: Option<usize>,
    request_timeout_secs: Option<u64>,
    history_window: Option<usize>,
    verbose: Option<bool>,
    identity: Option<String>,
    graph_templates: Option<String>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub openai_temperature: f32,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub document_backend: DocumentBackend,
    pub document_index_path: PathBuf,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub search_endpoint: String,
    pub page_max_chars: usize,
    pub retrieval_top_k: usize,
    pub retrieval_threshold: f32,
    pub graph_top_k: usize,
    pub request_timeout_secs: u64,
    pub history_window: usize,
    pub verbose: bool,
    pub identity: String,
    pub graph_templates_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Create config without a config file (environment still applies)
    pub fn defaults() -> Self {
        Self::from_yaml(YamlConfig::default())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return Some(env_val);
                }
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            return Some(env_val);
        }
        value.filter(|v| !(v.starts_with("${") && v.ends_with('}')))
    }

    /// Parse a boolean flag from the environment ("1", "true", "yes").
    fn env_flag(env_key: &str) -> Option<bool> {
        std::env::var(env_key).ok().map(|v| {
            matches!(
                v.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let openai = yaml.openai.unwrap_or_default();
        let embeddings = yaml.embeddings.unwrap_or_default();
        let neo4j = yaml.neo4j.unwrap_or_default();
        let documents = yaml.documents.unwrap_or_default();
        let search = yaml.search.unwrap_or_default();
        let agent = yaml.agent.unwrap_or_default();

        Self {
            openai_api_key: Self::resolve_env_string(openai.api_key, "OPENAI_API_KEY")
                .unwrap_or_default(),
            openai_base_url: Self::resolve_env_string(openai.base_url, "OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: openai
                .model
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            openai_max_tokens: openai.max_tokens.unwrap_or(1024),
            openai_temperature: openai.temperature.unwrap_or(0.0),
            embedding_backend: embeddings
                .backend
                .as_deref()
                .map(EmbeddingBackend::parse)
                .unwrap_or(EmbeddingBackend::OpenAI),
            embedding_model: embeddings
                .model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dim: embeddings.dimension.unwrap_or(256),
            neo4j_uri: Self::resolve_env_string(neo4j.uri, "NEO4J_URI")
                .unwrap_or_else(|| DEFAULT_NEO4J_URI.to_string()),
            neo4j_user: Self::resolve_env_string(neo4j.user, "NEO4J_USER")
                .unwrap_or_else(|| "neo4j".to_string()),
            neo4j_password: Self::resolve_env_string(neo4j.password, "NEO4J_PASSWORD")
                .unwrap_or_default(),
            document_backend: documents
                .backend
                .as_deref()
                .map(DocumentBackend::parse)
                .unwrap_or(DocumentBackend::Local),
            document_index_path: PathBuf::from(
                documents
                    .path
                    .unwrap_or_else(|| DEFAULT_INDEX_PATH.to_string()),
            ),
            qdrant_url: Self::resolve_env_string(documents.qdrant_url, "QDRANT_URL")
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_collection: documents
                .collection
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            chunk_size: documents.chunk_size.unwrap_or(300),
            chunk_overlap: documents.chunk_overlap.unwrap_or(50),
            search_endpoint: search
                .endpoint
                .unwrap_or_else(|| DEFAULT_SEARCH_ENDPOINT.to_string()),
            page_max_chars: search.max_chars.unwrap_or(PAGE_MAX_CHARS),
            retrieval_top_k: agent.retrieval_top_k.unwrap_or(RETRIEVAL_TOP_K),
            retrieval_threshold: agent.retrieval_threshold.unwrap_or(RETRIEVAL_THRESHOLD),
            graph_top_k: agent.graph_top_k.unwrap_or(GRAPH_TOP_K),
            request_timeout_secs: agent.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS),
            history_window: agent.history_window.unwrap_or(2),
            verbose: Self::env_flag("VERBOSE")
                .or(agent.verbose)
                .unwrap_or(false),
            identity: agent
                .identity
                .unwrap_or_else(|| DEFAULT_IDENTITY.to_string()),
            graph_templates_path: agent.graph_templates.map(PathBuf::from),
        }
    }

    /// Per-call timeout applied to every outbound request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
