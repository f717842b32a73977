//! The four answer strategies and the services they share.

pub mod generic;
pub mod graph;
pub mod retrieval;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::config::{Config, DEFAULT_IDENTITY, DEFAULT_SEARCH_ENDPOINT, GRAPH_TOP_K};
use crate::config::{RETRIEVAL_THRESHOLD, RETRIEVAL_TOP_K};
use crate::extraction::default_schemas;
use crate::integrations::embeddings::build_embedder;
use crate::integrations::{
    Embedder, Instrumented, Neo4jStore, OpenAIClient, PageFetcher, StructuredGraphStore,
    TextGenerator, WebFetcher,
};
use crate::prompts::NOTHING_FOUND;
use crate::retrieval::{open_document_index, DocumentIndex};
use crate::templates::TemplateCatalogue;
use crate::Result;

/// One of the self-contained answer procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Generic,
    Retrieval,
    Graph,
    Search,
}

impl Strategy {
    /// Declaration order; the first entry is the fallback.
    pub const ALL: [Strategy; 4] = [
        Strategy::Generic,
        Strategy::Retrieval,
        Strategy::Graph,
        Strategy::Search,
    ];

    /// Tool name the selection prompt offers.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Generic => "generic_func",
            Strategy::Retrieval => "retrieval_func",
            Strategy::Graph => "graph_func",
            Strategy::Search => "search_func",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Generic => "可以解答通用领域的知识，例如打招呼，问你是谁等问题",
            Strategy::Retrieval => "用于回答寻医问药网相关问题",
            Strategy::Graph => "用于回答疾病、症状、药物等医疗相关问题",
            Strategy::Search => "其他工具没有正确答案时，通过搜索引擎，回答通用类问题",
        }
    }

    /// Exact name lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Run the strategy. `Ok(None)` means the strategy had nothing to say.
    pub async fn run(&self, ctx: &AgentContext, query: &str) -> Result<Option<String>> {
        match self {
            Strategy::Generic => generic::answer(ctx, query).await.map(Some),
            Strategy::Retrieval => retrieval::answer(ctx, query).await.map(Some),
            Strategy::Graph => graph::answer(ctx, query).await,
            Strategy::Search => search::answer(ctx, query).await.map(Some),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tunables read by the strategies.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub identity: String,
    pub retrieval_top_k: usize,
    pub retrieval_threshold: f32,
    pub graph_top_k: usize,
    pub search_endpoint: String,
    pub history_window: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY.to_string(),
            retrieval_top_k: RETRIEVAL_TOP_K,
            retrieval_threshold: RETRIEVAL_THRESHOLD,
            graph_top_k: GRAPH_TOP_K,
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            history_window: 2,
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            identity: config.identity.clone(),
            retrieval_top_k: config.retrieval_top_k,
            retrieval_threshold: config.retrieval_threshold,
            graph_top_k: config.graph_top_k,
            search_endpoint: config.search_endpoint.clone(),
            history_window: config.history_window,
        }
    }
}

/// Services and settings shared by every dispatch. Read-only once built.
pub struct AgentContext {
    pub generator: Arc<dyn TextGenerator>,
    pub embedder: Arc<dyn Embedder>,
    pub graph: Arc<dyn StructuredGraphStore>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub documents: Arc<dyn DocumentIndex>,
    pub templates: TemplateCatalogue,
    pub settings: AgentSettings,
}

impl AgentContext {
    /// Connect every external service described by `config`.
    ///
    /// Each service is wrapped with the configured per-call timeout.
    pub async fn connect(config: &Config) -> Result<Self> {
        let limit = config.request_timeout();
        let verbose = config.verbose;

        let generator = Arc::new(OpenAIClient::from_config(config)?);
        let embedder: Arc<dyn Embedder> = Arc::new(Instrumented::new(
            build_embedder(config),
            limit,
            verbose,
        ));
        let graph = Arc::new(Neo4jStore::from_config(config).await?);
        let fetcher = Arc::new(WebFetcher::from_config(config)?);
        let documents = open_document_index(config, embedder.clone())?;
        let templates = TemplateCatalogue::from_config(config, &default_schemas())?;

        info!(
            model = %generator.model(),
            templates = templates.len(),
            "Agent services ready"
        );

        Ok(Self {
            generator: Arc::new(Instrumented::new(generator, limit, verbose)),
            embedder,
            graph: Arc::new(Instrumented::new(graph, limit, verbose)),
            fetcher: Arc::new(Instrumented::new(fetcher, limit, verbose)),
            documents,
            templates,
            settings: AgentSettings::from_config(config),
        })
    }
}

/// Join evidence with blank lines, or the "nothing found" marker when empty.
pub fn evidence_block(evidence: &[String]) -> String {
    if evidence.is_empty() {
        NOTHING_FOUND.to_string()
    } else {
        evidence.join("\n\n")
    }
}
