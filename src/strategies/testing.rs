//! In-process fakes for strategy and router tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{AgentContext, AgentSettings};
use crate::extraction::default_schemas;
use crate::integrations::{
    Embedder, GraphRow, LocalEmbedder, PageFetcher, StructuredGraphStore, TextGenerator,
};
use crate::retrieval::{DocumentIndex, ScoredPassage};
use crate::templates::TemplateCatalogue;
use crate::{Error, Result};

/// Replies from a queue, then repeats the fallback; records every prompt.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fallback: "好的".to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Returns fixed passages regardless of the query.
pub struct FixedDocuments(pub Vec<ScoredPassage>);

#[async_trait]
impl DocumentIndex for FixedDocuments {
    async fn search_with_score(&self, _query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        Ok(self.0.iter().take(k).cloned().collect())
    }
}

pub fn passage(text: &str, score: f32) -> ScoredPassage {
    ScoredPassage {
        text: text.to_string(),
        source: "test".to_string(),
        score,
    }
}

/// Answers statements by substring; statements matching `failing` error out.
#[derive(Default)]
pub struct FakeGraph {
    pub answers: Vec<(String, Vec<GraphRow>)>,
    pub failing: Vec<String>,
    pub statements: Mutex<Vec<String>>,
}

impl FakeGraph {
    pub fn executed(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredGraphStore for FakeGraph {
    async fn run(&self, statement: &str) -> Result<Vec<GraphRow>> {
        self.statements.lock().unwrap().push(statement.to_string());
        if self.failing.iter().any(|f| statement.contains(f.as_str())) {
            return Err(Error::GraphError("relation does not exist".to_string()));
        }
        Ok(self
            .answers
            .iter()
            .find(|(needle, _)| statement.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

/// Serves one page body and records requested URLs.
#[derive(Default)]
pub struct FakeFetcher {
    pub body: String,
    pub fail: bool,
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(Error::FetchError("connection refused".to_string()));
        }
        Ok(self.body.clone())
    }
}

/// Context over fakes with the built-in template catalogue.
pub fn context(
    generator: Arc<dyn TextGenerator>,
    documents: Arc<dyn DocumentIndex>,
    graph: Arc<dyn StructuredGraphStore>,
    fetcher: Arc<dyn PageFetcher>,
) -> AgentContext {
    let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::new(256));
    AgentContext {
        generator,
        embedder,
        graph,
        fetcher,
        documents,
        templates: TemplateCatalogue::builtin(&default_schemas()).unwrap(),
        settings: AgentSettings::default(),
    }
}
