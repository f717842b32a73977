//! Integration tests for medical_qa_agent library
//!
//! These tests drive the public API end to end with in-process services.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use medical_qa_agent::{
    config::Config,
    error::{Error, Result},
    extraction::{default_schemas, parse_entities, ExtractedEntities},
    integrations::{GraphRow, LocalEmbedder, OpenAIClient, WebFetcher},
    prompts::{list_prompts, Prompt, NOTHING_FOUND},
    retrieval::{DocumentIndex, LocalDocumentIndex, ScoredPassage},
    templates::TemplateCatalogue,
    AgentContext, AgentSettings, Conversation, PageFetcher, Selection, Strategy,
    StrategyRouter, StructuredGraphStore, TextGenerator,
};

// ============================================================================
// Test services
// ============================================================================

struct Scripted {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for Scripted {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "不知道".to_string()))
    }
}

struct Passages(Vec<ScoredPassage>);

#[async_trait]
impl DocumentIndex for Passages {
    async fn search_with_score(&self, _query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        Ok(self.0.iter().take(k).cloned().collect())
    }
}

/// Answers statements containing `needle`; every other statement fails.
struct SelectiveGraph {
    needle: &'static str,
    rows: Vec<GraphRow>,
    executed: Mutex<Vec<String>>,
}

#[async_trait]
impl StructuredGraphStore for SelectiveGraph {
    async fn run(&self, statement: &str) -> Result<Vec<GraphRow>> {
        self.executed.lock().unwrap().push(statement.to_string());
        if statement.contains(self.needle) {
            Ok(self.rows.clone())
        } else {
            Err(Error::GraphError("connection reset".to_string()))
        }
    }
}

struct NoPages;

#[async_trait]
impl PageFetcher for NoPages {
    async fn fetch(&self, url: &str) -> Result<String> {
        Err(Error::FetchError(format!("{} unreachable", url)))
    }
}

fn graph(needle: &'static str, rows: Vec<GraphRow>) -> Arc<SelectiveGraph> {
    Arc::new(SelectiveGraph {
        needle,
        rows,
        executed: Mutex::new(Vec::new()),
    })
}

fn passage(text: &str, score: f32) -> ScoredPassage {
    ScoredPassage {
        text: text.to_string(),
        source: "fixtures/doc.txt".to_string(),
        score,
    }
}

fn agent(
    generator: Arc<dyn TextGenerator>,
    passages: Vec<ScoredPassage>,
    graph: Arc<dyn StructuredGraphStore>,
) -> StrategyRouter {
    StrategyRouter::new(AgentContext {
        generator,
        embedder: Arc::new(LocalEmbedder::new(256)),
        graph,
        fetcher: Arc::new(NoPages),
        documents: Arc::new(Passages(passages)),
        templates: TemplateCatalogue::builtin(&default_schemas()).expect("builtin templates"),
        settings: AgentSettings::default(),
    })
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_tool_falls_back_to_generic() {
    let generator = Scripted::new(&["我觉得应该用 graph_func", "你好！"]);
    let router = agent(generator.clone(), Vec::new(), graph("never", Vec::new()));

    let answer = router.route("你好").await.unwrap();

    assert!(matches!(answer.selection, Selection::Fallback { .. }));
    assert_eq!(answer.strategy(), Strategy::Generic);
    assert_eq!(answer.text.as_deref(), Some("你好！"));
}

#[tokio::test]
async fn test_identity_question_uses_configured_identity() {
    let generator = Scripted::new(&["generic_func", "我是一个医疗问诊机器人"]);
    let router = agent(generator.clone(), Vec::new(), graph("never", Vec::new()));

    let answer = router.route("你是谁").await.unwrap();

    assert_eq!(answer.selection, Selection::Matched(Strategy::Generic));
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("'我是一个医疗问诊机器人'"));
    assert!(prompts[1].contains("用户问题: 你是谁"));
}

#[tokio::test]
async fn test_search_failure_propagates_from_route() {
    let generator = Scripted::new(&["search_func"]);
    let router = agent(generator.clone(), Vec::new(), graph("never", Vec::new()));

    let err = router.route("刀郎最新的专辑").await.unwrap_err();

    assert!(matches!(err, Error::FetchError(_)));
    assert_eq!(generator.prompts().len(), 1);
}

// ============================================================================
// Retrieval Tests
// ============================================================================

#[tokio::test]
async fn test_retrieval_without_relevant_passages_uses_marker() {
    let generator = Scripted::new(&["retrieval_func", "不知道"]);
    let router = agent(
        generator.clone(),
        vec![passage("寻医问药网成立于2004年", 0.7), passage("无关内容", 0.42)],
        graph("never", Vec::new()),
    );

    let answer = router.route("寻医问药网是哪一年成立的").await.unwrap();

    assert_eq!(answer.strategy(), Strategy::Retrieval);
    let prompt = &generator.prompts()[1];
    assert!(prompt.contains(&format!("检索结果：{}\n", NOTHING_FOUND)));
    assert!(!prompt.contains("2004"));
}

#[tokio::test]
async fn test_retrieval_passes_relevant_passages_in_order() {
    let generator = Scripted::new(&["retrieval_func", "2004年"]);
    let router = agent(
        generator.clone(),
        vec![
            passage("寻医问药网成立于2004年", 0.91),
            passage("总部位于北京", 0.75),
            passage("无关内容", 0.2),
        ],
        graph("never", Vec::new()),
    );

    router.route("寻医问药网是哪一年成立的").await.unwrap();

    let prompt = &generator.prompts()[1];
    assert!(prompt.contains("检索结果：寻医问药网成立于2004年\n\n总部位于北京\n"));
    assert!(!prompt.contains("无关内容"));
}

#[tokio::test]
async fn test_local_document_index_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let embedder = Arc::new(LocalEmbedder::new(128));
    let chunker = medical_qa_agent::retrieval::Chunker::new(200, 0);
    let chunks = chunker.chunk("寻医问药网成立于2004年，是一家医疗健康网站。", "about.txt");

    let index = LocalDocumentIndex::from_chunks(embedder.clone(), chunks)
        .await
        .unwrap();
    index.save(&path).unwrap();

    let loaded = LocalDocumentIndex::load(&path, embedder).unwrap();
    let hits = loaded
        .search_with_score("寻医问药网成立于2004年，是一家医疗健康网站。", 5)
        .await
        .unwrap();

    assert_eq!(loaded.len(), 1);
    assert_eq!(hits[0].source, "about.txt");
    assert!(hits[0].score > 0.99);
}

// ============================================================================
// Graph Tests
// ============================================================================

#[tokio::test]
async fn test_graph_skips_failing_candidates() {
    let generator = Scripted::new(&[
        "graph_func",
        "```json\n{\"disease\": [\"感冒\"], \"symptom\": [], \"drug\": []}\n```",
        "感冒常见症状为鼻塞和咳嗽",
    ]);
    let store = graph(
        "DISEASE_SYMPTOM]->(m) WHERE n.name='感冒'",
        vec![GraphRow::new(vec![(
            "RES".to_string(),
            json!(["鼻塞", "咳嗽"]),
        )])],
    );
    let router = agent(generator.clone(), Vec::new(), store.clone());

    let answer = router.route("感冒会有哪些症状?").await.unwrap();

    assert_eq!(answer.text.as_deref(), Some("感冒常见症状为鼻塞和咳嗽"));
    assert_eq!(store.executed.lock().unwrap().len(), 3);

    let prompt = &generator.prompts()[2];
    assert!(prompt.contains("问题：感冒会有哪些症状?\n答案：【感冒】的症状：鼻塞、咳嗽"));
    assert!(!prompt.contains(NOTHING_FOUND));
}

#[tokio::test]
async fn test_graph_without_entities_has_no_answer() {
    let generator = Scripted::new(&[
        "graph_func",
        "```json\n{\"disease\": [], \"symptom\": [], \"drug\": []}\n```",
    ]);
    let store = graph("never", Vec::new());
    let router = agent(generator.clone(), Vec::new(), store.clone());

    let answer = router.route("这种情况怎么办").await.unwrap();

    assert_eq!(answer.text, None);
    assert!(store.executed.lock().unwrap().is_empty());
    assert_eq!(generator.prompts().len(), 2);
}

#[tokio::test]
async fn test_graph_rejects_malformed_extraction() {
    let generator = Scripted::new(&["graph_func", "{\"disease\": \"感冒\"}"]);
    let router = agent(generator, Vec::new(), graph("never", Vec::new()));

    let err = router.route("感冒怎么办").await.unwrap_err();
    assert!(matches!(err, Error::ExtractionFormat(_)));
}

// ============================================================================
// Template Tests
// ============================================================================

#[test]
fn test_template_fill_substitutes_placeholder() {
    let schemas = default_schemas();
    let catalogue = TemplateCatalogue::builtin(&schemas).unwrap();
    let entities = ExtractedEntities {
        disease: vec!["鼻炎".to_string()],
        symptom: Vec::new(),
        drug: Vec::new(),
    };

    let filled = catalogue.fill(&schemas, &entities);

    assert!(!filled.is_empty());
    for template in &filled {
        assert!(template.question.contains("鼻炎"), "{}", template.key);
        assert!(!template.question.contains("{disease}"));
        assert!(template.cypher.contains("'鼻炎'"));
    }
}

#[test]
fn test_template_fill_with_no_entities_is_empty() {
    let schemas = default_schemas();
    let catalogue = TemplateCatalogue::builtin(&schemas).unwrap();
    assert!(catalogue.fill(&schemas, &ExtractedEntities::default()).is_empty());
}

#[test]
fn test_parse_entities_from_fenced_reply() {
    let entities = parse_entities(
        "好的：\n```json\n{\"disease\": [\"鼻炎\"], \"symptom\": [\"鼻塞\"], \"drug\": []}\n```",
    )
    .unwrap();
    assert_eq!(entities.disease, vec!["鼻炎"]);
    assert_eq!(entities.total(), 2);
}

// ============================================================================
// Conversation Tests
// ============================================================================

#[tokio::test]
async fn test_dispatch_condenses_follow_up() {
    let generator = Scripted::new(&["得了鼻炎，吃什么药好得快？", "generic_func", "多休息"]);
    let router = agent(generator.clone(), Vec::new(), graph("never", Vec::new()));
    let mut conversation = Conversation::new();
    conversation.push_exchange("鼻炎是什么引起的？", "鼻炎通常是由于感染引起。");

    let answer = router
        .dispatch("吃什么药好得快？", conversation.turns())
        .await
        .unwrap();

    assert_eq!(answer.query, "得了鼻炎，吃什么药好得快？");
    assert!(generator.prompts()[0].contains("用户消息：吃什么药好得快？"));
}

// ============================================================================
// HTTP Service Tests
// ============================================================================

#[tokio::test]
async fn test_route_over_openai_compatible_endpoint() {
    use httpmock::prelude::*;

    let server = MockServer::start_async().await;
    let selection = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_includes("直接输出工具名称即可");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "role": "assistant", "content": "generic_func\n" } }]
        }));
    });
    let generic = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_includes("用户问题: 你是谁");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "role": "assistant", "content": "我是一个医疗问诊机器人" } }]
        }));
    });

    let mut config = Config::defaults();
    config.openai_api_key = "test_key".to_string();
    config.openai_base_url = server.base_url();
    let generator = Arc::new(OpenAIClient::from_config(&config).unwrap());
    let router = agent(generator, Vec::new(), graph("never", Vec::new()));

    let answer = router.route("你是谁").await.unwrap();

    selection.assert();
    generic.assert();
    assert_eq!(answer.selection, Selection::Matched(Strategy::Generic));
    assert_eq!(answer.text.as_deref(), Some("我是一个医疗问诊机器人"));
}

#[tokio::test]
async fn test_web_fetcher_reads_search_page() {
    use httpmock::prelude::*;

    let server = MockServer::start_async().await;
    let page = server.mock(|when, then| {
        when.method(GET).path("/s");
        then.status(200)
            .body("<html><body><h3>刀郎</h3><p>最新专辑《山歌寥哉》</p></body></html>");
    });

    let fetcher = WebFetcher::default();
    let text = fetcher
        .fetch(&format!("{}?q=刀郎+专辑", server.url("/s")))
        .await
        .unwrap();

    page.assert();
    assert_eq!(text, "刀郎 最新专辑《山歌寥哉》");
}

// ============================================================================
// Prompt and Config Tests
// ============================================================================

#[test]
fn test_all_prompts_have_builtin_templates() {
    for prompt in list_prompts() {
        assert!(!prompt.builtin().trim().is_empty(), "{}", prompt.filename());
    }
    assert!(Prompt::ToolSelection.builtin().contains("{tools_description}"));
}

#[test]
fn test_config_defaults_match_agent_settings() {
    let config = Config::defaults();
    let settings = AgentSettings::from_config(&config);
    assert_eq!(settings.retrieval_top_k, 5);
    assert!((settings.retrieval_threshold - 0.7).abs() < f32::EPSILON);
    assert_eq!(settings.graph_top_k, 3);
}
