//! Knowledge-graph answers.
//!
//! Entities extracted from the query fill the graph templates; the filled
//! questions closest to the query are executed and every non-empty first row
//! becomes one evidence line for the answer prompt.

use tracing::{debug, info};

use super::{evidence_block, AgentContext};
use crate::extraction::EntityExtractor;
use crate::integrations::{GraphRow, StructuredGraphStore};
use crate::metrics;
use crate::prompts::Prompt;
use crate::templates::{FilledTemplate, TemplateIndex};
use crate::Result;

/// Result of executing one candidate: its first usable row, if any.
pub type CandidateResult = Result<Option<GraphRow>>;

/// Execute each candidate in order, keeping failures as values.
pub async fn execute_candidates(
    graph: &dyn StructuredGraphStore,
    candidates: &[FilledTemplate],
) -> Vec<CandidateResult> {
    let mut results = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let result = graph
            .run(&candidate.cypher)
            .await
            .map(|rows| rows.into_iter().next().filter(GraphRow::has_value));
        results.push(result);
    }
    results
}

/// Evidence lines from successful candidates; failed and empty ones are skipped.
pub fn collect_evidence(candidates: &[FilledTemplate], results: Vec<CandidateResult>) -> Vec<String> {
    let mut evidence = Vec::new();
    for (candidate, result) in candidates.iter().zip(results) {
        match result {
            Ok(Some(row)) => {
                metrics::record_graph_candidate("used");
                evidence.push(candidate.evidence(&row));
            }
            Ok(None) => {
                metrics::record_graph_candidate("empty");
                debug!(key = %candidate.key, "Graph candidate returned nothing");
            }
            Err(err) => {
                metrics::record_graph_candidate("failed");
                debug!(key = %candidate.key, "Graph candidate skipped: {}", err);
            }
        }
    }
    evidence
}

/// Answer from the knowledge graph; `Ok(None)` when no entity was found.
pub async fn answer(ctx: &AgentContext, query: &str) -> Result<Option<String>> {
    let extractor = EntityExtractor::new(ctx.generator.clone());
    let entities = extractor.extract(query).await?;

    let filled = ctx.templates.fill(extractor.schemas(), &entities);
    if filled.is_empty() {
        info!("No entities extracted, graph strategy has no answer");
        return Ok(None);
    }

    let items = filled
        .into_iter()
        .map(|template| (template.question.clone(), template))
        .collect();
    let index = TemplateIndex::build(ctx.embedder.clone(), items).await?;
    let candidates: Vec<FilledTemplate> = index
        .search_with_score(query, ctx.settings.graph_top_k)
        .await?
        .into_iter()
        .map(|hit| {
            debug!(question = %hit.text, score = hit.score, "Graph candidate");
            hit.item
        })
        .collect();

    let results = execute_candidates(ctx.graph.as_ref(), &candidates).await;
    let evidence = collect_evidence(&candidates, results);
    info!(
        candidates = candidates.len(),
        evidence = evidence.len(),
        "Graph evidence collected"
    );

    let query_result = evidence_block(&evidence);
    let prompt = Prompt::Graph.render(&[
        ("query_result", query_result.as_str()),
        ("query", query),
    ]);
    ctx.generator.generate(&prompt).await.map(Some)
}
