use tracing::debug;

use super::{evidence_block, AgentContext};
use crate::prompts::Prompt;
use crate::retrieval::ScoredPassage;
use crate::Result;

/// Passage texts scoring strictly above `threshold`, in rank order.
pub fn filter_passages(passages: &[ScoredPassage], threshold: f32) -> Vec<String> {
    passages
        .iter()
        .filter(|p| p.score > threshold)
        .map(|p| p.text.clone())
        .collect()
}

/// Answer from the document index.
pub async fn answer(ctx: &AgentContext, query: &str) -> Result<String> {
    let settings = &ctx.settings;
    let passages = ctx
        .documents
        .search_with_score(query, settings.retrieval_top_k)
        .await?;
    let kept = filter_passages(&passages, settings.retrieval_threshold);
    debug!(
        found = passages.len(),
        kept = kept.len(),
        "Retrieved passages"
    );

    let query_result = evidence_block(&kept);
    let prompt = Prompt::Retrieval.render(&[
        ("query_result", query_result.as_str()),
        ("query", query),
    ]);
    ctx.generator.generate(&prompt).await
}
