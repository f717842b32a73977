use super::AgentContext;
use crate::prompts::Prompt;
use crate::Result;

/// Chit-chat answer under the identity and refusal rules.
pub async fn answer(ctx: &AgentContext, query: &str) -> Result<String> {
    let prompt = Prompt::Generic.render(&[
        ("identity", ctx.settings.identity.as_str()),
        ("query", query),
    ]);
    ctx.generator.generate(&prompt).await
}
