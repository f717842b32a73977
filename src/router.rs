//! Strategy selection and dispatch.
//!
//! The text generator picks a tool by name from the selection prompt. A reply
//! that is not exactly one of the declared names routes to the generic
//! strategy and is reported as [`Selection::Fallback`].

use std::time::Instant;

use tracing::{info, warn};

use crate::conversation::{condense, Turn};
use crate::metrics;
use crate::prompts::Prompt;
use crate::strategies::{AgentContext, Strategy};
use crate::Result;

/// How the strategy for a query was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The reply named a declared tool.
    Matched(Strategy),
    /// The reply matched nothing; the first declared tool runs instead.
    Fallback { reply: String },
}

impl Selection {
    pub fn strategy(&self) -> Strategy {
        match self {
            Selection::Matched(strategy) => *strategy,
            Selection::Fallback { .. } => Strategy::ALL[0],
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Selection::Fallback { .. })
    }
}

/// Map a raw selection reply to a strategy.
pub fn parse_selection(reply: &str) -> Selection {
    let candidate = reply.trim();
    match Strategy::from_name(candidate) {
        Some(strategy) => Selection::Matched(strategy),
        None => Selection::Fallback {
            reply: candidate.to_string(),
        },
    }
}

/// `name:description` lines for every declared tool.
pub fn tools_description() -> String {
    Strategy::ALL
        .iter()
        .map(|s| format!("{}:{}\n", s.name(), s.description()))
        .collect()
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// The query that was routed (condensed when history was given).
    pub query: String,
    pub selection: Selection,
    /// `None` when the strategy found nothing to answer with.
    pub text: Option<String>,
}

impl Answer {
    pub fn strategy(&self) -> Strategy {
        self.selection.strategy()
    }
}

/// Routes each query to one strategy.
pub struct StrategyRouter {
    ctx: AgentContext,
}

impl StrategyRouter {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    /// Ask the generator which strategy should handle `query`.
    pub async fn select(&self, query: &str) -> Result<Selection> {
        let description = tools_description();
        let prompt = Prompt::ToolSelection.render(&[
            ("tools_description", description.as_str()),
            ("query", query),
        ]);
        let reply = self.ctx.generator.generate(&prompt).await?;

        let selection = parse_selection(&reply);
        match &selection {
            Selection::Matched(strategy) => {
                metrics::record_tool_selection("matched");
                info!(tool = %strategy, "Tool selected");
            }
            Selection::Fallback { reply } => {
                metrics::record_tool_selection("fallback");
                warn!(%reply, "Unrecognised tool name, falling back to {}", Strategy::ALL[0]);
            }
        }
        Ok(selection)
    }

    /// Select and run a strategy for a standalone query.
    pub async fn route(&self, query: &str) -> Result<Answer> {
        let start = Instant::now();
        let selection = self.select(query).await?;
        let strategy = selection.strategy();

        let result = strategy.run(&self.ctx, query).await;
        metrics::record_dispatch(strategy.name(), start.elapsed(), result.is_ok());

        Ok(Answer {
            query: query.to_string(),
            selection,
            text: result?,
        })
    }

    /// Condense `query` against `history`, then route it.
    pub async fn dispatch(&self, query: &str, history: &[Turn]) -> Result<Answer> {
        let standalone = condense(
            self.ctx.generator.as_ref(),
            query,
            history,
            self.ctx.settings.history_window,
        )
        .await?;
        self.route(&standalone).await
    }
}
