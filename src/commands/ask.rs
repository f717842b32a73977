//! Answer a single question

use anyhow::Result;
use tracing::{error, info};

use super::{FAILURE_REPLY, NO_ANSWER_REPLY};
use crate::config::Config;
use crate::router::{Answer, StrategyRouter};
use crate::strategies::AgentContext;

/// Route one query and print the answer.
pub async fn run(config: &Config, query: &str) -> Result<Answer> {
    let ctx = AgentContext::connect(config).await?;
    let router = StrategyRouter::new(ctx);

    let answer = match router.route(query).await {
        Ok(answer) => answer,
        Err(err) => {
            error!("Dispatch failed: {}", err);
            println!("{}", FAILURE_REPLY);
            return Err(err.into());
        }
    };
    info!(
        strategy = %answer.strategy(),
        fallback = answer.selection.is_fallback(),
        "Answered"
    );

    println!("{}", answer.text.as_deref().unwrap_or(NO_ANSWER_REPLY));
    Ok(answer)
}
