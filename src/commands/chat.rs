//! Interactive chat on stdin with conversation memory

use anyhow::Result;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::error;

use super::{FAILURE_REPLY, NO_ANSWER_REPLY};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::router::StrategyRouter;
use crate::strategies::AgentContext;

/// Input that ends the session.
fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "退出")
}

pub async fn run(config: &Config) -> Result<()> {
    let ctx = AgentContext::connect(config).await?;
    let router = StrategyRouter::new(ctx);
    let mut conversation = Conversation::new();

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    println!("医疗问诊机器人已启动，输入 exit 退出，/clear 清空对话。");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            _ = signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else { break };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit(query) {
            break;
        }
        if query == "/clear" {
            conversation.clear();
            println!("对话已清空。");
            continue;
        }

        match router.dispatch(query, conversation.turns()).await {
            Ok(answer) => {
                let text = answer.text.unwrap_or_else(|| NO_ANSWER_REPLY.to_string());
                println!("{}", text);
                conversation.push_exchange(query, text);
            }
            Err(err) => {
                error!("Dispatch failed: {}", err);
                println!("{}", FAILURE_REPLY);
            }
        }
    }

    Ok(())
}
