//! Conversation history and follow-up condensing.

use std::fmt;

use tracing::debug;

use crate::integrations::TextGenerator;
use crate::prompts::Prompt;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Human,
    Ai,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Human => f.write_str("Human"),
            Speaker::Ai => f.write_str("AI"),
        }
    }
}

/// One utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Human,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            text: text.into(),
        }
    }
}

/// Ordered history of a chat session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::human(question));
        self.turns.push(Turn::ai(answer));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Render the last `window` exchanges as `Speaker:text` lines.
pub fn format_history(history: &[Turn], window: usize) -> String {
    let start = history.len().saturating_sub(window.saturating_mul(2));
    history[start..]
        .iter()
        .map(|turn| format!("{}:{}", turn.speaker, turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrite a follow-up into a standalone question using recent history.
///
/// Empty history (or window) returns the query unchanged; an empty reply
/// falls back to the original query.
pub async fn condense(
    generator: &dyn TextGenerator,
    query: &str,
    history: &[Turn],
    window: usize,
) -> Result<String> {
    if history.is_empty() || window == 0 {
        return Ok(query.to_string());
    }

    let chat_history = format_history(history, window);
    let prompt = Prompt::Summary.render(&[
        ("chat_history", chat_history.as_str()),
        ("query", query),
    ]);
    let reply = generator.generate(&prompt).await?;
    let condensed = reply.trim();

    if condensed.is_empty() {
        return Ok(query.to_string());
    }
    debug!(original = %query, condensed = %condensed, "Condensed follow-up");
    Ok(condensed.to_string())
}
