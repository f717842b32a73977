//! Medical question-answering agent
//!
//! This library routes a natural-language medical question to one of four
//! answer strategies and returns the synthesized answer:
//! - generic chit-chat under identity and refusal rules
//! - retrieval over an indexed document corpus
//! - knowledge-graph lookup driven by extracted entities and query templates
//! - web search over a search-engine results page
//!
//! The text generator chooses the strategy; unrecognised choices fall back to
//! the generic strategy.

pub mod config;
pub mod conversation;
pub mod error;
pub mod extraction;
pub mod integrations;
pub mod metrics;
pub mod prompts;
pub mod retrieval;
pub mod router;
pub mod strategies;
pub mod templates;

// Re-export common types
pub use config::Config;
pub use conversation::{Conversation, Speaker, Turn};
pub use error::{Error, Result};
pub use extraction::{EntityExtractor, ExtractedEntities};
pub use integrations::{Embedder, PageFetcher, StructuredGraphStore, TextGenerator};
pub use prompts::{load_prompt, Prompt};
pub use router::{Answer, Selection, StrategyRouter};
pub use strategies::{AgentContext, AgentSettings, Strategy};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
