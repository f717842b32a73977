//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod ask;
pub mod chat;
pub mod index;

/// Shown when the chosen strategy found nothing to answer with.
pub const NO_ANSWER_REPLY: &str = "抱歉，没有找到相关的答案。";

/// Shown when a dispatch fails.
pub const FAILURE_REPLY: &str = "抱歉，服务暂时不可用，请稍后再试。";

pub use ask::run as ask_run;
pub use chat::run as chat_run;
pub use index::{run as index_run, IndexResult};
