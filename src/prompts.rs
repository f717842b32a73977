//! Prompt templates for every generation call the agent makes.
//!
//! Built-in templates are compiled in. Any of them can be replaced by a
//! Markdown file with the same name in the `prompts/` directory.

use std::path::PathBuf;

use tracing::debug;

use crate::{Error, Result};

/// Marker fed to synthesis prompts when no evidence was found.
pub const NOTHING_FOUND: &str = "没有查到";

const GENERIC_TPL: &str = "
1. 当你被人问起身份时，你必须用'{identity}'回答。
例如问题 [你好，你是谁，你是谁开发的，你和GPT有什么关系，你和OpenAI有什么关系]
2. 你必须拒绝讨论任何关于政治，色情，暴力相关的事件或者人物。
例如问题 [普京是谁，列宁的过错，如何杀人放火，打架群殴，如何跳楼，如何制造毒药]
3. 请用中文回答用户问题。
-----------
用户问题: {query}
-----------
回答：
";

const RETRIEVAL_TPL: &str = "
请根据以下检索结果，回答用户问题，不需要补充和联想内容。
检索结果中没有相关信息时，回复“不知道”。
----------
检索结果：{query_result}
----------
用户问题：{query}
-----------
回答：
";

const NER_TPL: &str = "
1、从以下用户输入的句子中，提取实体内容。
2、注意：根据用户输入的事实抽取内容，不要推理，不要补充信息。

{format_instructions}
------------
用户输入：{query}
------------
输出：
";

const GRAPH_TPL: &str = "
请根据以下检索结果，回答用户问题，不要发散和联想内容。
检索结果中没有相关信息时，回复“不知道”。
----------
检索结果：
{query_result}
----------
用户问题：{query}
-----------
回答：
";

const SEARCH_TPL: &str = "
请根据以下检索结果，回答用户问题，不要发散和联想内容。
检索结果中没有相关信息时，回复“不知道”。
----------
检索结果：{query_result}
----------
用户问题：{query}
-----------
回答：
";

const SUMMARY_TPL: &str = "
请结合以下历史对话信息，和用户消息，总结出一个简洁、完整的用户消息。
直接给出总结好的消息，不需要其他信息，适当补全句子中的主语等信息。
如果和历史对话消息没有关联，直接输出用户原始消息。
注意，仅补充内容，不能改变原消息的语义，和句式。

例如：
-----------
历史对话：
Human:鼻炎是什么引起的？
AI:鼻炎通常是由于感染引起。
用户消息：吃什么药好得快？
-----------
输出：得了鼻炎，吃什么药好得快？

-----------
历史对话：
{chat_history}
-----------
用户消息：{query}
-----------
输出：
";

const TOOL_SELECTION_TPL: &str = "
你有权限使用以下工具，请根据工具描述和用户数据，判断应该使用哪个工具，回复用户问题，直接输出工具名称即可。
-----------
{tools_description}
-----------
用户问题：{query}
-----------
输出：
";

/// Available prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Chit-chat with identity and refusal rules.
    Generic,
    /// Answer from retrieved passages.
    Retrieval,
    /// Named entity recognition with structured output.
    Ner,
    /// Answer from knowledge-graph evidence.
    Graph,
    /// Answer from a fetched search results page.
    Search,
    /// Condense conversation history into a standalone question.
    Summary,
    /// Pick one tool by name.
    ToolSelection,
}

impl Prompt {
    /// Override file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::Generic => "generic.md",
            Prompt::Retrieval => "retrieval.md",
            Prompt::Ner => "ner.md",
            Prompt::Graph => "graph.md",
            Prompt::Search => "search.md",
            Prompt::Summary => "summary.md",
            Prompt::ToolSelection => "tool_selection.md",
        }
    }

    /// Built-in template text.
    pub fn builtin(&self) -> &'static str {
        match self {
            Prompt::Generic => GENERIC_TPL,
            Prompt::Retrieval => RETRIEVAL_TPL,
            Prompt::Ner => NER_TPL,
            Prompt::Graph => GRAPH_TPL,
            Prompt::Search => SEARCH_TPL,
            Prompt::Summary => SUMMARY_TPL,
            Prompt::ToolSelection => TOOL_SELECTION_TPL,
        }
    }

    /// Template text: override file if present, built-in otherwise.
    pub fn template(&self) -> String {
        match load_prompt(self.filename()) {
            Ok(text) => {
                debug!("Using prompt override {}", self.filename());
                text
            }
            Err(_) => self.builtin().to_string(),
        }
    }

    /// Render the template with `{name}` placeholders substituted.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        render(&self.template(), vars)
    }
}

/// Substitute every `{name}` token with its value.
///
/// Replacement is exact and single-pass per variable; unknown tokens are left
/// untouched and values are never re-scanned for other variables.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        for (name, value) in vars {
            let token_len = name.len() + 2;
            if after.len() >= token_len
                && after[1..].starts_with(name)
                && after[1 + name.len()..].starts_with('}')
            {
                out.push_str(value);
                rest = &after[token_len..];
                continue 'scan;
            }
        }
        out.push('{');
        rest = &after[1..];
    }
    out.push_str(rest);
    out
}

/// Load a prompt override by file name.
pub fn load_prompt(filename: &str) -> Result<String> {
    let path = prompts_dir().join(filename);
    std::fs::read_to_string(&path).map_err(|e| {
        Error::InvalidArgument(format!("Failed to load prompt {}: {}", filename, e))
    })
}

/// Path to the prompt override directory.
pub fn prompts_dir() -> PathBuf {
    let candidates = [
        PathBuf::from("prompts"),
        PathBuf::from("../prompts"),
        PathBuf::from("../../prompts"),
    ];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

/// All prompts.
pub fn list_prompts() -> Vec<Prompt> {
    vec![
        Prompt::Generic,
        Prompt::Retrieval,
        Prompt::Ner,
        Prompt::Graph,
        Prompt::Search,
        Prompt::Summary,
        Prompt::ToolSelection,
    ]
}
