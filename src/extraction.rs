//! Named entity extraction through the text generator.
//!
//! The generator is asked for a fenced JSON object with one string list per
//! declared field. The reply is decoded strictly: a missing field, an extra
//! field or a value that is not a list of strings is an
//! [`Error::ExtractionFormat`].

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::integrations::TextGenerator;
use crate::prompts::Prompt;
use crate::{Error, Result};

/// Value kind a schema field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    StringList,
}

impl FieldKind {
    fn label(&self) -> &'static str {
        match self {
            FieldKind::StringList => "list",
        }
    }
}

/// One field of the structured extraction reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

pub const DISEASE: &str = "disease";
pub const SYMPTOM: &str = "symptom";
pub const DRUG: &str = "drug";

/// The declared fields, in prompt order.
pub fn default_schemas() -> Vec<ResponseSchema> {
    vec![
        ResponseSchema {
            name: DISEASE,
            kind: FieldKind::StringList,
            description: "疾病名称实体",
        },
        ResponseSchema {
            name: SYMPTOM,
            kind: FieldKind::StringList,
            description: "疾病症状实体",
        },
        ResponseSchema {
            name: DRUG,
            kind: FieldKind::StringList,
            description: "药品名称实体",
        },
    ]
}

/// Instructions telling the model how to shape its reply.
pub fn format_instructions(schemas: &[ResponseSchema]) -> String {
    let mut text = String::from(
        "请从以下文本中，抽取出实体信息，并按json格式输出，json包含首尾的 \"```json\" 和 \"```\"。\n\
         以下是字段含义和类型，要求输出json中，必须包含下列所有字段：\n",
    );
    for schema in schemas {
        text.push_str(&format!(
            "{} 字段，表示：{}，类型为：{}\n",
            schema.name,
            schema.description,
            schema.kind.label()
        ));
    }
    text
}

/// Entities found in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedEntities {
    pub disease: Vec<String>,
    pub symptom: Vec<String>,
    pub drug: Vec<String>,
}

impl ExtractedEntities {
    /// Values extracted for a schema field; unknown fields have none.
    pub fn values(&self, field: &str) -> &[String] {
        match field {
            DISEASE => &self.disease,
            SYMPTOM => &self.symptom,
            DRUG => &self.drug,
            _ => &[],
        }
    }

    pub fn total(&self) -> usize {
        self.disease.len() + self.symptom.len() + self.drug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Pull the JSON payload out of a reply, preferring a ```json fenced block.
fn json_payload(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_fence = &trimmed[start + 3..];
    let body = after_fence
        .strip_prefix("json")
        .or_else(|| after_fence.strip_prefix("JSON"))
        .unwrap_or(after_fence);

    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Decode a model reply against the entity schema.
pub fn parse_entities(reply: &str) -> Result<ExtractedEntities> {
    let payload = json_payload(reply);
    if payload.is_empty() {
        return Err(Error::ExtractionFormat("empty reply".to_string()));
    }

    serde_json::from_str(payload).map_err(|e| Error::ExtractionFormat(e.to_string()))
}

/// Turns a free-text query into disease / symptom / drug lists.
pub struct EntityExtractor {
    generator: Arc<dyn TextGenerator>,
    schemas: Vec<ResponseSchema>,
}

impl EntityExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            schemas: default_schemas(),
        }
    }

    pub fn schemas(&self) -> &[ResponseSchema] {
        &self.schemas
    }

    pub async fn extract(&self, query: &str) -> Result<ExtractedEntities> {
        let instructions = format_instructions(&self.schemas);
        let prompt = Prompt::Ner.render(&[
            ("format_instructions", instructions.as_str()),
            ("query", query),
        ]);

        let reply = self.generator.generate(&prompt).await?;
        let entities = parse_entities(&reply)?;
        debug!(
            disease = ?entities.disease,
            symptom = ?entities.symptom,
            drug = ?entities.drug,
            "Extracted entities"
        );
        Ok(entities)
    }
}
