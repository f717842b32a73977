//! Graph query templates and their per-query instantiation.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::extraction::{ExtractedEntities, ResponseSchema};
use crate::integrations::GraphRow;
use crate::prompts::render;
use crate::retrieval::VectorIndex;
use crate::{Error, Result};

const BUILTIN_TEMPLATES: &str = include_str!("../config/graph_templates.yml");

/// Question/query/answer triple bound to one entity field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphTemplate {
    pub key: String,
    pub slot: String,
    pub question: String,
    pub cypher: String,
    pub answer: String,
}

impl GraphTemplate {
    fn slot_token(&self) -> String {
        format!("{{{}}}", self.slot)
    }

    /// Bind the slot to `value`.
    pub fn fill(&self, value: &str) -> FilledTemplate {
        let quoted = cypher_literal(value);
        FilledTemplate {
            key: self.key.clone(),
            question: render(&self.question, &[(self.slot.as_str(), value)]),
            cypher: render(&self.cypher, &[(self.slot.as_str(), quoted.as_str())]),
            answer: render(&self.answer, &[(self.slot.as_str(), value)]),
        }
    }
}

/// Escape a value placed inside a single-quoted Cypher string.
fn cypher_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Template with its slot bound to one extracted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledTemplate {
    pub key: String,
    pub question: String,
    pub cypher: String,
    pub answer: String,
}

impl FilledTemplate {
    /// Substitute the row's columns into the answer pattern.
    pub fn render_answer(&self, row: &GraphRow) -> String {
        let rendered = row.rendered();
        let vars: Vec<(&str, &str)> = rendered
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        render(&self.answer, &vars)
    }

    /// Evidence line fed to the graph answer prompt.
    pub fn evidence(&self, row: &GraphRow) -> String {
        format!("问题：{}\n答案：{}", self.question, self.render_answer(row))
    }
}

/// Per-query index of filled templates, searched by question similarity.
pub type TemplateIndex = VectorIndex<FilledTemplate>;

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    templates: Vec<GraphTemplate>,
}

/// Validated set of graph templates.
#[derive(Debug, Clone)]
pub struct TemplateCatalogue {
    templates: Vec<GraphTemplate>,
}

impl TemplateCatalogue {
    /// The compiled-in catalogue for the medical graph.
    pub fn builtin(schemas: &[ResponseSchema]) -> Result<Self> {
        Self::from_yaml(BUILTIN_TEMPLATES, schemas)
    }

    pub fn from_yaml(yaml: &str, schemas: &[ResponseSchema]) -> Result<Self> {
        let file: CatalogueFile = serde_yaml::from_str(yaml)?;
        Self::new(file.templates, schemas)
    }

    pub fn load(path: impl AsRef<Path>, schemas: &[ResponseSchema]) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read graph templates {}: {}",
                path.display(),
                e
            ))
        })?;
        let catalogue = Self::from_yaml(&yaml, schemas)?;
        info!(
            "Loaded {} graph templates from {}",
            catalogue.len(),
            path.display()
        );
        Ok(catalogue)
    }

    /// Custom catalogue when configured, built-in otherwise.
    pub fn from_config(config: &Config, schemas: &[ResponseSchema]) -> Result<Self> {
        match &config.graph_templates_path {
            Some(path) => Self::load(path, schemas),
            None => Self::builtin(schemas),
        }
    }

    pub fn new(templates: Vec<GraphTemplate>, schemas: &[ResponseSchema]) -> Result<Self> {
        let fields: HashSet<&str> = schemas.iter().map(|s| s.name).collect();
        let mut keys = HashSet::new();

        for template in &templates {
            if !keys.insert(template.key.as_str()) {
                return Err(Error::ConfigError(format!(
                    "duplicate graph template key '{}'",
                    template.key
                )));
            }
            if !fields.contains(template.slot.as_str()) {
                return Err(Error::ConfigError(format!(
                    "graph template '{}' binds unknown field '{}'",
                    template.key, template.slot
                )));
            }
            if !template.question.contains(&template.slot_token()) {
                return Err(Error::ConfigError(format!(
                    "graph template '{}' question lacks {}",
                    template.key,
                    template.slot_token()
                )));
            }
        }

        Ok(Self { templates })
    }

    pub fn templates(&self) -> &[GraphTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Every template bound to every extracted value of its field.
    ///
    /// Ordered by field (schema order), then template, then value.
    pub fn fill(
        &self,
        schemas: &[ResponseSchema],
        entities: &ExtractedEntities,
    ) -> Vec<FilledTemplate> {
        let mut filled = Vec::new();
        for schema in schemas {
            let values = entities.values(schema.name);
            for template in self.templates.iter().filter(|t| t.slot == schema.name) {
                for value in values.iter().filter(|v| !v.trim().is_empty()) {
                    filled.push(template.fill(value));
                }
            }
        }
        filled
    }
}
