//! Graph database integration with Neo4j

use async_trait::async_trait;
use neo4rs::{query, Graph};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::StructuredGraphStore;
use crate::config::Config;
use crate::{Error, Result};

/// One result row, columns in the order the query returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphRow {
    columns: Vec<(String, Value)>,
}

impl GraphRow {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// True when at least one column carries a non-null, non-empty value.
    ///
    /// A non-empty list counts as a value even if its elements are blank.
    pub fn has_value(&self) -> bool {
        self.columns.iter().any(|(_, value)| !is_blank(value))
    }

    /// Column values rendered as text, for answer substitution.
    pub fn rendered(&self) -> Vec<(String, String)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.clone(), render_value(value)))
            .collect()
    }
}

impl From<Map<String, Value>> for GraphRow {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            columns: map.into_iter().collect(),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !is_blank(v))
            .map(render_value)
            .collect::<Vec<_>>()
            .join("、"),
        other => other.to_string(),
    }
}

/// Graph store backed by Neo4j
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect to Neo4j server
    pub async fn new(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password).await?;
        info!(%uri, "Connected to Neo4j");

        Ok(Self { graph })
    }

    /// Connect using loaded configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        if config.neo4j_password.is_empty() {
            return Err(Error::ConfigError("NEO4J_PASSWORD not set".to_string()));
        }
        Self::new(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password).await
    }
}

#[async_trait]
impl StructuredGraphStore for Neo4jStore {
    async fn run(&self, statement: &str) -> Result<Vec<GraphRow>> {
        let mut stream = self.graph.execute(query(statement)).await?;
        let mut rows = Vec::new();

        while let Some(row) = stream.next().await? {
            let map: Map<String, Value> = row
                .to()
                .map_err(|e| Error::GraphError(format!("Failed to decode row: {}", e)))?;
            rows.push(GraphRow::from(map));
        }

        debug!("Cypher returned {} rows", rows.len());
        Ok(rows)
    }
}
