//! Error types for the medical QA agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Text generation error: {0}")]
    GenerationError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Entity extraction output does not match schema: {0}")]
    ExtractionFormat(String),

    #[error("Graph store error: {0}")]
    GraphError(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("Page fetch error: {0}")]
    FetchError(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<neo4rs::Error> for Error {
    fn from(err: neo4rs::Error) -> Self {
        Error::GraphError(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::VectorStoreError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_extraction_format() {
        let err = Error::ExtractionFormat("missing field `drug`".to_string());
        let msg = err.to_string();
        assert!(msg.contains("does not match schema"));
        assert!(msg.contains("drug"));
    }

    #[test]
    fn test_error_display_timeout() {
        let err = Error::Timeout {
            operation: "generation".to_string(),
            seconds: 30,
        };
        assert_eq!(err.to_string(), "generation timed out after 30s");
    }

    #[test]
    fn test_error_display_generation_error() {
        let err = Error::GenerationError("rate limit exceeded".to_string());
        assert!(err.to_string().contains("Text generation"));
        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn test_error_display_graph_error() {
        let err = Error::GraphError("connection refused".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Graph store error"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();

        assert!(matches!(err, Error::SerializationError(_)));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_error_from_serde_yaml() {
        let yaml_err = serde_yaml::from_str::<Vec<i32>>("{ invalid yaml [").unwrap_err();
        let err: Error = yaml_err.into();

        assert!(matches!(err, Error::SerializationError(_)));
    }

    #[test]
    fn test_error_all_variants_debug() {
        let variants: Vec<Error> = vec![
            Error::ConfigError("config".to_string()),
            Error::GenerationError("generation".to_string()),
            Error::EmbeddingError("embedding".to_string()),
            Error::ExtractionFormat("extraction".to_string()),
            Error::GraphError("graph".to_string()),
            Error::VectorStoreError("vector".to_string()),
            Error::FetchError("fetch".to_string()),
            Error::Timeout {
                operation: "op".to_string(),
                seconds: 1,
            },
            Error::InvalidArgument("arg".to_string()),
            Error::SerializationError("serial".to_string()),
        ];

        for err in variants {
            let debug_str = format!("{:?}", err);
            assert!(!debug_str.is_empty());
        }
    }
}
