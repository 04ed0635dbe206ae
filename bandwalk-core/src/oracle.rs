// Semantic relevance between a page and the subject

use crate::error::OracleError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub trait RelevanceOracle: Send + Sync {
    /// Similarity in `[-1, 1]` between the page `key` and `subject`.
    fn relevance(&self, key: &str, subject: &str) -> Result<f64, OracleError>;
}

/// Pre-computed entity and word vectors, compared by cosine similarity.
///
/// Loaded from JSON shaped as
/// `{"entities": {"Graph theory": [..]}, "words": {"graph": [..]}}`.
/// Pages are looked up among entities, the subject among words.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingTable {
    #[serde(default)]
    entities: HashMap<String, Vec<f64>>,
    #[serde(default)]
    words: HashMap<String, Vec<f64>>,
}

impl EmbeddingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, OracleError> {
        let raw = fs::read_to_string(path).map_err(|source| OracleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, OracleError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_entity(mut self, name: impl Into<String>, vector: Vec<f64>) -> Self {
        self.entities.insert(name.into(), vector);
        self
    }

    pub fn with_word(mut self, word: impl Into<String>, vector: Vec<f64>) -> Self {
        self.words.insert(word.into(), vector);
        self
    }
}

impl RelevanceOracle for EmbeddingTable {
    fn relevance(&self, key: &str, subject: &str) -> Result<f64, OracleError> {
        let entity = self
            .entities
            .get(key)
            .ok_or_else(|| OracleError::Unknown(key.to_string()))?;
        let word = self
            .words
            .get(subject)
            .ok_or_else(|| OracleError::Unknown(subject.to_string()))?;
        cosine(entity, word)
    }
}

fn cosine(a: &[f64], b: &[f64]) -> Result<f64, OracleError> {
    if a.len() != b.len() {
        return Err(OracleError::DimensionMismatch(a.len(), b.len()));
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norms = a.iter().map(|x| x * x).sum::<f64>().sqrt() * b.iter().map(|y| y * y).sum::<f64>().sqrt();
    if norms == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / norms).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table() -> EmbeddingTable {
        EmbeddingTable::new()
            .with_entity("Graph theory", vec![1.0, 0.0])
            .with_entity("Opera", vec![-1.0, 0.0])
            .with_entity("Tree", vec![1.0, 1.0])
            .with_word("graph", vec![2.0, 0.0])
    }

    #[test]
    fn test_relevance_is_cosine() {
        let oracle = table();
        assert!((oracle.relevance("Graph theory", "graph").unwrap() - 1.0).abs() < 1e-12);
        assert!((oracle.relevance("Opera", "graph").unwrap() + 1.0).abs() < 1e-12);
        let tree = oracle.relevance("Tree", "graph").unwrap();
        assert!((tree - 1.0 / 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_terms() {
        let oracle = table();
        assert!(matches!(
            oracle.relevance("Nowhere", "graph"),
            Err(OracleError::Unknown(k)) if k == "Nowhere"
        ));
        assert!(matches!(
            oracle.relevance("Tree", "botany"),
            Err(OracleError::Unknown(k)) if k == "botany"
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let oracle = EmbeddingTable::new()
            .with_entity("Tree", vec![1.0, 0.0, 0.0])
            .with_word("graph", vec![1.0, 0.0]);
        assert!(matches!(
            oracle.relevance("Tree", "graph"),
            Err(OracleError::DimensionMismatch(3, 2))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"entities": {{"Tree": [0.0, 1.0]}}, "words": {{"graph": [0.0, 3.0]}}}}"#
        )
        .unwrap();

        let oracle = EmbeddingTable::from_json_file(file.path()).unwrap();
        assert!((oracle.relevance("Tree", "graph").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            EmbeddingTable::from_json_str("{not json"),
            Err(OracleError::Parse(_))
        ));
    }
}
