//! Label vocabularies for the classifier's two output heads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a vocabulary fails construction-time validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("{0} vocabulary must not be empty")]
    Empty(&'static str),
    #[error("{0} vocabulary contains duplicate label '{1}'")]
    DuplicateLabel(&'static str, String),
}

/// Fixed set of recognizable part identities.
///
/// The label order defines the index space of every part probability vector
/// produced by the classifier; the set itself carries no ordering semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartVocabulary {
    labels: Vec<String>,
}

impl PartVocabulary {
    pub fn new(labels: Vec<String>) -> Result<Self, VocabularyError> {
        validate_labels("part", &labels)?;
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at a classifier output index.
    ///
    /// Callers index with positions taken from a probability vector that has
    /// already been validated against this vocabulary.
    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }
}

/// Condition labels with a total severity order.
///
/// Index 0 is the least severe state and the highest index the most severe.
/// This order is what the severity-priority aggregation policy keys on, so it
/// is fixed at startup and never reordered afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateVocabulary {
    labels: Vec<String>,
}

impl StateVocabulary {
    pub fn new(labels: Vec<String>) -> Result<Self, VocabularyError> {
        validate_labels("state", &labels)?;
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at a classifier output index.
    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }

    /// Severity rank of a label; higher means more severe.
    pub fn severity(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

fn validate_labels(head: &'static str, labels: &[String]) -> Result<(), VocabularyError> {
    if labels.is_empty() {
        return Err(VocabularyError::Empty(head));
    }
    let mut seen = std::collections::HashSet::new();
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(VocabularyError::DuplicateLabel(head, label.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_state_severity_follows_index_order() {
        let states =
            StateVocabulary::new(labels(&["optimo", "desgaste", "corrosion", "ruptura"])).unwrap();

        assert_eq!(states.severity("optimo"), Some(0));
        assert_eq!(states.severity("ruptura"), Some(3));
        assert!(states.severity("ruptura") > states.severity("corrosion"));
        assert_eq!(states.severity("unknown"), None);
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        assert_eq!(
            PartVocabulary::new(Vec::new()).unwrap_err(),
            VocabularyError::Empty("part")
        );
        assert_eq!(
            StateVocabulary::new(Vec::new()).unwrap_err(),
            VocabularyError::Empty("state")
        );
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = StateVocabulary::new(labels(&["optimo", "optimo"])).unwrap_err();
        assert_eq!(
            err,
            VocabularyError::DuplicateLabel("state", "optimo".to_string())
        );
    }

    #[test]
    fn test_label_lookup() {
        let parts = PartVocabulary::new(labels(&["impulsor", "valvula"])).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts.label(1), "valvula");
    }
}
