//! Class label list for the landmark classifier

use std::collections::HashSet;
use thiserror::Error;

/// The nine landmark classes, in the exact order the model was trained with.
pub const DEFAULT_CLASS_LABELS: [&str; 9] = [
    "Peri Bacaları",
    "Divlit Volkan Konileri",
    "Bazalt Sütunları",
    "Lav Akıntıları",
    "Acısu Ofiyolitleri",
    "Acısu Madensuyu ve Emir Kaplıcaları",
    "Tarihi Kula Evleri",
    "Kurşunlu Camii",
    "Bilgilendirme Panoları",
];

/// Why a label list was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("class label list is empty")]
    Empty,
    #[error("class label at index {0} is blank")]
    Blank(usize),
    #[error("class label '{0}' appears more than once")]
    Duplicate(String),
}

/// Ordered, immutable list of class labels. Index `i` names output score `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl ClassLabels {
    /// Build a label list, rejecting empty, blank or duplicate labels.
    pub fn new(labels: Vec<String>) -> Result<Self, LabelError> {
        if labels.is_empty() {
            return Err(LabelError::Empty);
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(LabelError::Blank(idx));
            }
            if !seen.insert(label.as_str()) {
                return Err(LabelError::Duplicate(label.clone()));
            }
        }

        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CLASS_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_labels_in_training_order() {
        let labels = ClassLabels::default();
        assert_eq!(labels.len(), 9);
        assert_eq!(labels.get(0), Some("Peri Bacaları"));
        assert_eq!(labels.get(8), Some("Bilgilendirme Panoları"));
        assert_eq!(labels.get(9), None);
    }

    #[test]
    fn test_rejects_invalid_lists() {
        assert_eq!(ClassLabels::new(vec![]), Err(LabelError::Empty));
        assert_eq!(
            ClassLabels::new(vec!["a".into(), "  ".into()]),
            Err(LabelError::Blank(1))
        );
        assert_eq!(
            ClassLabels::new(vec!["a".into(), "b".into(), "a".into()]),
            Err(LabelError::Duplicate("a".into()))
        );
    }
}
