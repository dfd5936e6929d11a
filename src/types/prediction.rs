//! Prediction result data structures

use crate::error::PredictError;
use crate::labels::ClassLabels;
use crate::models::scoring;
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;

/// One ranked class
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct ClassPrediction {
    /// Human-readable class label
    pub name: String,
    /// Probability in [0, 1]
    pub confidence: f64,
    /// Probability in [0, 100]
    pub percentage: f64,
}

impl ClassPrediction {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        let confidence = f64::from(confidence);
        Self {
            name: name.into(),
            confidence,
            percentage: confidence * 100.0,
        }
    }
}

/// Label -> probability for every class, kept in model output order.
///
/// Serializes as a JSON object whose keys follow the training label order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassConfidences(Vec<(String, f64)>);

impl ClassConfidences {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, confidence)| *confidence)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, confidence)| (name.as_str(), *confidence))
    }
}

impl Serialize for ClassConfidences {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, confidence)| (name, confidence)))
    }
}

/// Ranked view over one inference's probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Highest-probability class
    pub prediction: ClassPrediction,
    /// Top-k classes, highest first
    pub top_classes: Vec<ClassPrediction>,
    /// Every class with its probability
    pub all_predictions: ClassConfidences,
}

impl PredictionResult {
    /// Rank raw model scores.
    ///
    /// Applies softmax, then keeps the `top_k` best classes. The score count
    /// must match the label count.
    pub fn from_scores(
        labels: &ClassLabels,
        raw_scores: &[f32],
        top_k: usize,
    ) -> Result<Self, PredictError> {
        if raw_scores.len() != labels.len() {
            return Err(PredictError::ClassCountMismatch {
                expected: labels.len(),
                actual: raw_scores.len(),
            });
        }

        let probabilities = scoring::softmax(raw_scores);

        let top_classes: Vec<ClassPrediction> = scoring::top_k_indices(&probabilities, top_k.max(1))
            .into_iter()
            .filter_map(|idx| {
                labels
                    .get(idx)
                    .map(|name| ClassPrediction::new(name, probabilities[idx]))
            })
            .collect();

        let prediction = top_classes
            .first()
            .cloned()
            .ok_or_else(|| PredictError::Internal("no classes to rank".to_string()))?;

        let all_predictions = ClassConfidences(
            labels
                .iter()
                .zip(&probabilities)
                .map(|(name, &p)| (name.to_string(), f64::from(p)))
                .collect(),
        );

        Ok(Self {
            prediction,
            top_classes,
            all_predictions,
        })
    }
}

/// Body of a successful `/predict` response
#[derive(Debug, Clone, serde::Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: ClassPrediction,
    pub top_classes: Vec<ClassPrediction>,
    pub all_predictions: ClassConfidences,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            success: true,
            prediction: result.prediction,
            top_classes: result.top_classes,
            all_predictions: result.all_predictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_scores() -> Vec<f32> {
        vec![0.5, 4.0, -1.0, 2.5, 0.0, 3.0, 1.0, -2.0, 0.2]
    }

    #[test]
    fn test_ranking_against_default_labels() {
        let labels = ClassLabels::default();
        let result = PredictionResult::from_scores(&labels, &raw_scores(), 3).unwrap();

        assert_eq!(result.prediction.name, "Divlit Volkan Konileri");
        assert_eq!(result.top_classes.len(), 3);
        assert_eq!(result.top_classes[0], result.prediction);
        assert_eq!(result.top_classes[1].name, "Acısu Madensuyu ve Emir Kaplıcaları");
        assert_eq!(result.top_classes[2].name, "Lav Akıntıları");

        for pair in result.top_classes.windows(2) {
            assert!(pair[0].confidence > pair[1].confidence);
        }
        for class in &result.top_classes {
            assert!((class.percentage - class.confidence * 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_all_predictions_cover_every_class() {
        let labels = ClassLabels::default();
        let result = PredictionResult::from_scores(&labels, &raw_scores(), 3).unwrap();

        assert_eq!(result.all_predictions.len(), labels.len());
        assert!(result.all_predictions.iter().all(|(_, c)| (0.0..=1.0).contains(&c)));
        let total: f64 = result.all_predictions.iter().map(|(_, c)| c).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(
            result.all_predictions.get("Divlit Volkan Konileri"),
            Some(result.prediction.confidence)
        );
    }

    #[test]
    fn test_class_count_mismatch() {
        let labels = ClassLabels::default();
        let err = PredictionResult::from_scores(&labels, &[1.0, 2.0], 3).unwrap_err();
        assert!(matches!(
            err,
            PredictError::ClassCountMismatch {
                expected: 9,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_response_serialization_keeps_label_order() {
        let labels = ClassLabels::new(vec!["zeta".into(), "alpha".into(), "mid".into()]).unwrap();
        let result = PredictionResult::from_scores(&labels, &[0.0, 1.0, 2.0], 3).unwrap();
        let json = serde_json::to_string(&PredictionResponse::from(result)).unwrap();

        assert!(json.starts_with(r#"{"success":true,"prediction":{"name":"mid""#));
        let zeta = json.find(r#""zeta":"#).unwrap();
        let alpha = json.find(r#""alpha":"#).unwrap();
        let mid = json.rfind(r#""mid":"#).unwrap();
        assert!(zeta < alpha && alpha < mid);
    }
}
