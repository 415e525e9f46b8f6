//! Classifier scoring of feature records
//!
//! The classifier sits behind the [`Classifier`] trait; [`RandomForest`] is
//! the artifact-backed implementation. [`ScoringEngine`] encodes a record
//! with the classifier's [`FeatureSchema`] and reports the probability of the
//! positive (last) class.

pub mod encode;
pub mod forest;

use std::collections::HashMap;

use crate::error::UltraError;
use crate::features::FeatureRecord;

pub use encode::encode;
pub use forest::RandomForest;

/// Inputs a classifier expects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSchema {
    /// Feature names in model column order
    pub feature_names: Vec<String>,
    /// Consequence labels seen in training; empty accepts any
    pub csq_categories: Vec<String>,
    /// Values substituted for missing features
    pub impute: HashMap<String, f64>,
}

/// A pretrained classifier
pub trait Classifier: Send + Sync {
    fn schema(&self) -> &FeatureSchema;

    /// Class labels; the last one is the positive class
    fn classes(&self) -> &[String];

    /// Decision threshold on the positive class probability
    fn threshold(&self) -> f64;

    /// Class probabilities for one encoded row
    fn predict(&self, features: &[f64]) -> Result<Vec<f64>, UltraError>;
}

/// Score of one record
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Probability of the positive class
    pub probability: f64,
    /// Predicted class label
    pub label: String,
}

/// Applies a classifier to feature records
pub struct ScoringEngine {
    classifier: Box<dyn Classifier>,
}

impl ScoringEngine {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.classifier.schema()
    }

    /// Score one record
    ///
    /// Fails with [`UltraError::FeatureSchema`] when the record cannot be
    /// encoded; the caller keeps the annotation and reports the score as NA.
    pub fn score(&self, record: &FeatureRecord) -> Result<Score, UltraError> {
        let features = encode(record, self.classifier.schema())?;
        let probabilities = self.classifier.predict(&features)?;
        let classes = self.classifier.classes();
        let positive = classes.len().saturating_sub(1);
        let probability = probabilities
            .get(positive)
            .copied()
            .ok_or_else(|| UltraError::model("classifier returned no probabilities"))?;
        let label = if probability >= self.classifier.threshold() {
            classes.get(positive)
        } else {
            classes.first()
        };
        Ok(Score {
            probability,
            label: label.cloned().unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("features", &self.schema().feature_names.len())
            .field("classes", &self.classifier.classes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Strand;
    use crate::effect::{Consequence, TranslationEffect};
    use crate::kozak::KozakContext;
    use crate::reference::{GeneConstraint, UorfCounts};

    /// Returns the first feature as the positive probability
    struct Identity {
        schema: FeatureSchema,
        classes: Vec<String>,
    }

    impl Classifier for Identity {
        fn schema(&self) -> &FeatureSchema {
            &self.schema
        }

        fn classes(&self) -> &[String] {
            &self.classes
        }

        fn threshold(&self) -> f64 {
            0.5
        }

        fn predict(&self, features: &[f64]) -> Result<Vec<f64>, UltraError> {
            Ok(vec![1.0 - features[0], features[0]])
        }
    }

    fn engine(impute: Option<f64>) -> ScoringEngine {
        let mut schema = FeatureSchema {
            feature_names: vec!["pLI".to_string()],
            ..Default::default()
        };
        if let Some(value) = impute {
            schema.impute.insert("pLI".to_string(), value);
        }
        ScoringEngine::new(Box::new(Identity {
            schema,
            classes: vec!["neutral".to_string(), "deleterious".to_string()],
        }))
    }

    fn record(pli: Option<f64>) -> FeatureRecord {
        FeatureRecord {
            transcript_id: "NM_1.1".to_string(),
            gene: "G".to_string(),
            mane: false,
            strand: Strand::Minus,
            utr_start: 10,
            utr_end: 20,
            utr_length: 11,
            start_exon: Some(2),
            consequence: Consequence::NoEffect,
            translation: Some(TranslationEffect::Increased),
            main_kozak: KozakContext {
                window: None,
                strength: None,
            },
            counts: UorfCounts::default(),
            uorf: None,
            phylop: None,
            phastcons: None,
            constraint: GeneConstraint { pli, loeuf: None },
            splicing: None,
        }
    }

    #[test]
    fn test_score_labels() {
        let engine = engine(None);
        let score = engine.score(&record(Some(0.75))).unwrap();
        assert_eq!(score.probability, 0.75);
        assert_eq!(score.label, "deleterious");

        let score = engine.score(&record(Some(0.25))).unwrap();
        assert_eq!(score.label, "neutral");
    }

    #[test]
    fn test_score_imputes() {
        let score = engine(Some(0.6)).score(&record(None)).unwrap();
        assert_eq!(score.probability, 0.6);
    }

    #[test]
    fn test_score_schema_error() {
        let err = engine(None).score(&record(None)).unwrap_err();
        assert!(err.is_row_level());
    }
}
