//! Random forest classifier loaded from a JSON artifact
//!
//! ```json
//! {
//!   "feature_names": ["Translation", "uORF_LENGTH", "CSQ_uStart_gain"],
//!   "classes": ["benign", "deleterious"],
//!   "categories": {"CSQ": ["uStart_gain", "uStart_loss"]},
//!   "impute": {"uORF_LENGTH": 30.0},
//!   "threshold": 0.5,
//!   "trees": [
//!     {"feature": 1, "threshold": 20.0,
//!      "left": {"leaf": [0.2, 0.8]},
//!      "right": {"leaf": [0.9, 0.1]}}
//!   ]
//! }
//! ```
//!
//! A row goes left at a split when its value is at or below the threshold.
//! Leaf values are per-class weights; each tree's leaf is normalised and the
//! forest averages the trees.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::UltraError;
use crate::scoring::encode::{is_known_feature, CSQ_PREFIX};
use crate::scoring::{Classifier, FeatureSchema};

/// Default decision threshold on the positive class probability
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// A decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Leaf {
        leaf: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn evaluate(&self, features: &[f64]) -> &[f64] {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { leaf } => return leaf,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), UltraError> {
        match self {
            Node::Leaf { leaf } => {
                if leaf.len() != n_classes {
                    return Err(UltraError::model(format!(
                        "leaf has {} values for {} classes",
                        leaf.len(),
                        n_classes
                    )));
                }
                if leaf.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(UltraError::model("leaf values must be finite and non-negative"));
                }
                if leaf.iter().sum::<f64>() <= 0.0 {
                    return Err(UltraError::model("leaf values sum to zero"));
                }
                Ok(())
            }
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= n_features {
                    return Err(UltraError::model(format!(
                        "split on feature {} but the model has {} features",
                        feature, n_features
                    )));
                }
                if threshold.is_nan() {
                    return Err(UltraError::model("split threshold is NaN"));
                }
                left.validate(n_features, n_classes)?;
                right.validate(n_features, n_classes)
            }
        }
    }
}

/// Serialized form of the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    #[serde(default)]
    pub categories: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub impute: HashMap<String, f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    pub trees: Vec<Node>,
}

/// A validated random forest
#[derive(Debug, Clone)]
pub struct RandomForest {
    schema: FeatureSchema,
    classes: Vec<String>,
    threshold: f64,
    trees: Vec<Node>,
}

impl RandomForest {
    /// Load and validate an artifact file
    pub fn load(path: &Path) -> Result<Self, UltraError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => UltraError::MissingReferenceData {
                path: path.display().to_string(),
            },
            _ => UltraError::from(e),
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate an artifact
    pub fn from_json(text: &str) -> Result<Self, UltraError> {
        let artifact: ForestArtifact = serde_json::from_str(text)
            .map_err(|e| UltraError::model(format!("invalid artifact: {}", e)))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self, UltraError> {
        let ForestArtifact {
            feature_names,
            classes,
            mut categories,
            impute,
            threshold,
            trees,
        } = artifact;

        if classes.len() < 2 {
            return Err(UltraError::model("at least two classes are required"));
        }
        if trees.is_empty() {
            return Err(UltraError::model("forest has no trees"));
        }
        if let Some(unknown) = feature_names.iter().find(|n| !is_known_feature(n)) {
            return Err(UltraError::model(format!("unknown feature '{}'", unknown)));
        }
        let csq_categories = categories.remove("CSQ").unwrap_or_default();
        if let Some(orphan) = feature_names
            .iter()
            .filter_map(|n| n.strip_prefix(CSQ_PREFIX))
            .find(|c| !csq_categories.is_empty() && !csq_categories.iter().any(|k| k == c))
        {
            return Err(UltraError::model(format!(
                "one-hot column for unlisted CSQ category '{}'",
                orphan
            )));
        }
        let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(UltraError::model(format!("threshold {} outside [0, 1]", threshold)));
        }
        for tree in &trees {
            tree.validate(feature_names.len(), classes.len())?;
        }

        log::debug!(
            "Loaded random forest: {} trees, {} features, classes {:?}",
            trees.len(),
            feature_names.len(),
            classes
        );
        Ok(Self {
            schema: FeatureSchema {
                feature_names,
                csq_categories,
                impute,
            },
            classes,
            threshold,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn predict(&self, features: &[f64]) -> Result<Vec<f64>, UltraError> {
        if features.len() != self.schema.feature_names.len() {
            return Err(UltraError::feature_schema(
                "*",
                format!(
                    "expected {} features, got {}",
                    self.schema.feature_names.len(),
                    features.len()
                ),
            ));
        }
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.evaluate(features);
            let sum: f64 = leaf.iter().sum();
            for (total, value) in totals.iter_mut().zip(leaf) {
                *total += value / sum;
            }
        }
        let n = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }
}
