//! In-memory fixtures for annotation tests

use crate::conservation::{ConservationSource, Track};
use crate::coords::Strand;
use crate::error::UltraError;
use crate::pipeline::AnnotationContext;
use crate::reference::{GeneConstraints, ReferenceIndex, TranscriptUtr};
use crate::scoring::{Classifier, FeatureSchema, ScoringEngine};

/// Conservation source with no coverage anywhere
pub(crate) struct NoScores;

impl ConservationSource for NoScores {
    fn mean_score(&self, _: Track, _: &str, _: u64, _: u64) -> Option<f64> {
        None
    }
}

/// Classifier with no features returning a fixed positive probability
pub(crate) struct ConstantModel {
    schema: FeatureSchema,
    classes: Vec<String>,
    probability: f64,
}

impl ConstantModel {
    pub(crate) fn new(probability: f64) -> Self {
        Self {
            schema: FeatureSchema::default(),
            classes: vec!["neutral".to_string(), "deleterious".to_string()],
            probability,
        }
    }
}

impl Classifier for ConstantModel {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn threshold(&self) -> f64 {
        0.5
    }

    fn predict(&self, _: &[f64]) -> Result<Vec<f64>, UltraError> {
        Ok(vec![1.0 - self.probability, self.probability])
    }
}

/// One plus-strand MANE transcript on chr2
///
/// UTR 101..120 is `GCGC...GCGCCACC`; the CDS ATG starts at 121. Every odd
/// position from 101 to 115 holds a G.
pub(crate) fn single_transcript_context(probability: f64) -> AnnotationContext {
    let mut index = ReferenceIndex::new();
    let utr = TranscriptUtr::new(
        "NM_P.1",
        "GENEP",
        "chr2",
        Strand::Plus,
        101,
        120,
        121,
        true,
        vec![(101, 130)],
        "GCGCGCGCGCGCGCGCCACCATGGCGCGCG",
    )
    .unwrap();
    index.add_transcript(utr).unwrap();
    AnnotationContext {
        index,
        conservation: Box::new(NoScores),
        constraints: GeneConstraints::new(),
        splicing: None,
        scoring: ScoringEngine::new(Box::new(ConstantModel::new(probability))),
    }
}
