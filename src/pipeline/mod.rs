//! Per-variant annotation pipeline
//!
//! [`AnnotationContext`] holds every piece of read-only reference state and
//! is shared by all workers. [`Annotator::annotate`] turns one input row
//! into one [`AnnotatedVariant`]:
//!
//! 1. parse the variant (failures become `Unannotatable`)
//! 2. find the transcripts whose 5' UTR contains it
//! 3. simulate, detect, aggregate and score each transcript independently
//! 4. pick the primary candidate for the output row

use std::cmp::Ordering;
use std::path::Path;
use std::time::Instant;

use crate::config::DataPaths;
use crate::conservation::{ConservationLookup, ConservationSource};
use crate::effect::{Consequence, TranslationEffect};
use crate::error::UltraError;
use crate::features::{FeatureAggregator, FeatureRecord};
use crate::mutation::simulate;
use crate::reference::{GeneConstraints, ReferenceIndex, TranscriptUtr};
use crate::scoring::{RandomForest, Score, ScoringEngine};
use crate::splicing::{SplicingAnnotation, SplicingSource, SplicingTable};
use crate::uorf::detect;
use crate::variant::{InputRecord, Variant};

#[cfg(test)]
pub(crate) mod testing;

/// Shared reference state for annotation
pub struct AnnotationContext {
    pub index: ReferenceIndex,
    pub conservation: Box<dyn ConservationSource + Send + Sync>,
    pub constraints: GeneConstraints,
    pub splicing: Option<Box<dyn SplicingSource + Send + Sync>>,
    pub scoring: ScoringEngine,
}

impl AnnotationContext {
    /// Load every reference file under the data directory
    ///
    /// `splicing` names the predictor's output table and the delta-score
    /// cutoff. Any missing or malformed file is fatal.
    pub fn load(paths: &DataPaths, splicing: Option<(&Path, f64)>) -> Result<Self, UltraError> {
        let start = Instant::now();
        paths.verify()?;

        let index = ReferenceIndex::load(&paths.utrs, &paths.uorfs)?;
        let constraints = GeneConstraints::load(&paths.constraints)?;
        let forest = RandomForest::load(&paths.model)?;
        let splicing = match splicing {
            Some((path, cutoff)) => Some(Box::new(SplicingTable::load(path, cutoff)?)
                as Box<dyn SplicingSource + Send + Sync>),
            None => None,
        };

        log::info!(
            "Loaded reference data from {} in {:.2?}: {} transcripts, {} genes with constraint metrics, {} trees",
            paths.root.display(),
            start.elapsed(),
            index.len(),
            constraints.len(),
            forest.n_trees()
        );
        Ok(Self {
            index,
            conservation: Box::new(ConservationLookup::new(&paths.root)),
            constraints,
            splicing,
            scoring: ScoringEngine::new(Box::new(forest)),
        })
    }
}

/// One scored candidate consequence
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub record: FeatureRecord,
    /// None when the record could not be scored
    pub score: Option<Score>,
}

impl Candidate {
    pub fn probability(&self) -> Option<f64> {
        self.score.as_ref().map(|s| s.probability)
    }

    /// Ordering used to pick the primary candidate; greater is preferred
    fn preference(&self, other: &Self) -> Ordering {
        self.record
            .has_effect()
            .cmp(&other.record.has_effect())
            .then_with(|| match (self.probability(), other.probability()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
            .then_with(|| self.record.mane.cmp(&other.record.mane))
            .then_with(|| other.record.transcript_id.cmp(&self.record.transcript_id))
    }
}

/// Result of annotating one input row
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedVariant {
    pub input: InputRecord,
    /// None when the row could not be parsed
    pub variant: Option<Variant>,
    /// All candidates, in transcript then detection order
    pub candidates: Vec<Candidate>,
    primary: Option<usize>,
    /// Why the row is unannotatable, if it is
    pub error: Option<UltraError>,
}

impl AnnotatedVariant {
    fn unannotatable(input: InputRecord, variant: Option<Variant>, error: Option<UltraError>) -> Self {
        Self {
            input,
            variant,
            candidates: Vec::new(),
            primary: None,
            error,
        }
    }

    fn with_candidates(input: InputRecord, variant: Variant, candidates: Vec<Candidate>) -> Self {
        let primary = (0..candidates.len()).reduce(|best, i| {
            if candidates[i].preference(&candidates[best]) == Ordering::Greater {
                i
            } else {
                best
            }
        });
        Self {
            input,
            variant: Some(variant),
            candidates,
            primary,
            error: None,
        }
    }

    /// The candidate written to the output row
    pub fn primary(&self) -> Option<&Candidate> {
        self.primary.and_then(|i| self.candidates.get(i))
    }

    pub fn consequence(&self) -> Consequence {
        self.primary()
            .map(|c| c.record.consequence)
            .unwrap_or(Consequence::Unannotatable)
    }

    pub fn translation(&self) -> Option<TranslationEffect> {
        self.primary().and_then(|c| c.record.translation)
    }

    pub fn score(&self) -> Option<f64> {
        self.primary().and_then(Candidate::probability)
    }

    pub fn is_annotated(&self) -> bool {
        self.primary.is_some()
    }

    /// `transcript:CSQ` for every candidate, comma-separated
    pub fn all_consequences(&self) -> String {
        self.candidates
            .iter()
            .map(|c| format!("{}:{}", c.record.transcript_id, c.record.consequence))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Annotation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// Only annotate MANE Select transcripts
    pub mane_only: bool,
}

/// Annotates input rows against a shared context
pub struct Annotator<'a> {
    context: &'a AnnotationContext,
    options: AnnotateOptions,
}

impl<'a> Annotator<'a> {
    pub fn new(context: &'a AnnotationContext, options: AnnotateOptions) -> Self {
        Self { context, options }
    }

    pub fn context(&self) -> &'a AnnotationContext {
        self.context
    }

    /// Annotate one input row; never fails, every row yields one result
    pub fn annotate(&self, input: InputRecord) -> AnnotatedVariant {
        let variant = match Variant::parse(&input) {
            Ok(variant) => variant,
            Err(e) => {
                log::debug!("{}", e.detailed_message());
                return AnnotatedVariant::unannotatable(input, None, Some(e));
            }
        };

        let transcripts: Vec<&TranscriptUtr> = self
            .context
            .index
            .lookup_utr(&variant.chrom, variant.pos)
            .into_iter()
            .filter(|utr| !self.options.mane_only || utr.mane)
            .collect();
        if transcripts.is_empty() {
            log::debug!("{}: no overlapping 5' UTR", variant);
            return AnnotatedVariant::unannotatable(input, Some(variant), None);
        }

        let splicing = self
            .context
            .splicing
            .as_ref()
            .and_then(|source| source.lookup(&variant));

        let mut candidates = Vec::new();
        let mut last_error = None;
        for utr in transcripts {
            match self.annotate_transcript(&variant, utr, splicing.as_ref()) {
                Ok(mut found) => candidates.append(&mut found),
                Err(e) => {
                    log::debug!("{} on {}: {}", variant, utr.transcript_id, e.detailed_message());
                    last_error = Some(e);
                }
            }
        }

        if candidates.is_empty() {
            return AnnotatedVariant::unannotatable(input, Some(variant), last_error);
        }
        AnnotatedVariant::with_candidates(input, variant, candidates)
    }

    fn annotate_transcript(
        &self,
        variant: &Variant,
        utr: &TranscriptUtr,
        splicing: Option<&SplicingAnnotation>,
    ) -> Result<Vec<Candidate>, UltraError> {
        let ctx = simulate(utr, variant)?;
        let records = self.context.index.uorfs_for(&utr.transcript_id);
        let detection = detect(&ctx, records);
        let counts = self.context.index.uorf_counts(&utr.transcript_id);

        let aggregator =
            FeatureAggregator::new(self.context.conservation.as_ref(), &self.context.constraints);
        let candidates = aggregator
            .aggregate(&ctx, &detection, counts, splicing)
            .into_iter()
            .map(|record| {
                let score = match self.context.scoring.score(&record) {
                    Ok(score) => Some(score),
                    Err(e) => {
                        log::debug!(
                            "{} on {} ({}): score NA: {}",
                            variant,
                            utr.transcript_id,
                            record.consequence,
                            e.detailed_message()
                        );
                        None
                    }
                };
                Candidate { record, score }
            })
            .collect();
        Ok(candidates)
    }
}
