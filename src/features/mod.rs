//! Feature records
//!
//! A [`FeatureRecord`] gathers everything known about one candidate
//! consequence of a variant on one transcript: the change itself, the
//! affected uORF, Kozak contexts, conservation and gene-level covariates.
//! It is both the classifier input and the source of the full output row.

use crate::coords::Strand;
use crate::conservation::{ConservationSource, Track};
use crate::effect::{Consequence, TranslationEffect};
use crate::kozak::KozakContext;
use crate::mutation::MutatedContext;
use crate::reference::{GeneConstraint, GeneConstraints, UorfCounts};
use crate::splicing::SplicingAnnotation;
use crate::uorf::{Detection, Finding, UorfFeatures};

/// One scored candidate
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub transcript_id: String,
    pub gene: String,
    pub mane: bool,
    pub strand: Strand,
    pub utr_start: u64,
    pub utr_end: u64,
    pub utr_length: usize,
    pub start_exon: Option<usize>,
    pub consequence: Consequence,
    pub translation: Option<TranslationEffect>,
    /// Main start codon context in the mutated sequence
    pub main_kozak: KozakContext,
    /// Annotated uORFs on the transcript
    pub counts: UorfCounts,
    pub uorf: Option<UorfFeatures>,
    pub phylop: Option<f64>,
    pub phastcons: Option<f64>,
    pub constraint: GeneConstraint,
    pub splicing: Option<SplicingAnnotation>,
}

impl FeatureRecord {
    /// True when the candidate carries a uORF or Kozak change
    pub fn has_effect(&self) -> bool {
        self.consequence.has_effect()
    }
}

/// Builds feature records from detected changes
pub struct FeatureAggregator<'a> {
    conservation: &'a dyn ConservationSource,
    constraints: &'a GeneConstraints,
}

impl<'a> FeatureAggregator<'a> {
    pub fn new(conservation: &'a dyn ConservationSource, constraints: &'a GeneConstraints) -> Self {
        Self {
            conservation,
            constraints,
        }
    }

    /// One record per finding, or a single `No effect` record
    pub fn aggregate(
        &self,
        ctx: &MutatedContext<'_>,
        detection: &Detection,
        counts: UorfCounts,
        splicing: Option<&SplicingAnnotation>,
    ) -> Vec<FeatureRecord> {
        let base = FeatureRecord {
            transcript_id: ctx.utr.transcript_id.clone(),
            gene: ctx.utr.gene.clone(),
            mane: ctx.utr.mane,
            strand: ctx.utr.strand,
            utr_start: ctx.utr.utr_start,
            utr_end: ctx.utr.utr_end,
            utr_length: ctx.utr.utr_length(),
            start_exon: ctx.utr.start_exon(),
            consequence: Consequence::NoEffect,
            translation: None,
            main_kozak: detection.main_kozak.clone(),
            counts,
            uorf: None,
            phylop: None,
            phastcons: None,
            constraint: self.constraints.get(&ctx.utr.gene),
            splicing: splicing.cloned(),
        };

        if detection.is_empty() {
            return vec![base];
        }
        detection
            .findings
            .iter()
            .map(|finding| self.record(ctx, &base, finding))
            .collect()
    }

    fn record(
        &self,
        ctx: &MutatedContext<'_>,
        base: &FeatureRecord,
        finding: &Finding,
    ) -> FeatureRecord {
        let (phylop, phastcons) = match &finding.uorf {
            Some(uorf) => self.start_codon_conservation(ctx, finding.consequence, uorf),
            None => (None, None),
        };
        FeatureRecord {
            consequence: finding.consequence,
            translation: Some(finding.translation),
            uorf: finding.uorf.clone(),
            phylop,
            phastcons,
            ..base.clone()
        }
    }

    /// Mean PhyloP and PhastCons over the uORF start codon
    fn start_codon_conservation(
        &self,
        ctx: &MutatedContext<'_>,
        consequence: Consequence,
        uorf: &UorfFeatures,
    ) -> (Option<f64>, Option<f64>) {
        let transform = ctx.transform();
        let last = uorf.start_local + 2;
        // A lost start is located in the reference sequence
        let span = match consequence {
            Consequence::UStartLoss => transform
                .ref_to_genomic(uorf.start_local)
                .zip(transform.ref_to_genomic(last)),
            _ => transform
                .mut_to_genomic(uorf.start_local)
                .zip(transform.mut_to_genomic(last)),
        };
        let Some((first, last)) = span else {
            return (None, None);
        };
        let chrom = &ctx.utr.chrom;
        (
            self.conservation.mean_score(Track::PhyloP, chrom, first, last),
            self.conservation.mean_score(Track::PhastCons, chrom, first, last),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::UorfType;
    use crate::mutation::simulate;
    use crate::reference::{TranscriptUtr, UorfRecord};
    use crate::uorf::detect;
    use crate::variant::Variant;
    use std::collections::HashMap;

    /// Fixed score per track over a set of covered positions
    struct FixedScores {
        covered: Vec<u64>,
        scores: HashMap<Track, f64>,
    }

    impl ConservationSource for FixedScores {
        fn mean_score(&self, track: Track, _chrom: &str, start: u64, end: u64) -> Option<f64> {
            let (lo, hi) = (start.min(end), start.max(end));
            self.covered
                .iter()
                .any(|p| *p >= lo && *p <= hi)
                .then(|| self.scores[&track])
        }
    }

    fn utr() -> TranscriptUtr {
        TranscriptUtr::new(
            "NM_F.1",
            "GENEF",
            "chr2",
            Strand::Plus,
            1001,
            1023,
            1024,
            false,
            vec![(1001, 1035)],
            "GCCACCATGAAATAGCCACGACCATGGCCAAAGCC",
        )
        .unwrap()
    }

    fn constraints() -> GeneConstraints {
        let mut constraints = GeneConstraints::new();
        constraints.insert(
            "GENEF",
            GeneConstraint {
                pli: Some(0.9),
                loeuf: Some(0.25),
            },
        );
        constraints
    }

    fn counts() -> UorfCounts {
        UorfCounts {
            total: 1,
            overlapping: 0,
            n_terminal: 0,
            non_overlapping: 1,
        }
    }

    #[test]
    fn test_no_effect_record() {
        let utr = utr();
        let ctx = simulate(&utr, &Variant::new("chr2", 1002, ".", "C", "A")).unwrap();
        let detection = detect(&ctx, &[]);
        let scores = FixedScores {
            covered: vec![],
            scores: HashMap::new(),
        };
        let constraints = constraints();
        let records = FeatureAggregator::new(&scores, &constraints).aggregate(
            &ctx,
            &detection,
            counts(),
            None,
        );
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.consequence, Consequence::NoEffect);
        assert!(!record.has_effect());
        assert_eq!(record.translation, None);
        assert_eq!(record.utr_length, 23);
        assert_eq!(record.start_exon, Some(1));
        assert_eq!(record.constraint.pli, Some(0.9));
    }

    #[test]
    fn test_gain_record_conservation() {
        let utr = utr();
        let ctx = simulate(&utr, &Variant::new("chr2", 1019, ".", "C", "T")).unwrap();
        let detection = detect(&ctx, &[]);
        let scores = FixedScores {
            covered: vec![1019],
            scores: HashMap::from([(Track::PhyloP, 3.5), (Track::PhastCons, 0.75)]),
        };
        let constraints = constraints();
        let records = FeatureAggregator::new(&scores, &constraints).aggregate(
            &ctx,
            &detection,
            counts(),
            None,
        );
        // Without annotated uORFs the reference ATG at 6 is also unannotated,
        // but it is not new, so only the created start is reported.
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.consequence, Consequence::UStartGain);
        assert_eq!(record.translation, Some(TranslationEffect::NTerminalExtension));
        assert_eq!(record.uorf.as_ref().map(|u| u.kind), Some(UorfType::NTerminalExtension));
        assert_eq!(record.phylop, Some(3.5));
        assert_eq!(record.phastcons, Some(0.75));
    }

    #[test]
    fn test_missing_conservation_is_na() {
        let utr = utr();
        let record = UorfRecord::new(
            &utr,
            1007,
            Some(1015),
            UorfType::NonOverlapping,
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        let ctx = simulate(&utr, &Variant::new("chr2", 1008, ".", "T", "C")).unwrap();
        let detection = detect(&ctx, std::slice::from_ref(&record));
        let scores = FixedScores {
            covered: vec![],
            scores: HashMap::new(),
        };
        let constraints = GeneConstraints::new();
        let records = FeatureAggregator::new(&scores, &constraints).aggregate(
            &ctx,
            &detection,
            counts(),
            None,
        );
        assert_eq!(records[0].consequence, Consequence::UStartLoss);
        assert_eq!(records[0].phylop, None);
        assert_eq!(records[0].phastcons, None);
        assert_eq!(records[0].constraint, GeneConstraint::default());
    }
}
