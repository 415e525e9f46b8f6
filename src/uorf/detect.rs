//! Detection of uORF and Kozak changes caused by one variant
//!
//! Changes are reported in a fixed order: the main start codon's Kozak
//! context first, then newly created start codons from the cap, then each
//! annotated uORF in cap order (start loss, stop change, Kozak change).

use super::rank::{assign_ranks, RankKey};
use super::scan::{atg_positions, classify, codon_at, first_in_frame_stop, is_start, Orf};
use crate::effect::{Consequence, TranslationEffect, UorfType};
use crate::kozak::{compare_contexts, KozakContext, KozakShift};
use crate::mutation::MutatedContext;
use crate::reference::UorfRecord;
use crate::sequence::as_str;

/// Properties of the uORF behind one finding
#[derive(Debug, Clone, PartialEq)]
pub struct UorfFeatures {
    /// Index of the start codon (mutated sequence, or reference for a lost start)
    pub start_local: usize,
    pub genomic_start: Option<u64>,
    pub genomic_end: Option<u64>,
    pub kind: UorfType,
    /// Length in nucleotides
    pub length: Option<usize>,
    pub aa_length: Option<usize>,
    /// Distance from the start codon to the CDS start codon
    pub cds_distance: usize,
    pub kozak: KozakContext,
    /// Stop codon, or `OLD > NEW` when the stop changed
    pub stop_codon: Option<String>,
    pub rank: Option<usize>,
    pub ribo_seq: Option<bool>,
}

impl UorfFeatures {
    /// Distance from the cap to the start codon
    pub fn cap_distance(&self) -> usize {
        self.start_local
    }
}

/// One detected change
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub consequence: Consequence,
    pub translation: TranslationEffect,
    /// The affected uORF; None for a change at the main start codon
    pub uorf: Option<UorfFeatures>,
}

/// Everything detected for one variant on one transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub findings: Vec<Finding>,
    /// Kozak context of the main start codon in the mutated sequence
    pub main_kozak: KozakContext,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Detect every change the variant makes to the transcript's uORFs
///
/// `records` are the transcript's annotated uORFs in cap order.
pub fn detect(ctx: &MutatedContext<'_>, records: &[UorfRecord]) -> Detection {
    let mutated = ctx.sequence.as_slice();
    let cds_mut = ctx.cds_mut();
    let mut findings = Vec::new();

    let main_kozak = KozakContext::at(mutated, cds_mut);
    if let Some(shift) = compare_contexts(&ctx.utr.main_kozak(), &main_kozak) {
        let translation = match shift {
            KozakShift::Weakened => TranslationEffect::Decreased,
            KozakShift::Strengthened => TranslationEffect::Increased,
        };
        findings.push(Finding {
            consequence: Consequence::MKozak,
            translation,
            uorf: None,
        });
    }

    let located: Vec<Option<usize>> = records.iter().map(|rec| locate_start(ctx, rec)).collect();
    let gains: Vec<Orf> = atg_positions(mutated, cds_mut)
        .into_iter()
        .filter(|&m| !is_preexisting(ctx, records, m))
        .filter_map(|m| Orf::scan(mutated, m, cds_mut))
        .collect();

    let (intact_ranks, gain_ranks) = mutated_ranks(ctx, records, &located, &gains);
    let reference_ranks = assign_ranks(
        &records
            .iter()
            .map(|rec| RankKey {
                cds_distance: ctx.cds_ref().saturating_sub(rec.start_local()),
                cap_distance: rec.start_local(),
                genomic_start: rec.start,
            })
            .collect::<Vec<_>>(),
    );

    for (orf, rank) in gains.iter().zip(gain_ranks) {
        let genomic_start = ctx.transform().mut_to_genomic(orf.start);
        let features = mutated_features(ctx, orf.start, orf.kind, genomic_start, Some(rank), None);
        findings.push(Finding {
            consequence: Consequence::UStartGain,
            translation: TranslationEffect::for_gained_uorf(orf.kind),
            uorf: Some(features),
        });
    }

    for (idx, rec) in records.iter().enumerate() {
        let Some(m) = located[idx] else {
            findings.push(Finding {
                consequence: Consequence::UStartLoss,
                translation: TranslationEffect::Increased,
                uorf: Some(reference_features(ctx, rec, reference_ranks[idx])),
            });
            continue;
        };
        let rank = intact_ranks[idx];

        if let Some(finding) = stop_change(ctx, rec, m, rank) {
            findings.push(finding);
        }

        let reference_kozak = KozakContext::at(ctx.reference(), rec.start_local());
        let mutated_kozak = KozakContext::at(mutated, m);
        if let Some(shift) = compare_contexts(&reference_kozak, &mutated_kozak) {
            let translation = match shift {
                KozakShift::Weakened => TranslationEffect::Increased,
                KozakShift::Strengthened => TranslationEffect::Decreased,
            };
            let features =
                mutated_features(ctx, m, rec.uorf_type, Some(rec.start), rank, rec.ribo_seq);
            findings.push(Finding {
                consequence: Consequence::UKozak,
                translation,
                uorf: Some(features),
            });
        }
    }

    log::debug!(
        "{}: {} change(s) across {} annotated uORF(s)",
        ctx.utr.transcript_id,
        findings.len(),
        records.len()
    );
    Detection {
        findings,
        main_kozak,
    }
}

/// Position of an annotated start codon in the mutated sequence, or None
/// when the variant destroyed it
fn locate_start(ctx: &MutatedContext<'_>, rec: &UorfRecord) -> Option<usize> {
    let s = rec.start_local();
    let m = ctx.transform().ref_to_mut(s)?;
    let codon = codon_at(&ctx.sequence, m)?;
    let unchanged = codon_at(ctx.reference(), s) == Some(codon);
    (unchanged || codon == rec.start_codon.as_bytes() || is_start(codon)).then_some(m)
}

/// True when the ATG at mutated index `m` already opened a uORF in the reference
fn is_preexisting(ctx: &MutatedContext<'_>, records: &[UorfRecord], m: usize) -> bool {
    let t = ctx.transform();
    let Some(r) = t.mut_to_ref(m) else {
        return false;
    };
    if records.iter().any(|rec| rec.start_local() == r) {
        return true;
    }
    t.mut_to_ref(m + 1) == Some(r + 1)
        && t.mut_to_ref(m + 2) == Some(r + 2)
        && codon_at(ctx.reference(), r).is_some_and(is_start)
}

/// Ranks of the intact annotated uORFs (by record) and of the gained ones
fn mutated_ranks(
    ctx: &MutatedContext<'_>,
    records: &[UorfRecord],
    located: &[Option<usize>],
    gains: &[Orf],
) -> (Vec<Option<usize>>, Vec<usize>) {
    let cds_mut = ctx.cds_mut();
    let key = |m: usize, genomic_start: u64| RankKey {
        cds_distance: cds_mut.saturating_sub(m),
        cap_distance: m,
        genomic_start,
    };

    let mut keys: Vec<RankKey> = records
        .iter()
        .zip(located)
        .filter_map(|(rec, m)| m.map(|m| key(m, rec.start)))
        .collect();
    let intact = keys.len();
    keys.extend(gains.iter().map(|orf| {
        key(
            orf.start,
            ctx.transform().mut_to_genomic(orf.start).unwrap_or_default(),
        )
    }));

    let ranks = assign_ranks(&keys);
    let mut intact_ranks = ranks[..intact].iter();
    let by_record: Vec<Option<usize>> = located
        .iter()
        .map(|m| m.and_then(|_| intact_ranks.next().copied()))
        .collect();
    (by_record, ranks[intact..].to_vec())
}

/// Features of a uORF starting at mutated index `m`
///
/// `fallback` is the type used when the ORF neither stops nor runs in frame
/// into the CDS.
fn mutated_features(
    ctx: &MutatedContext<'_>,
    m: usize,
    fallback: UorfType,
    genomic_start: Option<u64>,
    rank: Option<usize>,
    ribo_seq: Option<bool>,
) -> UorfFeatures {
    let mutated = ctx.sequence.as_slice();
    let cds = ctx.cds_mut();
    let stop = first_in_frame_stop(mutated, m);
    let orf = Orf {
        start: m,
        stop,
        kind: classify(m, stop, cds).unwrap_or(fallback),
    };
    UorfFeatures {
        start_local: m,
        genomic_start,
        genomic_end: orf.end().and_then(|e| ctx.transform().mut_to_genomic(e)),
        kind: orf.kind,
        length: orf.length(cds),
        aa_length: orf.aa_length(cds),
        cds_distance: cds.saturating_sub(m),
        kozak: KozakContext::at(mutated, m),
        stop_codon: stop.and_then(|p| codon_at(mutated, p)).map(as_str),
        rank,
        ribo_seq,
    }
}

/// Features of an annotated uORF as it stands in the reference
fn reference_features(ctx: &MutatedContext<'_>, rec: &UorfRecord, rank: usize) -> UorfFeatures {
    let reference = ctx.reference();
    let cds = ctx.cds_ref();
    let s = rec.start_local();
    let stop = first_in_frame_stop(reference, s);
    let orf = Orf {
        start: s,
        stop,
        kind: rec.uorf_type,
    };
    UorfFeatures {
        start_local: s,
        genomic_start: Some(rec.start),
        genomic_end: rec
            .end
            .or_else(|| orf.end().and_then(|e| ctx.transform().ref_to_genomic(e))),
        kind: rec.uorf_type,
        length: orf.length(cds),
        aa_length: orf.aa_length(cds),
        cds_distance: cds.saturating_sub(s),
        kozak: KozakContext::at(reference, s),
        stop_codon: rec
            .stop_codon
            .clone()
            .or_else(|| stop.and_then(|p| codon_at(reference, p)).map(as_str)),
        rank: Some(rank),
        ribo_seq: rec.ribo_seq,
    }
}

/// Stop gain or loss of an annotated uORF whose start survived at `m`
fn stop_change(
    ctx: &MutatedContext<'_>,
    rec: &UorfRecord,
    m: usize,
    rank: Option<usize>,
) -> Option<Finding> {
    let s = rec.start_local();
    let old_stop = first_in_frame_stop(ctx.reference(), s);
    let new_stop = first_in_frame_stop(&ctx.sequence, m);
    let unchanged = match old_stop {
        Some(p) => ctx
            .transform()
            .ref_to_mut(p)
            .is_some_and(|mapped| new_stop == Some(mapped)),
        None => new_stop.is_none(),
    };
    if unchanged {
        return None;
    }

    let old = Orf {
        start: s,
        stop: old_stop,
        kind: rec.uorf_type,
    };
    let mut features = mutated_features(
        ctx,
        m,
        UorfType::Overlapping,
        Some(rec.start),
        rank,
        rec.ribo_seq,
    );
    if features.length == old.length(ctx.cds_ref()) && features.kind == old.kind {
        return None;
    }

    let gained = match (new_stop, old_stop) {
        (Some(n), Some(o)) => n - m < o - s,
        (Some(_), None) => true,
        _ => false,
    };
    let to = features.kind;
    let type_changed = to != old.kind;
    let consequence = if gained {
        Consequence::UStopGain { to, type_changed }
    } else {
        Consequence::UStopLoss { to, type_changed }
    };

    let old_codon = old_stop
        .and_then(|p| codon_at(ctx.reference(), p))
        .map(as_str);
    features.stop_codon = match (old_codon, features.stop_codon.take()) {
        (Some(o), Some(n)) => Some(format!("{} > {}", o, n)),
        (o, n) => o.or(n),
    };

    Some(Finding {
        consequence,
        translation: TranslationEffect::for_stop_change(old.kind, to, gained),
        uorf: Some(features),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Strand;
    use crate::kozak::KozakStrength;
    use crate::mutation::simulate;
    use crate::reference::TranscriptUtr;
    use crate::uorf::scan::scan_all;
    use crate::variant::Variant;

    // cap  0         1         2         3
    //      01234567890123456789012345678901234
    //      GCCACCATGAAATAGCCACGACCATGGCCAAAGCC
    //            uuuuuuuuu        mmm
    // Genomic 1001..=1035 on +, uORF 1007..=1015, CDS at 1024.
    const SEQ: &str = "GCCACCATGAAATAGCCACGACCATGGCCAAAGCC";

    fn utr() -> TranscriptUtr {
        TranscriptUtr::new(
            "NM_T.1",
            "GENE",
            "chr7",
            Strand::Plus,
            1001,
            1023,
            1024,
            true,
            vec![(1001, 1035)],
            SEQ,
        )
        .unwrap()
    }

    fn records(utr: &TranscriptUtr) -> Vec<UorfRecord> {
        vec![UorfRecord::new(
            utr,
            1007,
            Some(1015),
            UorfType::NonOverlapping,
            Some("CACCATGAA".to_string()),
            Some(1),
            Some(true),
            None,
            Some("TAG".to_string()),
        )
        .unwrap()]
    }

    fn run(pos: u64, reference: &str, alternate: &str) -> Detection {
        let utr = utr();
        let records = records(&utr);
        let variant = Variant::new("chr7", pos, ".", reference, alternate);
        let ctx = simulate(&utr, &variant).unwrap();
        detect(&ctx, &records)
    }

    fn labels(detection: &Detection) -> Vec<String> {
        detection
            .findings
            .iter()
            .map(|f| f.consequence.label())
            .collect()
    }

    #[test]
    fn test_no_effect() {
        let detection = run(1002, "C", "A");
        assert!(detection.is_empty());
        assert_eq!(detection.main_kozak.strength, Some(KozakStrength::Strong));
    }

    #[test]
    fn test_upstream_insertion_shifts_without_effect() {
        let detection = run(1002, "C", "CT");
        assert!(detection.is_empty());
    }

    #[test]
    fn test_start_loss() {
        let detection = run(1008, "T", "C");
        assert_eq!(labels(&detection), vec!["uStart_loss"]);
        let finding = &detection.findings[0];
        assert_eq!(finding.translation, TranslationEffect::Increased);
        let uorf = finding.uorf.as_ref().unwrap();
        assert_eq!(uorf.rank, Some(1));
        assert_eq!(uorf.genomic_start, Some(1007));
        assert_eq!(uorf.genomic_end, Some(1015));
        assert_eq!(uorf.length, Some(9));
        assert_eq!(uorf.cds_distance, 17);
        assert_eq!(uorf.ribo_seq, Some(true));
    }

    #[test]
    fn test_stop_gain_shorter() {
        let detection = run(1010, "A", "T");
        assert_eq!(labels(&detection), vec!["uStop_gain shorter Non-overlapping"]);
        let finding = &detection.findings[0];
        assert_eq!(finding.translation, TranslationEffect::Increased);
        let uorf = finding.uorf.as_ref().unwrap();
        assert_eq!(uorf.length, Some(6));
        assert_eq!(uorf.aa_length, Some(2));
        assert_eq!(uorf.stop_codon.as_deref(), Some("TAG > TAA"));
        assert_eq!(uorf.genomic_end, Some(1012));
    }

    #[test]
    fn test_deletion_extends_into_cds_frame() {
        // Deleting locals 10..=11 removes the stop from the uORF frame and
        // puts the uORF in frame with the CDS.
        let detection = run(1010, "AAA", "A");
        assert_eq!(labels(&detection), vec!["uStop_loss to N-terminal extension"]);
        let finding = &detection.findings[0];
        assert_eq!(finding.translation, TranslationEffect::NTerminalExtension);
        let uorf = finding.uorf.as_ref().unwrap();
        assert_eq!(uorf.kind, UorfType::NTerminalExtension);
        assert_eq!(uorf.length, Some(15));
        assert_eq!(uorf.stop_codon.as_deref(), Some("TAG"));
    }

    #[test]
    fn test_deletion_inside_stop_codon() {
        // Deleting the T of TAG leaves no in-frame stop before the CDS.
        let detection = run(1012, "AT", "A");
        assert_eq!(labels(&detection), vec!["uStop_loss to Overlapping"]);
        let uorf = detection.findings[0].uorf.as_ref().unwrap();
        assert_eq!(uorf.kind, UorfType::Overlapping);
        assert_eq!(uorf.stop_codon.as_deref(), Some("TAG"));
        assert_eq!(
            detection.findings[0].translation,
            TranslationEffect::for_stop_change(UorfType::NonOverlapping, UorfType::Overlapping, false)
        );
    }

    #[test]
    fn test_start_gain() {
        // ACG at 17 becomes ATG, in frame with the CDS
        let detection = run(1019, "C", "T");
        assert_eq!(labels(&detection), vec!["uStart_gain"]);
        let finding = &detection.findings[0];
        assert_eq!(finding.translation, TranslationEffect::NTerminalExtension);
        let uorf = finding.uorf.as_ref().unwrap();
        assert_eq!(uorf.kind, UorfType::NTerminalExtension);
        assert_eq!(uorf.rank, Some(1));
        assert_eq!(uorf.length, Some(6));
        assert_eq!(uorf.cds_distance, 6);
        assert_eq!(uorf.cap_distance(), 17);
        assert_eq!(uorf.genomic_start, Some(1018));
        assert_eq!(uorf.ribo_seq, None);
    }

    #[test]
    fn test_main_kozak_weakened() {
        let detection = run(1021, "A", "C");
        assert_eq!(labels(&detection), vec!["mKozak"]);
        assert_eq!(detection.findings[0].translation, TranslationEffect::Decreased);
        assert!(detection.findings[0].uorf.is_none());
        assert_eq!(detection.main_kozak.strength, Some(KozakStrength::Adequate));
    }

    #[test]
    fn test_uorf_kozak_weakened() {
        let detection = run(1004, "A", "T");
        assert_eq!(labels(&detection), vec!["uKozak"]);
        let finding = &detection.findings[0];
        assert_eq!(finding.translation, TranslationEffect::Increased);
        let uorf = finding.uorf.as_ref().unwrap();
        assert_eq!(uorf.kozak.strength, Some(KozakStrength::Weak));
        assert_eq!(uorf.kind, UorfType::NonOverlapping);
    }

    #[test]
    fn test_simultaneous_start_gain_and_stop_loss() {
        // TAG at 12 becomes TGG and AT at 11 gains a G: a new ATG opens in
        // the CDS frame while the annotated uORF loses its stop.
        let detection = run(1014, "A", "G");
        assert_eq!(
            labels(&detection),
            vec!["uStart_gain", "uStop_loss to Overlapping"]
        );

        let gain = &detection.findings[0];
        assert_eq!(gain.translation, TranslationEffect::NTerminalExtension);
        let gained = gain.uorf.as_ref().unwrap();
        assert_eq!(gained.start_local, 11);
        assert_eq!(gained.rank, Some(1));

        let loss = &detection.findings[1];
        assert_eq!(loss.translation, TranslationEffect::Decreased);
        let extended = loss.uorf.as_ref().unwrap();
        assert_eq!(extended.rank, Some(2));
        assert_eq!(extended.length, None);
        assert_eq!(extended.stop_codon.as_deref(), Some("TAG"));
    }

    #[test]
    fn test_reference_rescan_restores_reference_orfs() {
        let utr = utr();
        let variant = Variant::new("chr7", 1019, ".", "C", "T");
        let ctx = simulate(&utr, &variant).unwrap();
        let mutated = scan_all(&ctx.sequence, ctx.cds_mut());
        let reference = scan_all(&utr.sequence, utr.cds_local());
        assert_eq!(mutated.len(), reference.len() + 1);
        let without_gain: Vec<usize> = mutated
            .iter()
            .filter(|orf| orf.start != 17)
            .map(|orf| orf.start)
            .collect();
        let reference_starts: Vec<usize> = reference.iter().map(|orf| orf.start).collect();
        assert_eq!(without_gain, reference_starts);
    }
}
