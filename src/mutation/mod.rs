//! Applying a variant to a transcript's reference sequence
//!
//! All work happens in transcript orientation: on the minus strand the
//! alleles are reverse-complemented and the edit is anchored at the variant's
//! last genomic base, which is its first transcribed base.

use crate::coords::{CoordinateTransform, EditShift, Strand};
use crate::error::UltraError;
use crate::reference::{normalize_chrom, TranscriptUtr};
use crate::sequence::{as_str, reverse_complement};
use crate::variant::Variant;

/// A minimal edit in reference-local coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Reference-local index of the first replaced base
    pub pos: usize,
    /// Replaced bases (transcript orientation)
    pub reference: Vec<u8>,
    /// Inserted bases (transcript orientation)
    pub alternate: Vec<u8>,
}

impl Edit {
    /// Build an edit and trim the bases shared by both alleles
    pub fn trimmed(pos: usize, reference: &[u8], alternate: &[u8]) -> Self {
        let prefix = reference
            .iter()
            .zip(alternate)
            .take_while(|(r, a)| r == a)
            .count();
        let (reference, alternate) = (&reference[prefix..], &alternate[prefix..]);
        let suffix = reference
            .iter()
            .rev()
            .zip(alternate.iter().rev())
            .take_while(|(r, a)| r == a)
            .count();
        Self {
            pos: pos + prefix,
            reference: reference[..reference.len() - suffix].to_vec(),
            alternate: alternate[..alternate.len() - suffix].to_vec(),
        }
    }

    pub fn shift(&self) -> EditShift {
        EditShift::new(self.pos, self.reference.len(), self.alternate.len())
    }

    /// True when the alleles were identical
    pub fn is_noop(&self) -> bool {
        self.reference.is_empty() && self.alternate.is_empty()
    }
}

/// A transcript sequence with one variant applied
#[derive(Debug, Clone)]
pub struct MutatedContext<'a> {
    pub utr: &'a TranscriptUtr,
    /// Mutated transcript-orientation sequence
    pub sequence: Vec<u8>,
    pub edit: Edit,
    /// Reference-local index of the variant's first transcribed base
    pub variant_local: usize,
    transform: CoordinateTransform<'a>,
    cds_mut: usize,
}

impl<'a> MutatedContext<'a> {
    /// Reference sequence of the transcript
    pub fn reference(&self) -> &'a [u8] {
        &self.utr.sequence
    }

    pub fn transform(&self) -> &CoordinateTransform<'a> {
        &self.transform
    }

    /// CDS start in the reference sequence
    pub fn cds_ref(&self) -> usize {
        self.utr.cds_local()
    }

    /// CDS start in the mutated sequence
    pub fn cds_mut(&self) -> usize {
        self.cds_mut
    }

    /// Reading-frame shift introduced downstream of the edit
    pub fn frame_shift(&self) -> usize {
        self.transform.shift().frame_shift()
    }
}

/// Apply a variant to a transcript
///
/// Fails with [`UltraError::OutOfBoundsVariant`] when any REF base lies
/// outside the UTR exons, and with [`UltraError::ReferenceMismatch`] when the
/// REF allele disagrees with the transcript sequence.
pub fn simulate<'a>(
    utr: &'a TranscriptUtr,
    variant: &Variant,
) -> Result<MutatedContext<'a>, UltraError> {
    let out_of_bounds = || UltraError::OutOfBoundsVariant {
        variant: variant.to_string(),
        transcript: utr.transcript_id.clone(),
    };
    if normalize_chrom(&variant.chrom) != normalize_chrom(&utr.chrom) {
        return Err(out_of_bounds());
    }

    let exons = utr.exon_map();
    for genomic in variant.pos..=variant.end() {
        match exons.to_local(genomic) {
            Some(local) if local < utr.cds_local() => {}
            _ => return Err(out_of_bounds()),
        }
    }

    let (anchor, reference, alternate) = match utr.strand {
        Strand::Plus => (
            variant.pos,
            variant.reference.clone(),
            variant.alternate.clone(),
        ),
        Strand::Minus => (
            variant.end(),
            reverse_complement(&variant.reference),
            reverse_complement(&variant.alternate),
        ),
    };
    let local = exons.to_local(anchor).ok_or_else(out_of_bounds)?;

    let observed = &utr.sequence[local..local + reference.len()];
    if observed != reference.as_slice() {
        return Err(UltraError::ReferenceMismatch {
            location: format!("{}:{} ({})", variant.chrom, variant.pos, utr.transcript_id),
            expected: as_str(observed),
            found: as_str(&reference),
        });
    }

    let edit = Edit::trimmed(local, &reference, &alternate);
    let mut sequence = Vec::with_capacity(utr.sequence.len() + edit.alternate.len());
    sequence.extend_from_slice(&utr.sequence[..edit.pos]);
    sequence.extend_from_slice(&edit.alternate);
    sequence.extend_from_slice(&utr.sequence[edit.pos + edit.reference.len()..]);

    let transform = CoordinateTransform::new(exons, edit.shift());
    let cds_mut = transform
        .ref_to_mut(utr.cds_local())
        .ok_or_else(out_of_bounds)?;

    Ok(MutatedContext {
        utr,
        sequence,
        edit,
        variant_local: local,
        transform,
        cds_mut,
    })
}
