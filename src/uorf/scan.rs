//! Codon scanning over transcript sequences

use crate::effect::UorfType;

pub const START_CODON: &[u8; 3] = b"ATG";

/// TAA, TAG, TGA
pub const STOP_CODONS: [&[u8; 3]; 3] = [b"TAA", b"TAG", b"TGA"];

/// The codon starting at `pos`, if complete
pub fn codon_at(seq: &[u8], pos: usize) -> Option<&[u8]> {
    seq.get(pos..pos + 3)
}

pub fn is_stop(codon: &[u8]) -> bool {
    STOP_CODONS.iter().any(|s| s.as_slice() == codon)
}

pub fn is_start(codon: &[u8]) -> bool {
    codon == START_CODON.as_slice()
}

/// First in-frame stop codon after the start codon at `start`
///
/// Returns the index of the stop codon's first base.
pub fn first_in_frame_stop(seq: &[u8], start: usize) -> Option<usize> {
    (start + 3..)
        .step_by(3)
        .map_while(|pos| codon_at(seq, pos).map(|codon| (pos, codon)))
        .find(|(_, codon)| is_stop(codon))
        .map(|(pos, _)| pos)
}

/// Positions of every ATG starting before `limit`
pub fn atg_positions(seq: &[u8], limit: usize) -> Vec<usize> {
    (0..limit.min(seq.len()))
        .filter(|&pos| codon_at(seq, pos).is_some_and(is_start))
        .collect()
}

/// Type of a uORF starting at `start` with first in-frame stop `stop`
///
/// Returns None when the ORF is neither terminated before the end of the
/// sequence nor in frame with the CDS, which leaves it untranslatable for
/// annotation purposes.
pub fn classify(start: usize, stop: Option<usize>, cds: usize) -> Option<UorfType> {
    match stop {
        Some(p) if p + 3 <= cds => Some(UorfType::NonOverlapping),
        _ if cds > start && (cds - start) % 3 == 0 => Some(UorfType::NTerminalExtension),
        Some(_) => Some(UorfType::Overlapping),
        None => None,
    }
}

/// An open reading frame located in one sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orf {
    /// Index of the start codon's first base
    pub start: usize,
    /// Index of the stop codon's first base
    pub stop: Option<usize>,
    pub kind: UorfType,
}

impl Orf {
    /// Scan the ORF opened by the codon at `start`
    pub fn scan(seq: &[u8], start: usize, cds: usize) -> Option<Self> {
        let stop = first_in_frame_stop(seq, start);
        classify(start, stop, cds).map(|kind| Self { start, stop, kind })
    }

    /// Index of the last base of the stop codon
    pub fn end(&self) -> Option<usize> {
        self.stop.map(|p| p + 2)
    }

    /// Length in nucleotides
    ///
    /// An N-terminal extension runs up to the CDS start; an ORF without a stop
    /// codon has no defined length.
    pub fn length(&self, cds: usize) -> Option<usize> {
        match self.kind {
            UorfType::NTerminalExtension => Some(cds - self.start),
            _ => self.stop.map(|p| p + 3 - self.start),
        }
    }

    /// Length in codons
    pub fn aa_length(&self, cds: usize) -> Option<usize> {
        self.length(cds).map(|l| l / 3)
    }
}

/// Every ATG-initiated uORF upstream of the CDS start
pub fn scan_all(seq: &[u8], cds: usize) -> Vec<Orf> {
    atg_positions(seq, cds)
        .into_iter()
        .filter_map(|start| Orf::scan(seq, start, cds))
        .collect()
}
