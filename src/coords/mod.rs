//! Coordinate systems and transforms
//!
//! Three coordinate systems meet when a variant is applied to a transcript:
//!
//! | System | Basis | Meaning |
//! |--------|-------|---------|
//! | genomic | 1-based | VCF `POS`, reference table columns |
//! | reference-local | 0-based | index into the transcript sequence, from the cap |
//! | mutated-local | 0-based | index into the mutated transcript sequence |
//!
//! [`ExonMap`] converts genomic ↔ reference-local by walking the exon blocks
//! in transcript order (so minus-strand transcripts count down the genome),
//! [`EditShift`] converts reference-local ↔ mutated-local around a single
//! edit, and [`CoordinateTransform`] composes the two.
//!
//! # Examples
//!
//! ```
//! use ferro_uorf::coords::{CoordinateTransform, EditShift, ExonMap, Strand};
//!
//! // Two exons on the minus strand: 300..=309 and 100..=104
//! let exons = ExonMap::new(Strand::Minus, vec![(100, 104), (300, 309)]).unwrap();
//! assert_eq!(exons.len(), 15);
//! assert_eq!(exons.to_local(309), Some(0));
//! assert_eq!(exons.to_local(104), Some(10));
//! assert_eq!(exons.to_local(200), None); // intron
//!
//! // Deleting two bases at local 3 shifts everything downstream by -2
//! let shift = EditShift::new(3, 2, 0);
//! let transform = CoordinateTransform::new(&exons, shift);
//! assert_eq!(transform.genomic_to_mut(104), Some(8));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::UltraError;

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Strand {
    #[serde(rename = "+")]
    #[default]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

impl Strand {
    /// Parse a strand column value (`+`, `-`, `1`, `-1`)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "+" | "1" | "+1" => Some(Strand::Plus),
            "-" | "-1" => Some(Strand::Minus),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExonBlock {
    /// Genomic start (1-based, inclusive)
    start: u64,
    /// Genomic end (1-based, inclusive)
    end: u64,
    /// Reference-local index of the block's first transcribed base
    offset: usize,
}

impl ExonBlock {
    fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

/// Genomic ↔ reference-local mapping over a set of exon blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExonMap {
    strand: Strand,
    /// Blocks in transcript order
    blocks: Vec<ExonBlock>,
    len: usize,
}

impl ExonMap {
    /// Build a map from genomic exon blocks (1-based inclusive, any order)
    ///
    /// Blocks must be non-empty and must not overlap.
    pub fn new(strand: Strand, mut exons: Vec<(u64, u64)>) -> Result<Self, UltraError> {
        if exons.is_empty() {
            return Err(UltraError::reference_data("EXONS", "no exon blocks"));
        }
        exons.sort_unstable();
        for &(start, end) in &exons {
            if start == 0 || start > end {
                return Err(UltraError::reference_data(
                    "EXONS",
                    format!("invalid exon block {}-{}", start, end),
                ));
            }
        }
        for pair in exons.windows(2) {
            if pair[1].0 <= pair[0].1 {
                return Err(UltraError::reference_data(
                    "EXONS",
                    format!(
                        "overlapping exon blocks {}-{} and {}-{}",
                        pair[0].0, pair[0].1, pair[1].0, pair[1].1
                    ),
                ));
            }
        }
        if strand == Strand::Minus {
            exons.reverse();
        }

        let mut offset = 0;
        let blocks = exons
            .into_iter()
            .map(|(start, end)| {
                let block = ExonBlock { start, end, offset };
                offset += block.len();
                block
            })
            .collect();

        Ok(Self {
            strand,
            blocks,
            len: offset,
        })
    }

    /// Strand of the transcript
    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Total transcribed length covered by the blocks
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bases are covered (never true for a constructed map)
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of exon blocks
    pub fn exon_count(&self) -> usize {
        self.blocks.len()
    }

    /// Convert a genomic position to a reference-local index
    ///
    /// Returns None for intronic or flanking positions.
    pub fn to_local(&self, genomic: u64) -> Option<usize> {
        self.blocks
            .iter()
            .find(|b| b.start <= genomic && genomic <= b.end)
            .map(|b| match self.strand {
                Strand::Plus => b.offset + (genomic - b.start) as usize,
                Strand::Minus => b.offset + (b.end - genomic) as usize,
            })
    }

    /// Convert a reference-local index to a genomic position
    pub fn to_genomic(&self, local: usize) -> Option<u64> {
        let block = self.block_for(local)?;
        let delta = (local - block.offset) as u64;
        Some(match self.strand {
            Strand::Plus => block.start + delta,
            Strand::Minus => block.end - delta,
        })
    }

    /// 1-based exon number (transcript order) containing a local index
    pub fn exon_number(&self, local: usize) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| local >= b.offset && local < b.offset + b.len())
            .map(|i| i + 1)
    }

    /// Genomic span covered by the blocks (min, max)
    pub fn genomic_span(&self) -> (u64, u64) {
        let min = self.blocks.iter().map(|b| b.start).min().unwrap_or(0);
        let max = self.blocks.iter().map(|b| b.end).max().unwrap_or(0);
        (min, max)
    }

    fn block_for(&self, local: usize) -> Option<&ExonBlock> {
        self.blocks
            .iter()
            .find(|b| local >= b.offset && local < b.offset + b.len())
    }
}

/// Reference-local ↔ mutated-local mapping around one edit
///
/// The edit replaces `ref_len` bases starting at `pos` with `alt_len` bases.
/// Positions before the edit are unchanged, positions after it move by
/// `alt_len - ref_len`, and positions inside it map only when they fall in
/// the substituted (length-preserving) prefix of the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditShift {
    pos: usize,
    ref_len: usize,
    alt_len: usize,
}

impl EditShift {
    /// Create a shift for an edit at reference-local `pos`
    pub fn new(pos: usize, ref_len: usize, alt_len: usize) -> Self {
        Self {
            pos,
            ref_len,
            alt_len,
        }
    }

    /// Identity shift (no edit)
    pub fn identity() -> Self {
        Self::default()
    }

    /// Reference-local start of the edit
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of reference bases replaced
    pub fn ref_len(&self) -> usize {
        self.ref_len
    }

    /// Number of bases inserted in their place
    pub fn alt_len(&self) -> usize {
        self.alt_len
    }

    /// Length change introduced by the edit
    pub fn delta(&self) -> isize {
        self.alt_len as isize - self.ref_len as isize
    }

    /// Reading-frame shift (0, 1 or 2) downstream of the edit
    pub fn frame_shift(&self) -> usize {
        self.delta().rem_euclid(3) as usize
    }

    /// Map a reference-local index to the mutated sequence
    pub fn ref_to_mut(&self, x: usize) -> Option<usize> {
        Self::map(x, self.pos, self.ref_len, self.alt_len)
    }

    /// Map a mutated-local index back to the reference sequence
    pub fn mut_to_ref(&self, x: usize) -> Option<usize> {
        Self::map(x, self.pos, self.alt_len, self.ref_len)
    }

    /// Like [`mut_to_ref`](Self::mut_to_ref), but bases introduced by the
    /// edit snap to the first reference base at or after the edit
    pub fn mut_to_ref_clamped(&self, x: usize) -> usize {
        self.mut_to_ref(x)
            .unwrap_or_else(|| self.pos + self.ref_len.min(x.saturating_sub(self.pos)))
    }

    /// True when the edit touches any index in `[start, end)` (reference-local)
    ///
    /// A pure insertion touches the interval when it lands strictly inside it.
    pub fn touches(&self, start: usize, end: usize) -> bool {
        if self.ref_len == 0 {
            self.pos > start && self.pos < end
        } else {
            self.pos < end && self.pos + self.ref_len > start
        }
    }

    fn map(x: usize, pos: usize, from_len: usize, to_len: usize) -> Option<usize> {
        if x < pos {
            Some(x)
        } else if x >= pos + from_len {
            Some(x + to_len - from_len)
        } else if x - pos < from_len.min(to_len) {
            Some(x)
        } else {
            None
        }
    }
}

/// Composition of an [`ExonMap`] and an [`EditShift`]
#[derive(Debug, Clone, Copy)]
pub struct CoordinateTransform<'a> {
    exons: &'a ExonMap,
    shift: EditShift,
}

impl<'a> CoordinateTransform<'a> {
    /// Compose an exon map with an edit
    pub fn new(exons: &'a ExonMap, shift: EditShift) -> Self {
        Self { exons, shift }
    }

    /// The edit component
    pub fn shift(&self) -> EditShift {
        self.shift
    }

    /// The exon map component
    pub fn exons(&self) -> &'a ExonMap {
        self.exons
    }

    pub fn genomic_to_ref(&self, genomic: u64) -> Option<usize> {
        self.exons.to_local(genomic)
    }

    pub fn ref_to_genomic(&self, local: usize) -> Option<u64> {
        self.exons.to_genomic(local)
    }

    pub fn ref_to_mut(&self, local: usize) -> Option<usize> {
        self.shift.ref_to_mut(local)
    }

    pub fn mut_to_ref(&self, local: usize) -> Option<usize> {
        self.shift.mut_to_ref(local)
    }

    /// Genomic position to mutated-local index
    pub fn genomic_to_mut(&self, genomic: u64) -> Option<usize> {
        self.genomic_to_ref(genomic)
            .and_then(|local| self.ref_to_mut(local))
    }

    /// Mutated-local index to genomic position
    ///
    /// Bases introduced by the edit report the genomic position of the
    /// reference base they were inserted before.
    pub fn mut_to_genomic(&self, local: usize) -> Option<u64> {
        let reference = self.shift.mut_to_ref_clamped(local);
        self.ref_to_genomic(reference)
            .or_else(|| reference.checked_sub(1).and_then(|r| self.ref_to_genomic(r)))
    }
}
