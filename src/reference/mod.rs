//! Reference data
//!
//! Transcript 5' UTR models, annotated uORFs and gene constraint metrics,
//! loaded once per run from tab-separated tables in the data directory.

pub mod constraint;
pub mod index;
pub mod utr;

pub use crate::coords::Strand;
pub use constraint::{GeneConstraint, GeneConstraints};
pub use index::{normalize_chrom, ReferenceIndex, UorfCounts};
pub use utr::{parse_exons, TranscriptUtr, UorfRecord};
