//! Upstream open reading frames
//!
//! Scanning of start and stop codons, ranking, and detection of the changes
//! a variant makes to a transcript's uORFs.

pub mod detect;
pub mod rank;
pub mod scan;

pub use detect::{detect, Detection, Finding, UorfFeatures};
pub use rank::{assign_ranks, RankKey};
pub use scan::{classify, first_in_frame_stop, scan_all, Orf};
