//! Kozak consensus scoring
//!
//! The Kozak context of a start codon is the 9-nt window spanning −4..+5
//! (the A of the AUG is +1, there is no position 0). Strength depends on two
//! positions only: the purine at −3 (window index 1) and the G at +4
//! (window index 7).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sequence::is_acgt;

/// Length of a Kozak context window
pub const KOZAK_WINDOW: usize = 9;

/// Bases upstream of the start codon included in the window
const UPSTREAM: usize = 4;

/// Window index of the −3 position
const MINUS_THREE: usize = 1;

/// Window index of the +4 position
const PLUS_FOUR: usize = 7;

/// Kozak context strength, ordered weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KozakStrength {
    Weak,
    Adequate,
    Strong,
}

impl KozakStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            KozakStrength::Weak => "Weak",
            KozakStrength::Adequate => "Adequate",
            KozakStrength::Strong => "Strong",
        }
    }

    /// Parse a strength label as written in the reference tables
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Weak" | "weak" => Some(KozakStrength::Weak),
            "Adequate" | "adequate" => Some(KozakStrength::Adequate),
            "Strong" | "strong" => Some(KozakStrength::Strong),
            _ => None,
        }
    }
}

impl fmt::Display for KozakStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score a 9-nt window
///
/// Returns None for a window that is not exactly 9 nt or that contains a base
/// other than A, C, G, T.
///
/// # Examples
///
/// ```
/// use ferro_uorf::kozak::{kozak_strength, KozakStrength};
///
/// assert_eq!(kozak_strength(b"CACCATGGC"), Some(KozakStrength::Strong));
/// assert_eq!(kozak_strength(b"CACCATGTC"), Some(KozakStrength::Adequate));
/// assert_eq!(kozak_strength(b"CTCCATGTC"), Some(KozakStrength::Weak));
/// assert_eq!(kozak_strength(b"CACCATG"), None);
/// ```
pub fn kozak_strength(window: &[u8]) -> Option<KozakStrength> {
    if window.len() != KOZAK_WINDOW || !is_acgt(window) {
        return None;
    }
    let purine = matches!(window[MINUS_THREE], b'A' | b'G');
    let guanine = window[PLUS_FOUR] == b'G';
    Some(match (purine, guanine) {
        (true, true) => KozakStrength::Strong,
        (true, false) | (false, true) => KozakStrength::Adequate,
        (false, false) => KozakStrength::Weak,
    })
}

/// The Kozak window around a start codon at `start` (0-based), if complete
pub fn kozak_window(seq: &[u8], start: usize) -> Option<&[u8]> {
    let from = start.checked_sub(UPSTREAM)?;
    let to = from + KOZAK_WINDOW;
    seq.get(from..to)
}

/// Kozak context of one start codon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KozakContext {
    /// The 9-nt window, or None when it runs off the sequence
    pub window: Option<String>,
    /// Strength of the window
    pub strength: Option<KozakStrength>,
}

impl KozakContext {
    /// Context of the start codon at `start` in `seq`
    pub fn at(seq: &[u8], start: usize) -> Self {
        match kozak_window(seq, start) {
            Some(window) => Self {
                window: Some(String::from_utf8_lossy(window).into_owned()),
                strength: kozak_strength(window),
            },
            None => Self {
                window: None,
                strength: None,
            },
        }
    }

    fn key_bases(&self) -> Option<(u8, u8)> {
        let window = self.window.as_ref()?.as_bytes();
        Some((window[MINUS_THREE], window[PLUS_FOUR]))
    }
}

/// Direction of a Kozak strength change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KozakShift {
    Weakened,
    Strengthened,
}

/// Compare a reference and mutated context
///
/// A change is reported only when the −3 or +4 base differs and the strength
/// changes as a result. A context that becomes incomplete counts as weakened.
pub fn compare_contexts(reference: &KozakContext, mutated: &KozakContext) -> Option<KozakShift> {
    if reference.key_bases() == mutated.key_bases() {
        return None;
    }
    match (reference.strength, mutated.strength) {
        (Some(r), Some(m)) if m < r => Some(KozakShift::Weakened),
        (Some(r), Some(m)) if m > r => Some(KozakShift::Strengthened),
        (Some(_), None) => Some(KozakShift::Weakened),
        (None, Some(_)) => Some(KozakShift::Strengthened),
        _ => None,
    }
}
