//! Consequence vocabulary for 5' UTR variants.
//!
//! A consequence names what happened to a uORF or to the main start codon
//! context; a translation effect names the expected direction of change in
//! translation of the main coding sequence.
//!
//! # Example
//!
//! ```
//! use ferro_uorf::effect::{Consequence, TranslationEffect, UorfType};
//!
//! let csq = Consequence::UStopLoss {
//!     to: UorfType::NTerminalExtension,
//!     type_changed: true,
//! };
//! assert_eq!(csq.label(), "uStop_loss to N-terminal extension");
//!
//! let effect = TranslationEffect::for_stop_change(
//!     UorfType::NonOverlapping,
//!     UorfType::NTerminalExtension,
//!     false,
//! );
//! assert_eq!(effect, TranslationEffect::NTerminalExtension);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a uORF relative to the main coding sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UorfType {
    /// Stop codon ends before the main start codon.
    NonOverlapping,
    /// Reads through the main start codon in a different frame.
    Overlapping,
    /// In frame with the main coding sequence, no intervening stop.
    NTerminalExtension,
}

impl UorfType {
    /// Label used in output columns and consequence names.
    pub fn label(&self) -> &'static str {
        match self {
            UorfType::NonOverlapping => "Non-overlapping",
            UorfType::Overlapping => "Overlapping",
            UorfType::NTerminalExtension => "N-terminal extension",
        }
    }

    /// Parse a type label as written in the reference tables.
    ///
    /// Case, separators and the common abbreviations are tolerated.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "nonoverlapping" | "non" | "nonoverlap" => Some(UorfType::NonOverlapping),
            "overlapping" | "overlap" | "ouorf" => Some(UorfType::Overlapping),
            "nterminalextension" | "nterminal" | "nte" => Some(UorfType::NTerminalExtension),
            _ => None,
        }
    }
}

impl fmt::Display for UorfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Expected change in translation of the main coding sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TranslationEffect {
    Increased,
    Decreased,
    /// The main protein gains an N-terminal extension.
    NTerminalExtension,
}

impl TranslationEffect {
    pub fn label(&self) -> &'static str {
        match self {
            TranslationEffect::Increased => "increased",
            TranslationEffect::Decreased => "decreased",
            TranslationEffect::NTerminalExtension => "N-terminal extension",
        }
    }

    /// Effect of a uORF whose stop codon moved from `from` type to `to` type.
    ///
    /// `shorter` only matters when the type is unchanged.
    pub fn for_stop_change(from: UorfType, to: UorfType, shorter: bool) -> Self {
        use UorfType::*;
        match (from, to) {
            (_, NTerminalExtension) => TranslationEffect::NTerminalExtension,
            (Overlapping, NonOverlapping) => TranslationEffect::Increased,
            (NTerminalExtension, NonOverlapping) => TranslationEffect::Decreased,
            (NonOverlapping, Overlapping) | (NTerminalExtension, Overlapping) => {
                TranslationEffect::Decreased
            }
            _ if shorter => TranslationEffect::Increased,
            _ => TranslationEffect::Decreased,
        }
    }

    /// Effect of a newly created uORF of the given type.
    pub fn for_gained_uorf(kind: UorfType) -> Self {
        match kind {
            UorfType::NTerminalExtension => TranslationEffect::NTerminalExtension,
            _ => TranslationEffect::Decreased,
        }
    }
}

impl fmt::Display for TranslationEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Consequence of a variant on one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consequence {
    /// A new upstream ATG opens a uORF.
    UStartGain,
    /// The start codon of an annotated uORF is destroyed.
    UStartLoss,
    /// The uORF stop moves upstream.
    UStopGain { to: UorfType, type_changed: bool },
    /// The uORF stop moves downstream or disappears.
    UStopLoss { to: UorfType, type_changed: bool },
    /// Kozak context strength of a uORF start changes.
    UKozak,
    /// Kozak context strength of the main start codon changes.
    MKozak,
    /// No uORF or Kozak change detected.
    NoEffect,
    /// The variant could not be placed on any transcript.
    Unannotatable,
}

impl Consequence {
    /// Label written to the CSQ column.
    pub fn label(&self) -> String {
        match self {
            Consequence::UStartGain => "uStart_gain".to_string(),
            Consequence::UStartLoss => "uStart_loss".to_string(),
            Consequence::UStopGain {
                to,
                type_changed: true,
            } => format!("uStop_gain to {}", to),
            Consequence::UStopGain {
                to,
                type_changed: false,
            } => format!("uStop_gain shorter {}", to),
            Consequence::UStopLoss {
                to,
                type_changed: true,
            } => format!("uStop_loss to {}", to),
            Consequence::UStopLoss {
                to,
                type_changed: false,
            } => format!("uStop_loss longer {}", to),
            Consequence::UKozak => "uKozak".to_string(),
            Consequence::MKozak => "mKozak".to_string(),
            Consequence::NoEffect => "No effect".to_string(),
            Consequence::Unannotatable => "Unannotatable".to_string(),
        }
    }

    /// Short description of the consequence.
    pub fn description(&self) -> &'static str {
        match self {
            Consequence::UStartGain => "upstream start codon created",
            Consequence::UStartLoss => "upstream start codon destroyed",
            Consequence::UStopGain { .. } => "upstream stop codon moved upstream",
            Consequence::UStopLoss { .. } => "upstream stop codon moved downstream or lost",
            Consequence::UKozak => "uORF Kozak context altered",
            Consequence::MKozak => "main start codon Kozak context altered",
            Consequence::NoEffect => "no uORF or Kozak change",
            Consequence::Unannotatable => "variant could not be annotated",
        }
    }

    /// True for any consequence other than `No effect` and `Unannotatable`.
    pub fn has_effect(&self) -> bool {
        !matches!(self, Consequence::NoEffect | Consequence::Unannotatable)
    }
}

impl fmt::Display for Consequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Non-Overlapping", Some(UorfType::NonOverlapping))]
    #[case("non_overlapping", Some(UorfType::NonOverlapping))]
    #[case("Overlapping", Some(UorfType::Overlapping))]
    #[case("N-terminal extension", Some(UorfType::NTerminalExtension))]
    #[case("NTE", Some(UorfType::NTerminalExtension))]
    #[case("", None)]
    #[case("bogus", None)]
    fn test_uorf_type_parse(#[case] s: &str, #[case] expected: Option<UorfType>) {
        assert_eq!(UorfType::parse(s), expected);
    }

    #[test]
    fn test_uorf_type_parse_label_round_trip() {
        for kind in [
            UorfType::NonOverlapping,
            UorfType::Overlapping,
            UorfType::NTerminalExtension,
        ] {
            assert_eq!(UorfType::parse(kind.label()), Some(kind));
        }
    }

    #[rstest]
    #[case(Consequence::UStartGain, "uStart_gain")]
    #[case(Consequence::UStartLoss, "uStart_loss")]
    #[case(Consequence::UStopGain { to: UorfType::NonOverlapping, type_changed: true }, "uStop_gain to Non-overlapping")]
    #[case(Consequence::UStopGain { to: UorfType::NonOverlapping, type_changed: false }, "uStop_gain shorter Non-overlapping")]
    #[case(Consequence::UStopLoss { to: UorfType::Overlapping, type_changed: true }, "uStop_loss to Overlapping")]
    #[case(Consequence::UStopLoss { to: UorfType::NonOverlapping, type_changed: false }, "uStop_loss longer Non-overlapping")]
    #[case(Consequence::UKozak, "uKozak")]
    #[case(Consequence::MKozak, "mKozak")]
    #[case(Consequence::NoEffect, "No effect")]
    #[case(Consequence::Unannotatable, "Unannotatable")]
    fn test_consequence_label(#[case] csq: Consequence, #[case] label: &str) {
        assert_eq!(csq.label(), label);
        assert_eq!(csq.to_string(), label);
    }

    #[rstest]
    #[case(UorfType::Overlapping, UorfType::NonOverlapping, false, TranslationEffect::Increased)]
    #[case(UorfType::NTerminalExtension, UorfType::NonOverlapping, true, TranslationEffect::Decreased)]
    #[case(UorfType::NonOverlapping, UorfType::Overlapping, false, TranslationEffect::Decreased)]
    #[case(UorfType::NTerminalExtension, UorfType::Overlapping, false, TranslationEffect::Decreased)]
    #[case(UorfType::NonOverlapping, UorfType::NTerminalExtension, false, TranslationEffect::NTerminalExtension)]
    #[case(UorfType::NonOverlapping, UorfType::NonOverlapping, true, TranslationEffect::Increased)]
    #[case(UorfType::NonOverlapping, UorfType::NonOverlapping, false, TranslationEffect::Decreased)]
    #[case(UorfType::Overlapping, UorfType::Overlapping, true, TranslationEffect::Increased)]
    fn test_stop_change_effect(
        #[case] from: UorfType,
        #[case] to: UorfType,
        #[case] shorter: bool,
        #[case] expected: TranslationEffect,
    ) {
        assert_eq!(TranslationEffect::for_stop_change(from, to, shorter), expected);
    }

    #[test]
    fn test_gained_uorf_effect() {
        assert_eq!(
            TranslationEffect::for_gained_uorf(UorfType::NTerminalExtension),
            TranslationEffect::NTerminalExtension
        );
        assert_eq!(
            TranslationEffect::for_gained_uorf(UorfType::Overlapping),
            TranslationEffect::Decreased
        );
    }

    #[test]
    fn test_has_effect() {
        assert!(Consequence::UKozak.has_effect());
        assert!(!Consequence::NoEffect.has_effect());
        assert!(!Consequence::Unannotatable.has_effect());
        assert_eq!(
            Consequence::UStartLoss.description(),
            "upstream start codon destroyed"
        );
    }
}
