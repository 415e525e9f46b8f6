//! Numeric encoding of feature records
//!
//! Categorical features use fixed label encodings; the consequence is one-hot
//! encoded into `CSQ_<label>` columns. Missing values fall back to a fixed
//! default where one exists, then to the model's imputation value.

use crate::effect::{TranslationEffect, UorfType};
use crate::error::UltraError;
use crate::features::FeatureRecord;
use crate::kozak::KozakStrength;
use crate::scoring::FeatureSchema;

/// Prefix of one-hot consequence columns
pub const CSQ_PREFIX: &str = "CSQ_";

/// Numeric and categorical features understood by the encoder
pub const KNOWN_FEATURES: [&str; 16] = [
    "Translation",
    "5UTR_LENGTH",
    "mKOZAK_STRENGTH",
    "uORF_count",
    "Ribo_seq",
    "uSTART_mSTART_DIST",
    "uSTOP_CODON",
    "uORF_TYPE",
    "uKOZAK_STRENGTH",
    "uORF_LENGTH",
    "uORF_rank",
    "uSTART_PHYLOP",
    "uSTART_PHASTCONS",
    "uSTART_CAP_DIST",
    "pLI",
    "LOEUF",
];

/// True when the encoder can produce a value for the named feature
pub fn is_known_feature(name: &str) -> bool {
    KNOWN_FEATURES.contains(&name) || name.starts_with(CSQ_PREFIX)
}

pub fn encode_translation(effect: TranslationEffect) -> f64 {
    match effect {
        TranslationEffect::Increased => 0.0,
        TranslationEffect::NTerminalExtension => 1.0,
        TranslationEffect::Decreased => 2.0,
    }
}

pub fn encode_kozak(strength: KozakStrength) -> f64 {
    match strength {
        KozakStrength::Weak => 0.0,
        KozakStrength::Adequate => 1.0,
        KozakStrength::Strong => 2.0,
    }
}

pub fn encode_uorf_type(kind: UorfType) -> f64 {
    match kind {
        UorfType::NonOverlapping => 0.0,
        UorfType::NTerminalExtension => 1.0,
        UorfType::Overlapping => 2.0,
    }
}

/// Encode a stop codon or a stop codon change
///
/// Unchanged stops encode as 0; a missing or unrecognised value encodes as 4.
pub fn encode_stop_codon(stop: Option<&str>) -> f64 {
    let Some(stop) = stop else {
        return 4.0;
    };
    match stop.split_once(" > ") {
        Some((from, to)) if from == to => 0.0,
        Some(change) => match change {
            ("TAA", "TGA") | ("TGA", "TAA") => 3.0,
            ("TAG", "TGA") | ("TGA", "TAG") => 2.0,
            ("TAG", "TAA") | ("TAA", "TAG") => 1.0,
            _ => 4.0,
        },
        None => match stop {
            "TAA" => 3.0,
            "TAG" => 2.0,
            "TGA" => 1.0,
            _ => 4.0,
        },
    }
}

/// Raw value of a named feature, before imputation
fn raw_value(record: &FeatureRecord, name: &str) -> Option<f64> {
    let uorf = record.uorf.as_ref();
    match name {
        "Translation" => record.translation.map(encode_translation),
        "5UTR_LENGTH" => Some(record.utr_length as f64),
        "mKOZAK_STRENGTH" => record.main_kozak.strength.map(encode_kozak),
        "uORF_count" => Some(record.counts.total as f64),
        // A uORF without ribosome-profiling evidence encodes as 0; new uORFs as 1
        "Ribo_seq" => uorf.map(|u| match u.ribo_seq {
            Some(false) => 0.0,
            _ => 1.0,
        }),
        "uSTART_mSTART_DIST" => uorf.map(|u| u.cds_distance as f64),
        "uSTOP_CODON" => Some(encode_stop_codon(
            uorf.and_then(|u| u.stop_codon.as_deref()),
        )),
        "uORF_TYPE" => uorf.map(|u| encode_uorf_type(u.kind)),
        "uKOZAK_STRENGTH" => Some(
            uorf.and_then(|u| u.kozak.strength)
                .map(encode_kozak)
                .unwrap_or(1.0),
        ),
        "uORF_LENGTH" => uorf.and_then(|u| u.length).map(|l| l as f64),
        "uORF_rank" => Some(uorf.and_then(|u| u.rank).unwrap_or(1) as f64),
        "uSTART_PHYLOP" => record.phylop,
        "uSTART_PHASTCONS" => record.phastcons,
        "uSTART_CAP_DIST" => uorf.map(|u| u.cap_distance() as f64),
        "pLI" => record.constraint.pli,
        "LOEUF" => record.constraint.loeuf,
        _ => None,
    }
}

/// Encode a record into the model's feature order
///
/// Fails with [`UltraError::FeatureSchema`] when a value is missing and the
/// schema has no imputation value for it, or when the record's consequence
/// is not one of the model's CSQ categories.
pub fn encode(record: &FeatureRecord, schema: &FeatureSchema) -> Result<Vec<f64>, UltraError> {
    let csq = record.consequence.label();
    if !schema.csq_categories.is_empty() && !schema.csq_categories.contains(&csq) {
        return Err(UltraError::feature_schema(
            "CSQ",
            format!("unknown category '{}'", csq),
        ));
    }

    schema
        .feature_names
        .iter()
        .map(|name| {
            if let Some(category) = name.strip_prefix(CSQ_PREFIX) {
                return Ok(if category == csq { 1.0 } else { 0.0 });
            }
            raw_value(record, name)
                .or_else(|| schema.impute.get(name).copied())
                .ok_or_else(|| {
                    UltraError::feature_schema(name.clone(), "missing value with no imputation")
                })
        })
        .collect()
}
