//! Splicing predictions supplied by an external predictor
//!
//! The predictor's output is read as a table keyed by variant and merged into
//! the feature record. Only SpliceAI entries with a delta score above the
//! cutoff are kept.

use std::collections::HashMap;
use std::path::Path;

use crate::error::UltraError;
use crate::io::{is_missing, TsvTable};
use crate::reference::normalize_chrom;
use crate::sequence::as_str;
use crate::variant::Variant;

/// Default delta-score cutoff
pub const DEFAULT_SPLICE_CUTOFF: f64 = 0.2;

/// Delta scores in SpliceAI order
const EVENTS: [&str; 4] = ["acceptor_gain", "acceptor_loss", "donor_gain", "donor_loss"];

/// One SpliceAI prediction for one gene
#[derive(Debug, Clone, PartialEq)]
pub struct SpliceAiScore {
    pub gene: String,
    /// DS_AG, DS_AL, DS_DG, DS_DL
    pub deltas: [f64; 4],
    /// DP_AG, DP_AL, DP_DG, DP_DL
    pub positions: [i64; 4],
}

impl SpliceAiScore {
    /// Largest delta score
    pub fn max_delta(&self) -> f64 {
        self.deltas.iter().copied().fold(f64::MIN, f64::max)
    }

    /// Event with the largest delta score
    pub fn strongest_event(&self) -> &'static str {
        let idx = self
            .deltas
            .iter()
            .enumerate()
            .fold(0, |best, (i, d)| if *d > self.deltas[best] { i } else { best });
        EVENTS[idx]
    }

    /// `GENE|DS_AG|DS_AL|DS_DG|DS_DL|DP_AG|DP_AL|DP_DG|DP_DL`, deltas to two decimals
    pub fn format(&self) -> String {
        let mut parts = vec![self.gene.clone()];
        parts.extend(self.deltas.iter().map(|d| format!("{:.2}", d)));
        parts.extend(self.positions.iter().map(|p| p.to_string()));
        parts.join("|")
    }
}

/// Parse a SpliceAI annotation and keep entries above `cutoff`
///
/// Accepts either the bare value or a full INFO field containing
/// `SpliceAI=`. Entries are comma-separated, each
/// `ALLELE|GENE|DS_AG|DS_AL|DS_DG|DS_DL|DP_AG|DP_AL|DP_DG|DP_DL`; the leading
/// allele may be omitted. Malformed entries are skipped.
///
/// # Examples
///
/// ```
/// use ferro_uorf::splicing::parse_spliceai;
///
/// let scores = parse_spliceai("T|GENE1|0.50|0.00|0.01|0.00|-2|10|3|1", 0.2);
/// assert_eq!(scores.len(), 1);
/// assert_eq!(scores[0].format(), "GENE1|0.50|0.00|0.01|0.00|-2|10|3|1");
/// ```
pub fn parse_spliceai(value: &str, cutoff: f64) -> Vec<SpliceAiScore> {
    let value = value
        .split(';')
        .find_map(|entry| entry.trim().strip_prefix("SpliceAI="))
        .unwrap_or(value);
    value
        .split(',')
        .filter_map(parse_entry)
        .filter(|score| score.deltas.iter().any(|&d| d > cutoff))
        .collect()
}

fn parse_entry(entry: &str) -> Option<SpliceAiScore> {
    let fields: Vec<&str> = entry.trim().split('|').collect();
    let fields = match fields.len() {
        10 => &fields[1..],
        9 => &fields[..],
        _ => return None,
    };
    let mut deltas = [0.0; 4];
    let mut positions = [0; 4];
    for i in 0..4 {
        deltas[i] = fields[1 + i].trim().parse().ok()?;
        positions[i] = fields[5 + i].trim().parse().ok()?;
    }
    Some(SpliceAiScore {
        gene: fields[0].trim().to_string(),
        deltas,
        positions,
    })
}

/// Splicing fields attached to a feature record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplicingAnnotation {
    /// Formatted SpliceAI entries above the cutoff
    pub spliceai: Option<String>,
    /// Splicing consequence label
    pub csq: Option<String>,
}

impl SplicingAnnotation {
    /// Build from the predictor's values, dropping scores at or below `cutoff`
    pub fn from_values(spliceai: &str, csq: Option<&str>, cutoff: f64) -> Self {
        let scores = parse_spliceai(spliceai, cutoff);
        if scores.is_empty() {
            return Self::default();
        }
        let csq = csq
            .filter(|c| !is_missing(c))
            .map(str::to_string)
            .or_else(|| {
                scores
                    .iter()
                    .max_by(|a, b| a.max_delta().total_cmp(&b.max_delta()))
                    .map(|s| s.strongest_event().to_string())
            });
        Self {
            spliceai: Some(scores.iter().map(SpliceAiScore::format).collect::<Vec<_>>().join(",")),
            csq,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spliceai.is_none() && self.csq.is_none()
    }
}

/// Source of splicing predictions
pub trait SplicingSource {
    /// Predictions for one variant, if the predictor reported any
    fn lookup(&self, variant: &Variant) -> Option<SplicingAnnotation>;
}

type VariantKey = (String, u64, String, String);

fn variant_key(chrom: &str, pos: u64, reference: &str, alternate: &str) -> VariantKey {
    (
        normalize_chrom(chrom),
        pos,
        reference.to_ascii_uppercase(),
        alternate.to_ascii_uppercase(),
    )
}

/// Splicing predictions loaded from a table
///
/// Columns: CHROM, POS, REF, ALT, SpliceAI and optionally Splicing_CSQ.
#[derive(Debug, Default)]
pub struct SplicingTable {
    entries: HashMap<VariantKey, SplicingAnnotation>,
}

impl SplicingTable {
    pub fn load(path: &Path, cutoff: f64) -> Result<Self, UltraError> {
        let table = TsvTable::read(path)?;
        Self::from_table(&table, cutoff)
    }

    pub fn from_table(table: &TsvTable, cutoff: f64) -> Result<Self, UltraError> {
        let chrom = table.require_column("CHROM")?;
        let pos = table.require_column("POS")?;
        let reference = table.require_column("REF")?;
        let alternate = table.require_column("ALT")?;
        let spliceai = table.require_column("SpliceAI")?;
        let csq = table.column("Splicing_CSQ");

        let mut entries = HashMap::new();
        for row in table.rows() {
            let position = row.get(pos).parse::<u64>().map_err(|_| {
                UltraError::reference_data(
                    table.name(),
                    format!("line {}: invalid POS '{}'", row.line, row.get(pos)),
                )
            })?;
            let annotation =
                SplicingAnnotation::from_values(row.get(spliceai), row.opt(csq), cutoff);
            if annotation.is_empty() {
                continue;
            }
            let alt = match row.get(alternate) {
                "." | "-" | "<DEL>" => "",
                other => other,
            };
            entries.insert(
                variant_key(row.get(chrom), position, row.get(reference), alt),
                annotation,
            );
        }
        log::info!(
            "Loaded {} splicing predictions from {}",
            entries.len(),
            table.name()
        );
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SplicingSource for SplicingTable {
    fn lookup(&self, variant: &Variant) -> Option<SplicingAnnotation> {
        let key = variant_key(
            &variant.chrom,
            variant.pos,
            &as_str(&variant.reference),
            &as_str(&variant.alternate),
        );
        self.entries.get(&key).cloned()
    }
}
