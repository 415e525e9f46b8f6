//! 5' UTR and uORF reference models
//!
//! # Coordinate System
//!
//! | Field | Basis | Notes |
//! |-------|-------|-------|
//! | `TranscriptUtr.utr_start`, `utr_end` | 1-based | Genomic span of the UTR (inclusive, `start <= end`) |
//! | `TranscriptUtr.cds_start` | 1-based | First transcribed base of the main ATG |
//! | `UorfRecord.start` | 1-based | First transcribed base of the uORF start codon |
//! | `UorfRecord.end` | 1-based | Last transcribed base of the uORF stop codon |
//! | `cds_local`, `start_local` | 0-based | Distance from the cap in the transcript sequence |

use crate::coords::{ExonMap, Strand};
use crate::effect::UorfType;
use crate::error::UltraError;
use crate::io::TsvRow;
use crate::kozak::{KozakContext, KozakStrength};
use crate::sequence::normalize;

/// Reference annotation of one transcript's 5' UTR
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptUtr {
    pub transcript_id: String,
    pub gene: String,
    pub chrom: String,
    pub strand: Strand,
    /// Genomic start of the UTR span (1-based, inclusive)
    pub utr_start: u64,
    /// Genomic end of the UTR span (1-based, inclusive)
    pub utr_end: u64,
    /// Genomic position of the first transcribed base of the CDS start codon
    pub cds_start: u64,
    /// MANE Select transcript
    pub mane: bool,
    /// Transcript-orientation sequence from the cap into the CDS
    pub sequence: Vec<u8>,
    exon_map: ExonMap,
    cds_local: usize,
}

impl TranscriptUtr {
    /// Build and validate a transcript
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transcript_id: impl Into<String>,
        gene: impl Into<String>,
        chrom: impl Into<String>,
        strand: Strand,
        utr_start: u64,
        utr_end: u64,
        cds_start: u64,
        mane: bool,
        exons: Vec<(u64, u64)>,
        sequence: &str,
    ) -> Result<Self, UltraError> {
        let transcript_id = transcript_id.into();
        let invalid = |msg: String| {
            UltraError::reference_data("5UTRs.tsv", format!("{}: {}", transcript_id, msg))
        };

        if utr_start == 0 || utr_start > utr_end {
            return Err(invalid(format!(
                "invalid UTR span {}-{}",
                utr_start, utr_end
            )));
        }
        let downstream = match strand {
            Strand::Plus => cds_start > utr_end,
            Strand::Minus => cds_start < utr_start,
        };
        if !downstream {
            return Err(invalid(format!(
                "CDS start {} is not downstream of the UTR on the {} strand",
                cds_start, strand
            )));
        }

        let exon_map = ExonMap::new(strand, exons).map_err(|e| invalid(e.to_string()))?;
        let sequence = normalize(sequence);
        if sequence.len() != exon_map.len() {
            return Err(invalid(format!(
                "sequence length {} does not match exon length {}",
                sequence.len(),
                exon_map.len()
            )));
        }
        if !sequence
            .iter()
            .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N'))
        {
            return Err(invalid("sequence contains non-nucleotide characters".to_string()));
        }
        let cds_local = exon_map
            .to_local(cds_start)
            .ok_or_else(|| invalid(format!("CDS start {} is outside the exons", cds_start)))?;
        if cds_local == 0 {
            return Err(invalid("UTR has no transcribed bases".to_string()));
        }
        if cds_local + 3 > sequence.len() {
            return Err(invalid("sequence ends before the CDS start codon".to_string()));
        }

        Ok(Self {
            transcript_id,
            gene: gene.into(),
            chrom: chrom.into(),
            strand,
            utr_start,
            utr_end,
            cds_start,
            mane,
            sequence,
            exon_map,
            cds_local,
        })
    }

    /// Parse a row of the UTR table
    pub(crate) fn from_row(row: &TsvRow, cols: &UtrColumns) -> Result<Self, UltraError> {
        let line_err = |msg: String| {
            UltraError::reference_data("5UTRs.tsv", format!("line {}: {}", row.line, msg))
        };
        let int = |col: usize, name: &str| -> Result<u64, UltraError> {
            row.get(col)
                .parse::<u64>()
                .map_err(|_| line_err(format!("invalid {} '{}'", name, row.get(col))))
        };

        let strand = Strand::parse(row.get(cols.strand))
            .ok_or_else(|| line_err(format!("invalid STRAND '{}'", row.get(cols.strand))))?;
        let exons = parse_exons(row.get(cols.exons))
            .ok_or_else(|| line_err(format!("invalid EXONS '{}'", row.get(cols.exons))))?;
        let gene = cols.gene.map(|c| row.get(c)).unwrap_or("");

        Self::new(
            row.get(cols.transcript),
            gene,
            row.get(cols.chrom),
            strand,
            int(cols.utr_start, "5UTR_START")?,
            int(cols.utr_end, "5UTR_END")?,
            int(cols.cds_start, "CDS_START")?,
            cols.mane.map(|c| parse_flag(row.get(c))).unwrap_or(Some(false)) == Some(true),
            exons,
            row.get(cols.sequence),
        )
    }

    pub fn exon_map(&self) -> &ExonMap {
        &self.exon_map
    }

    /// 0-based index of the CDS start codon in [`sequence`](Self::sequence)
    pub fn cds_local(&self) -> usize {
        self.cds_local
    }

    /// Transcribed length of the 5' UTR (cap to CDS start)
    pub fn utr_length(&self) -> usize {
        self.cds_local
    }

    /// 1-based exon number holding the CDS start codon
    pub fn start_exon(&self) -> Option<usize> {
        self.exon_map.exon_number(self.cds_local)
    }

    /// True when the genomic position lies in the UTR span
    pub fn contains(&self, pos: u64) -> bool {
        pos >= self.utr_start && pos <= self.utr_end
    }

    /// Kozak context of the main start codon in the reference sequence
    pub fn main_kozak(&self) -> KozakContext {
        KozakContext::at(&self.sequence, self.cds_local)
    }
}

/// Annotated upstream open reading frame
#[derive(Debug, Clone, PartialEq)]
pub struct UorfRecord {
    pub transcript_id: String,
    /// Genomic position of the first transcribed base of the start codon
    pub start: u64,
    /// Genomic position of the last transcribed base of the stop codon
    pub end: Option<u64>,
    pub uorf_type: UorfType,
    /// Kozak context window as annotated
    pub kozak: Option<String>,
    /// Annotated rank (1 = closest to the CDS start)
    pub rank: Option<usize>,
    /// Supported by ribosome profiling
    pub ribo_seq: Option<bool>,
    /// Start codon; ATG unless the record annotates a near-cognate start
    pub start_codon: String,
    pub stop_codon: Option<String>,
    start_local: usize,
}

impl UorfRecord {
    /// Build a record and resolve it against its transcript
    ///
    /// The start codon must lie inside the UTR exons.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        utr: &TranscriptUtr,
        start: u64,
        end: Option<u64>,
        uorf_type: UorfType,
        kozak: Option<String>,
        rank: Option<usize>,
        ribo_seq: Option<bool>,
        start_codon: Option<String>,
        stop_codon: Option<String>,
    ) -> Result<Self, UltraError> {
        let start_local = utr
            .exon_map()
            .to_local(start)
            .filter(|&local| local < utr.cds_local())
            .ok_or_else(|| {
                UltraError::reference_data(
                    "uORFs.tsv",
                    format!(
                        "uORF start {} is outside the 5' UTR of {}",
                        start, utr.transcript_id
                    ),
                )
            })?;
        let start_codon = start_codon.map(|c| c.to_ascii_uppercase()).unwrap_or_else(|| {
            String::from_utf8_lossy(&utr.sequence[start_local..start_local + 3]).into_owned()
        });

        Ok(Self {
            transcript_id: utr.transcript_id.clone(),
            start,
            end,
            uorf_type,
            kozak,
            rank,
            ribo_seq,
            start_codon,
            stop_codon: stop_codon.map(|c| c.to_ascii_uppercase()),
            start_local,
        })
    }

    /// Parse a row of the uORF table against its (already loaded) transcript
    pub(crate) fn from_row(
        row: &TsvRow,
        cols: &UorfColumns,
        utr: &TranscriptUtr,
    ) -> Result<Self, UltraError> {
        let line_err = |msg: String| {
            UltraError::reference_data("uORFs.tsv", format!("line {}: {}", row.line, msg))
        };
        let start = row
            .get(cols.start)
            .parse::<u64>()
            .map_err(|_| line_err(format!("invalid uORF_START '{}'", row.get(cols.start))))?;
        let end = match row.opt(Some(cols.end)) {
            Some(value) => Some(
                value
                    .parse::<u64>()
                    .map_err(|_| line_err(format!("invalid uORF_END '{}'", value)))?,
            ),
            None => None,
        };
        let uorf_type = UorfType::parse(row.get(cols.uorf_type)).ok_or_else(|| {
            line_err(format!("invalid uORF_TYPE '{}'", row.get(cols.uorf_type)))
        })?;

        Self::new(
            utr,
            start,
            end,
            uorf_type,
            row.opt(cols.kozak).map(|s| s.to_ascii_uppercase()),
            row.opt(cols.rank).and_then(|r| r.parse().ok()),
            row.opt(cols.ribo_seq).and_then(parse_flag),
            row.opt(cols.start_codon).map(str::to_string),
            row.opt(cols.stop_codon).map(str::to_string),
        )
    }

    /// 0-based index of the start codon in the transcript sequence
    pub fn start_local(&self) -> usize {
        self.start_local
    }

    /// Strength of the annotated Kozak window, if any
    pub fn kozak_strength(&self) -> Option<KozakStrength> {
        self.kozak
            .as_deref()
            .and_then(|k| crate::kozak::kozak_strength(k.as_bytes()))
    }
}

/// Column layout of the UTR table
pub(crate) struct UtrColumns {
    pub transcript: usize,
    pub gene: Option<usize>,
    pub chrom: usize,
    pub strand: usize,
    pub utr_start: usize,
    pub utr_end: usize,
    pub cds_start: usize,
    pub mane: Option<usize>,
    pub exons: usize,
    pub sequence: usize,
}

/// Column layout of the uORF table
pub(crate) struct UorfColumns {
    pub transcript: usize,
    pub start: usize,
    pub end: usize,
    pub uorf_type: usize,
    pub kozak: Option<usize>,
    pub rank: Option<usize>,
    pub ribo_seq: Option<usize>,
    pub start_codon: Option<usize>,
    pub stop_codon: Option<usize>,
}

/// Extract exon blocks from any list-of-pairs spelling
///
/// `[(100, 200), (300, 400)]`, `100-200,300-400` and `100:200;300:400` all
/// parse to the same two blocks.
pub fn parse_exons(s: &str) -> Option<Vec<(u64, u64)>> {
    let numbers: Vec<u64> = s
        .split(|c: char| !c.is_ascii_digit())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if numbers.is_empty() || numbers.len() % 2 != 0 {
        return None;
    }
    Some(numbers.chunks(2).map(|c| (c[0], c[1])).collect())
}

/// Parse a boolean flag column
pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "n" | "f" => Some(false),
        "" | "na" | "." => None,
        // MANE tables often carry the status label itself
        other if other.starts_with("mane") => Some(true),
        _ => None,
    }
}
