//! In-memory index of 5' UTRs and annotated uORFs
//!
//! The index is built once per run and shared read-only by every worker.

use std::collections::HashMap;
use std::path::Path;

use crate::effect::UorfType;
use crate::error::UltraError;
use crate::io::TsvTable;
use crate::reference::utr::{TranscriptUtr, UorfColumns, UorfRecord, UtrColumns};

/// Number of annotated uORFs of each type on a transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UorfCounts {
    pub total: usize,
    pub overlapping: usize,
    pub n_terminal: usize,
    pub non_overlapping: usize,
}

/// Transcript and uORF lookup by genomic position
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    /// Transcripts indexed by ID
    transcripts: HashMap<String, TranscriptUtr>,
    /// uORFs per transcript, ordered by distance from the cap
    uorfs: HashMap<String, Vec<UorfRecord>>,
    /// Index from normalised chromosome to UTR spans for overlap queries
    region_index: HashMap<String, RegionSpans>,
}

/// UTR spans of one chromosome, sorted by start
#[derive(Debug, Default)]
struct RegionSpans {
    spans: Vec<(u64, u64, String)>,
    /// `max_end[i]` is the largest end among `spans[..=i]`
    max_end: Vec<u64>,
}

impl RegionSpans {
    fn push(&mut self, start: u64, end: u64, id: String) {
        self.spans.push((start, end, id));
    }

    fn sort(&mut self) {
        self.spans
            .sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));
        self.max_end = self
            .spans
            .iter()
            .scan(0u64, |max, (_, end, _)| {
                *max = (*max).max(*end);
                Some(*max)
            })
            .collect();
    }

    /// IDs of the spans containing `pos` (1-based, inclusive ends)
    fn containing(&self, pos: u64) -> impl Iterator<Item = &str> {
        let lower = self.max_end.partition_point(|&e| e < pos);
        let upper = self.spans.partition_point(|(start, _, _)| *start <= pos);
        self.spans[lower.min(upper)..upper]
            .iter()
            .filter(move |(_, end, _)| *end >= pos)
            .map(|(_, _, id)| id.as_str())
    }
}

impl ReferenceIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the UTR and uORF tables
    pub fn load(utr_path: &Path, uorf_path: &Path) -> Result<Self, UltraError> {
        let utr_table = TsvTable::read(utr_path)?;
        let uorf_table = TsvTable::read(uorf_path)?;
        Self::from_tables(&utr_table, &uorf_table)
    }

    /// Build an index from already-parsed tables
    pub fn from_tables(utr_table: &TsvTable, uorf_table: &TsvTable) -> Result<Self, UltraError> {
        let mut index = Self::new();

        let utr_cols = UtrColumns {
            transcript: utr_table.require_column("TRANSCRIPT")?,
            gene: utr_table.column("GENE"),
            chrom: utr_table.require_column("CHROM")?,
            strand: utr_table.require_column("STRAND")?,
            utr_start: utr_table.require_column("5UTR_START")?,
            utr_end: utr_table.require_column("5UTR_END")?,
            cds_start: utr_table.require_column("CDS_START")?,
            mane: utr_table.column("MANE"),
            exons: utr_table.require_column("EXONS")?,
            sequence: utr_table.require_column("SEQUENCE")?,
        };
        for row in utr_table.rows() {
            index.insert_transcript(TranscriptUtr::from_row(row, &utr_cols)?)?;
        }
        for spans in index.region_index.values_mut() {
            spans.sort();
        }

        let uorf_cols = UorfColumns {
            transcript: uorf_table.require_column("TRANSCRIPT")?,
            start: uorf_table.require_column("uORF_START")?,
            end: uorf_table.require_column("uORF_END")?,
            uorf_type: uorf_table.require_column("uORF_TYPE")?,
            kozak: uorf_table.column("uKOZAK"),
            rank: uorf_table.column("uORF_rank"),
            ribo_seq: uorf_table.column("Ribo_seq"),
            start_codon: uorf_table.column("START_CODON"),
            stop_codon: uorf_table.column("STOP_CODON"),
        };
        for row in uorf_table.rows() {
            let transcript_id = row.get(uorf_cols.transcript);
            let utr = index.transcripts.get(transcript_id).ok_or_else(|| {
                UltraError::reference_data(
                    uorf_table.name(),
                    format!(
                        "line {}: uORF references unknown transcript {}",
                        row.line, transcript_id
                    ),
                )
            })?;
            let record = UorfRecord::from_row(row, &uorf_cols, utr)?;
            index.push_uorf(record);
        }
        index.sort_uorfs();

        log::info!(
            "Loaded {} transcripts and {} uORFs",
            index.len(),
            index.uorfs.values().map(Vec::len).sum::<usize>()
        );
        Ok(index)
    }

    /// Add a transcript
    ///
    /// Duplicate transcript IDs are rejected.
    pub fn add_transcript(&mut self, utr: TranscriptUtr) -> Result<(), UltraError> {
        let chrom = normalize_chrom(&utr.chrom);
        self.insert_transcript(utr)?;
        if let Some(spans) = self.region_index.get_mut(&chrom) {
            spans.sort();
        }
        Ok(())
    }

    /// Add a transcript without re-sorting its chromosome's spans
    fn insert_transcript(&mut self, utr: TranscriptUtr) -> Result<(), UltraError> {
        if self.transcripts.contains_key(&utr.transcript_id) {
            return Err(UltraError::reference_data(
                "5UTRs.tsv",
                format!("duplicate transcript {}", utr.transcript_id),
            ));
        }
        self.region_index
            .entry(normalize_chrom(&utr.chrom))
            .or_default()
            .push(utr.utr_start, utr.utr_end, utr.transcript_id.clone());
        self.transcripts.insert(utr.transcript_id.clone(), utr);
        Ok(())
    }

    /// Add an annotated uORF to an already-added transcript
    pub fn add_uorf(&mut self, record: UorfRecord) -> Result<(), UltraError> {
        if !self.transcripts.contains_key(&record.transcript_id) {
            return Err(UltraError::reference_data(
                "uORFs.tsv",
                format!(
                    "uORF references unknown transcript {}",
                    record.transcript_id
                ),
            ));
        }
        self.push_uorf(record);
        self.sort_uorfs();
        Ok(())
    }

    fn push_uorf(&mut self, record: UorfRecord) {
        self.uorfs
            .entry(record.transcript_id.clone())
            .or_default()
            .push(record);
    }

    fn sort_uorfs(&mut self) {
        for records in self.uorfs.values_mut() {
            records.sort_by_key(|r| (r.start_local(), r.end));
        }
    }

    /// Get a transcript by ID
    pub fn transcript(&self, id: &str) -> Option<&TranscriptUtr> {
        self.transcripts.get(id)
    }

    /// Transcripts whose UTR span contains the position
    ///
    /// `chr1` and `1` address the same contig. Results are ordered by
    /// transcript ID.
    pub fn lookup_utr(&self, chrom: &str, pos: u64) -> Vec<&TranscriptUtr> {
        let mut hits: Vec<&TranscriptUtr> = self
            .region_index
            .get(&normalize_chrom(chrom))
            .map(|spans| {
                spans
                    .containing(pos)
                    .filter_map(|id| self.transcripts.get(id))
                    .collect()
            })
            .unwrap_or_default();
        hits.sort_by(|a, b| a.transcript_id.cmp(&b.transcript_id));
        hits
    }

    /// Annotated uORFs of a transcript, ordered by distance from the cap
    pub fn uorfs_for(&self, transcript_id: &str) -> &[UorfRecord] {
        self.uorfs
            .get(transcript_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Count annotated uORFs by type
    pub fn uorf_counts(&self, transcript_id: &str) -> UorfCounts {
        let mut counts = UorfCounts::default();
        for record in self.uorfs_for(transcript_id) {
            counts.total += 1;
            match record.uorf_type {
                UorfType::Overlapping => counts.overlapping += 1,
                UorfType::NTerminalExtension => counts.n_terminal += 1,
                UorfType::NonOverlapping => counts.non_overlapping += 1,
            }
        }
        counts
    }

    /// Number of transcripts
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }
}

/// Normalise a chromosome name for lookups (`chr1` → `1`, `chrM` → `MT`)
pub fn normalize_chrom(chrom: &str) -> String {
    let trimmed = chrom.trim();
    let bare = if trimmed.len() > 3
        && trimmed
            .get(..3)
            .is_some_and(|p| p.eq_ignore_ascii_case("chr"))
    {
        &trimmed[3..]
    } else {
        trimmed
    };
    if bare.eq_ignore_ascii_case("M") {
        "MT".to_string()
    } else {
        bare.to_string()
    }
}
