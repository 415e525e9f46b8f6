//! Tab-separated annotation output
//!
//! One row is written per input row. The column set depends on the mode:
//! the basic columns always, the splicing pair with `--splice`, and every
//! feature plus the input's pass-through columns with `--full`. Missing
//! values are written as `NA`.

use std::fmt::Display;
use std::io::Write;

use crate::effect::Consequence;
use crate::error::UltraError;
use crate::pipeline::AnnotatedVariant;
use crate::variant::InputRecord;

/// Written for every missing value
pub const NA: &str = "NA";

pub const BASIC_COLUMNS: [&str; 10] = [
    "#CHROM",
    "POS",
    "ID",
    "REF",
    "ALT",
    "CSQ",
    "GENE",
    "TRANSCRIPT",
    "Translation",
    "SCORE",
];

pub const SPLICE_COLUMNS: [&str; 2] = ["SpliceAI", "Splicing_CSQ"];

pub const FULL_COLUMNS: [&str; 29] = [
    "MANE",
    "5UTR_START",
    "5UTR_END",
    "STRAND",
    "5UTR_LENGTH",
    "START_EXON",
    "mKOZAK",
    "mKOZAK_STRENGTH",
    "uORF_count",
    "Overlapping_count",
    "Nterminal_count",
    "NonOverlapping_count",
    "uORF_START",
    "uORF_END",
    "Ribo_seq",
    "uSTART_mSTART_DIST",
    "uSTART_CAP_DIST",
    "uSTOP_CODON",
    "uORF_TYPE",
    "uKOZAK",
    "uKOZAK_STRENGTH",
    "uORF_LENGTH",
    "uORF_AA_LENGTH",
    "uORF_rank",
    "uSTART_PHYLOP",
    "uSTART_PHASTCONS",
    "pLI",
    "LOEUF",
    "ALL_CSQ",
];

/// Which optional column groups to write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub splice: bool,
    pub full: bool,
}

/// Names for pass-through columns
///
/// Header names are used when the input had a header; otherwise columns are
/// named `FIELD<n>` by their 1-based position, sized from the first row.
pub fn passthrough_names(header: Option<&[String]>, first: Option<&InputRecord>) -> Vec<String> {
    match header {
        Some(header) => header.iter().skip(5).cloned().collect(),
        None => first
            .map(|r| (6..6 + r.passthrough().len()).map(|n| format!("FIELD{}", n)).collect())
            .unwrap_or_default(),
    }
}

fn opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string())
}

fn opt_f64(value: Option<f64>, precision: usize) -> String {
    value
        .filter(|v| v.is_finite())
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| NA.to_string())
}

fn bool_label(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn field_or_na(value: &str) -> String {
    if value.is_empty() {
        NA.to_string()
    } else {
        value.to_string()
    }
}

/// Writes annotated variants as TSV
///
/// Full-mode rows keep the input's extra fields verbatim and pad short rows
/// with `NA` to the header width.
pub struct OutputWriter<W: Write> {
    inner: W,
    options: OutputOptions,
    passthrough: Vec<String>,
    header_written: bool,
    rows: usize,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(inner: W, options: OutputOptions) -> Self {
        Self {
            inner,
            options,
            passthrough: Vec::new(),
            header_written: false,
            rows: 0,
        }
    }

    pub fn options(&self) -> OutputOptions {
        self.options
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Rows written so far, excluding the header
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Column names in output order
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = BASIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        if self.options.splice {
            columns.extend(SPLICE_COLUMNS.iter().map(|c| c.to_string()));
        }
        if self.options.full {
            columns.extend(FULL_COLUMNS.iter().map(|c| c.to_string()));
            columns.extend(self.passthrough.iter().cloned());
        }
        columns
    }

    /// Write the header line; pass-through names are only used in full mode
    pub fn write_header(&mut self, passthrough: Vec<String>) -> Result<(), UltraError> {
        self.passthrough = passthrough;
        writeln!(self.inner, "{}", self.columns().join("\t"))?;
        self.header_written = true;
        Ok(())
    }

    /// Write one row
    pub fn write(&mut self, annotated: &AnnotatedVariant) -> Result<(), UltraError> {
        let fields = self.row(annotated);
        writeln!(self.inner, "{}", fields.join("\t"))?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_all(&mut self, annotated: &[AnnotatedVariant]) -> Result<(), UltraError> {
        annotated.iter().try_for_each(|a| self.write(a))
    }

    pub fn flush(&mut self) -> Result<(), UltraError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn row(&self, annotated: &AnnotatedVariant) -> Vec<String> {
        let input = &annotated.input;
        let primary = annotated.primary();
        let record = primary.map(|c| &c.record);

        let mut fields: Vec<String> = (0..5).map(|i| field_or_na(input.field(i))).collect();
        fields.push(annotated.consequence().label());
        fields.push(opt(record.map(|r| r.gene.as_str())));
        fields.push(opt(record.map(|r| r.transcript_id.as_str())));
        fields.push(opt(annotated.translation()));
        fields.push(opt_f64(annotated.score(), 4));

        if self.options.splice {
            let splicing = record.and_then(|r| r.splicing.as_ref());
            fields.push(opt(splicing.and_then(|s| s.spliceai.as_deref())));
            fields.push(opt(splicing.and_then(|s| s.csq.as_deref())));
        }

        if self.options.full {
            match record {
                Some(r) => {
                    let uorf = r.uorf.as_ref();
                    fields.push(bool_label(r.mane).to_string());
                    fields.push(r.utr_start.to_string());
                    fields.push(r.utr_end.to_string());
                    fields.push(r.strand.to_string());
                    fields.push(r.utr_length.to_string());
                    fields.push(opt(r.start_exon));
                    fields.push(opt(r.main_kozak.window.as_deref()));
                    fields.push(opt(r.main_kozak.strength));
                    fields.push(r.counts.total.to_string());
                    fields.push(r.counts.overlapping.to_string());
                    fields.push(r.counts.n_terminal.to_string());
                    fields.push(r.counts.non_overlapping.to_string());
                    fields.push(opt(uorf.and_then(|u| u.genomic_start)));
                    fields.push(opt(uorf.and_then(|u| u.genomic_end)));
                    fields.push(match uorf.map(|u| u.ribo_seq) {
                        Some(Some(flag)) => bool_label(flag).to_string(),
                        Some(None) if r.consequence == Consequence::UStartGain => {
                            "New uORF".to_string()
                        }
                        _ => NA.to_string(),
                    });
                    fields.push(opt(uorf.map(|u| u.cds_distance)));
                    fields.push(opt(uorf.map(|u| u.cap_distance())));
                    fields.push(opt(uorf.and_then(|u| u.stop_codon.as_deref())));
                    fields.push(opt(uorf.map(|u| u.kind.label())));
                    fields.push(opt(uorf.and_then(|u| u.kozak.window.as_deref())));
                    fields.push(opt(uorf.and_then(|u| u.kozak.strength)));
                    fields.push(opt(uorf.and_then(|u| u.length)));
                    fields.push(opt(uorf.and_then(|u| u.aa_length)));
                    fields.push(opt(uorf.and_then(|u| u.rank)));
                    fields.push(opt_f64(r.phylop, 3));
                    fields.push(opt_f64(r.phastcons, 3));
                    fields.push(opt(r.constraint.pli));
                    fields.push(opt(r.constraint.loeuf));
                }
                None => {
                    fields.extend(std::iter::repeat(NA.to_string()).take(FULL_COLUMNS.len() - 1));
                }
            }
            fields.push(if annotated.candidates.is_empty() {
                NA.to_string()
            } else {
                annotated.all_consequences()
            });

            let extra = input.passthrough();
            fields.extend(extra.iter().cloned());
            for _ in extra.len()..self.passthrough.len() {
                fields.push(NA.to_string());
            }
        }
        fields
    }
}
