//! Input variants
//!
//! Input rows are tab-separated with CHROM, POS, ID, REF and ALT first; any
//! further columns are carried through to full-mode output untouched.

use std::fmt;
use std::io::BufRead;

use crate::error::{ErrorCode, UltraError};
use crate::sequence::{as_str, is_acgt, normalize};

/// Spellings of an empty ALT allele (pure deletion)
const EMPTY_ALT: [&str; 4] = [".", "-", "<DEL>", ""];

/// One data row of the input, as read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// 0-based index among data rows
    pub index: usize,
    /// 1-based line number in the input
    pub line: usize,
    pub fields: Vec<String>,
}

impl InputRecord {
    pub fn new(index: usize, line: usize, text: &str) -> Self {
        Self {
            index,
            line,
            fields: text.split('\t').map(|f| f.to_string()).collect(),
        }
    }

    /// Field by position; missing fields read as empty
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn chrom(&self) -> &str {
        self.field(0)
    }

    pub fn pos(&self) -> &str {
        self.field(1)
    }

    pub fn id(&self) -> &str {
        self.field(2)
    }

    pub fn reference(&self) -> &str {
        self.field(3)
    }

    pub fn alternate(&self) -> &str {
        self.field(4)
    }

    /// Columns after ALT
    pub fn passthrough(&self) -> &[String] {
        self.fields.get(5..).unwrap_or(&[])
    }
}

/// A biallelic variant with REF/ALT restricted to A, C, G, T
///
/// ALT may be empty for a pure deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variant {
    pub chrom: String,
    /// 1-based position of the first REF base
    pub pos: u64,
    pub id: String,
    pub reference: Vec<u8>,
    pub alternate: Vec<u8>,
}

impl Variant {
    pub fn new(
        chrom: impl Into<String>,
        pos: u64,
        id: impl Into<String>,
        reference: &str,
        alternate: &str,
    ) -> Self {
        let alternate = if EMPTY_ALT.contains(&alternate.trim()) {
            Vec::new()
        } else {
            normalize(alternate)
        };
        Self {
            chrom: chrom.into(),
            pos,
            id: id.into(),
            reference: normalize(reference),
            alternate,
        }
    }

    /// Parse and validate an input row
    pub fn parse(record: &InputRecord) -> Result<Self, UltraError> {
        let err = |msg: String, code: ErrorCode| UltraError::invalid_variant(record.line, msg, code);

        if record.fields.len() < 5 {
            return Err(err(
                format!(
                    "expected at least 5 fields, got {}",
                    record.fields.len()
                ),
                ErrorCode::MalformedLine,
            ));
        }
        let pos: u64 = record
            .pos()
            .trim()
            .parse()
            .ok()
            .filter(|&p| p > 0)
            .ok_or_else(|| {
                err(
                    format!("invalid position '{}'", record.pos()),
                    ErrorCode::InvalidPosition,
                )
            })?;
        if record.alternate().contains(',') {
            return Err(err(
                format!("multi-allelic ALT '{}'", record.alternate()),
                ErrorCode::MultiAllelic,
            ));
        }

        let variant = Self::new(
            record.chrom().trim(),
            pos,
            record.id().trim(),
            record.reference(),
            record.alternate(),
        );
        if variant.reference.is_empty() || !is_acgt(&variant.reference) {
            return Err(err(
                format!("invalid REF '{}'", record.reference()),
                ErrorCode::InvalidBase,
            ));
        }
        if !is_acgt(&variant.alternate) {
            return Err(err(
                format!("invalid ALT '{}'", record.alternate()),
                ErrorCode::InvalidBase,
            ));
        }
        Ok(variant)
    }

    /// Genomic position of the last REF base
    pub fn end(&self) -> u64 {
        self.pos + self.reference.len() as u64 - 1
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alt = if self.alternate.is_empty() {
            "-".to_string()
        } else {
            as_str(&self.alternate)
        };
        write!(
            f,
            "{}:{}:{}>{}",
            self.chrom,
            self.pos,
            as_str(&self.reference),
            alt
        )
    }
}

/// Streaming reader over input rows
///
/// `##` meta lines are skipped. A `#CHROM` (or `CHROM`) line names the
/// columns; blank lines are ignored. Every other line is a data row.
pub struct InputReader<R> {
    reader: R,
    line: usize,
    index: usize,
    header: Option<Vec<String>>,
    buf: String,
}

impl<R: BufRead> InputReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            index: 0,
            header: None,
            buf: String::new(),
        }
    }

    /// Column names, once the header line has been read
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Names of the columns after ALT, if a header was present
    pub fn passthrough_columns(&self) -> Vec<String> {
        self.header
            .as_ref()
            .map(|h| h.iter().skip(5).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of data rows returned so far
    pub fn rows_read(&self) -> usize {
        self.index
    }

    /// Read the next data row
    pub fn next_record(&mut self) -> Result<Option<InputRecord>, UltraError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim_end_matches(['\r', '\n']);
            if text.trim().is_empty() || text.starts_with("##") {
                continue;
            }
            if self.index == 0 && is_header(text) {
                self.header = Some(
                    text.trim_start_matches('#')
                        .split('\t')
                        .map(|c| c.to_string())
                        .collect(),
                );
                continue;
            }
            let record = InputRecord::new(self.index, self.line, text);
            self.index += 1;
            return Ok(Some(record));
        }
    }

    /// Read up to `n` data rows
    pub fn next_chunk(&mut self, n: usize) -> Result<Vec<InputRecord>, UltraError> {
        let mut chunk = Vec::with_capacity(n);
        while chunk.len() < n {
            match self.next_record()? {
                Some(record) => chunk.push(record),
                None => break,
            }
        }
        Ok(chunk)
    }
}

fn is_header(text: &str) -> bool {
    let first = text.split('\t').next().unwrap_or("");
    first.eq_ignore_ascii_case("#CHROM") || first.eq_ignore_ascii_case("CHROM")
}
