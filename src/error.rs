//! Error types for ferro-uorf
//!
//! Errors fall into three classes:
//! - fatal startup errors (missing or malformed reference data, corrupt model)
//! - per-row errors that turn a variant into an `Unannotatable` row
//! - per-row scoring errors that keep the annotation but leave the score NA

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors
///
/// These codes can be used for programmatic error handling
/// and appear in log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Input errors (E1xxx)
    /// Malformed input line
    MalformedLine = 1001,
    /// Invalid nucleotide in an allele
    InvalidBase = 1002,
    /// Multi-allelic record
    MultiAllelic = 1003,
    /// Invalid position
    InvalidPosition = 1004,

    // Reference data errors (E2xxx)
    /// Required reference file is missing
    MissingReferenceData = 2001,
    /// Reference table is malformed or inconsistent
    InvalidReferenceData = 2002,
    /// Transcript not found
    TranscriptNotFound = 2003,

    // Variant placement errors (E3xxx)
    /// Variant leaves the 5' UTR exons
    OutOfBounds = 3001,
    /// REF allele disagrees with the reference sequence
    ReferenceMismatch = 3002,

    // Scoring errors (E4xxx)
    /// Feature cannot be encoded for the classifier
    FeatureSchema = 4001,
    /// Classifier artifact is unusable
    InvalidModel = 4002,

    // IO errors (E9xxx)
    /// File IO error
    IoError = 9001,
    /// JSON parsing error
    JsonError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Run was cancelled
    Interrupted = 9004,
}

impl ErrorCode {
    /// Get the error code as a string (e.g., "E1001")
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// Get a brief description of this error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::MalformedLine => "malformed input line",
            ErrorCode::InvalidBase => "invalid nucleotide base",
            ErrorCode::MultiAllelic => "multi-allelic record",
            ErrorCode::InvalidPosition => "invalid position",
            ErrorCode::MissingReferenceData => "missing reference data",
            ErrorCode::InvalidReferenceData => "invalid reference data",
            ErrorCode::TranscriptNotFound => "transcript not found",
            ErrorCode::OutOfBounds => "variant outside 5' UTR exons",
            ErrorCode::ReferenceMismatch => "reference sequence mismatch",
            ErrorCode::FeatureSchema => "feature cannot be encoded",
            ErrorCode::InvalidModel => "invalid classifier model",
            ErrorCode::IoError => "file I/O error",
            ErrorCode::JsonError => "JSON parsing error",
            ErrorCode::ConfigError => "configuration error",
            ErrorCode::Interrupted => "run interrupted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for ferro-uorf operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UltraError {
    /// Input variant cannot be parsed
    #[error("Invalid variant on line {line}: {msg}")]
    InvalidVariant {
        line: usize,
        msg: String,
        code: ErrorCode,
    },

    /// A required reference file does not exist
    #[error("Missing reference data: {path}")]
    MissingReferenceData { path: String },

    /// Reference table is malformed or inconsistent
    #[error("Reference data error in {source_name}: {msg}")]
    ReferenceData { source_name: String, msg: String },

    /// Transcript identifier not present in the UTR table
    #[error("Transcript not found: {id}")]
    TranscriptNotFound { id: String },

    /// Variant is not contained in the 5' UTR exons of a transcript
    #[error("Variant {variant} is outside the 5' UTR exons of {transcript}")]
    OutOfBoundsVariant { variant: String, transcript: String },

    /// REF allele does not match the reference sequence
    #[error("Reference mismatch at {location}: expected {expected}, found {found}")]
    ReferenceMismatch {
        location: String,
        expected: String,
        found: String,
    },

    /// A feature value cannot be encoded for the classifier
    #[error("Feature {feature} cannot be encoded: {msg}")]
    FeatureSchema { feature: String, msg: String },

    /// Classifier artifact is corrupt or inconsistent
    #[error("Model error: {msg}")]
    Model { msg: String },

    /// Configuration file problem
    #[error("Config error: {msg}")]
    Config { msg: String },

    /// Run was cancelled before all rows were processed
    #[error("Interrupted after {processed} rows")]
    Interrupted { processed: usize },

    /// IO error (for file operations)
    #[error("IO error: {msg}")]
    Io { msg: String },

    /// JSON parsing error
    #[error("JSON error: {msg}")]
    Json { msg: String },
}

impl UltraError {
    /// Create an invalid-variant error
    pub fn invalid_variant(line: usize, msg: impl Into<String>, code: ErrorCode) -> Self {
        UltraError::InvalidVariant {
            line,
            msg: msg.into(),
            code,
        }
    }

    /// Create a reference data error for the named table
    pub fn reference_data(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        UltraError::ReferenceData {
            source_name: source_name.into(),
            msg: msg.into(),
        }
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        UltraError::Model { msg: msg.into() }
    }

    /// Create a feature schema error
    pub fn feature_schema(feature: impl Into<String>, msg: impl Into<String>) -> Self {
        UltraError::FeatureSchema {
            feature: feature.into(),
            msg: msg.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            UltraError::InvalidVariant { code, .. } => *code,
            UltraError::MissingReferenceData { .. } => ErrorCode::MissingReferenceData,
            UltraError::ReferenceData { .. } => ErrorCode::InvalidReferenceData,
            UltraError::TranscriptNotFound { .. } => ErrorCode::TranscriptNotFound,
            UltraError::OutOfBoundsVariant { .. } => ErrorCode::OutOfBounds,
            UltraError::ReferenceMismatch { .. } => ErrorCode::ReferenceMismatch,
            UltraError::FeatureSchema { .. } => ErrorCode::FeatureSchema,
            UltraError::Model { .. } => ErrorCode::InvalidModel,
            UltraError::Config { .. } => ErrorCode::ConfigError,
            UltraError::Interrupted { .. } => ErrorCode::Interrupted,
            UltraError::Io { .. } => ErrorCode::IoError,
            UltraError::Json { .. } => ErrorCode::JsonError,
        }
    }

    /// Whether the error only affects a single input row
    ///
    /// Row-level errors are reported in the output instead of aborting the run.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            UltraError::InvalidVariant { .. }
                | UltraError::OutOfBoundsVariant { .. }
                | UltraError::ReferenceMismatch { .. }
                | UltraError::FeatureSchema { .. }
        )
    }

    /// Message prefixed with the error code, as written to logs
    pub fn detailed_message(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

impl From<std::io::Error> for UltraError {
    fn from(err: std::io::Error) -> Self {
        UltraError::Io {
            msg: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for UltraError {
    fn from(err: serde_json::Error) -> Self {
        UltraError::Json {
            msg: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for UltraError {
    fn from(err: toml::de::Error) -> Self {
        UltraError::Config {
            msg: err.to_string(),
        }
    }
}
