// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-uorf: 5' UTR variant annotation
//!
//! Part of the ferro bioinformatics toolkit.
//!
//! Annotates small variants in 5' untranslated regions with their effect on
//! upstream open reading frames (uORFs) and on the Kozak context of the
//! main start codon, then scores each consequence with a pretrained
//! classifier.
//!
//! # Example
//!
//! ```no_run
//! use ferro_uorf::config::DataPaths;
//! use ferro_uorf::pipeline::{AnnotateOptions, AnnotationContext, Annotator};
//! use ferro_uorf::variant::InputRecord;
//!
//! # fn main() -> ferro_uorf::Result<()> {
//! // Load the reference tables, conservation tracks and model
//! let context = AnnotationContext::load(&DataPaths::new("/data/5ULTRA"), None)?;
//! let annotator = Annotator::new(&context, AnnotateOptions::default());
//!
//! // Annotate one tab-separated row
//! let row = InputRecord::new(0, 1, "chr1\t1013497\t.\tA\tG");
//! let annotated = annotator.annotate(row);
//! println!("{} {:?}", annotated.consequence(), annotated.score());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod conservation;
pub mod coords;
pub mod effect;
pub mod error;
pub mod features;
pub mod io;
pub mod kozak;
pub mod mutation;
pub mod output;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod pipeline;
pub mod reference;
pub mod scoring;
pub mod sequence;
pub mod splicing;
pub mod uorf;
pub mod variant;

// Re-export commonly used types
pub use batch::{BatchConfig, BatchProcessor, BatchStats};
pub use config::{DataPaths, UltraConfig};
pub use effect::{Consequence, TranslationEffect, UorfType};
pub use error::{ErrorCode, UltraError};
pub use kozak::{KozakContext, KozakStrength};
pub use output::{OutputOptions, OutputWriter};
pub use pipeline::{AnnotateOptions, AnnotatedVariant, AnnotationContext, Annotator};
pub use reference::{ReferenceIndex, TranscriptUtr, UorfRecord};
pub use variant::{InputReader, InputRecord, Variant};

/// Result type alias for ferro-uorf operations
pub type Result<T> = std::result::Result<T, UltraError>;
