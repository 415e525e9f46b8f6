//! Batch annotation of an input stream.
//!
//! This module drives the pipeline over a whole input: rows are read in
//! chunks, annotated (in parallel with the `parallel` feature), and written
//! in input order, with progress callbacks, cancellation and run statistics.
//!
//! # Examples
//!
//! ```no_run
//! use std::io::BufReader;
//! use ferro_uorf::batch::{BatchConfig, BatchProcessor};
//! use ferro_uorf::config::DataPaths;
//! use ferro_uorf::output::{OutputOptions, OutputWriter};
//! use ferro_uorf::pipeline::{AnnotateOptions, AnnotationContext, Annotator};
//! use ferro_uorf::variant::InputReader;
//!
//! # fn main() -> Result<(), ferro_uorf::UltraError> {
//! let context = AnnotationContext::load(&DataPaths::new("/data/5ULTRA"), None)?;
//! let processor = BatchProcessor::with_config(
//!     Annotator::new(&context, AnnotateOptions::default()),
//!     BatchConfig::new().with_chunk_size(500),
//! );
//!
//! let input = std::fs::File::open("variants.tsv")?;
//! let mut reader = InputReader::new(BufReader::new(input));
//! let mut writer = OutputWriter::new(std::io::stdout(), OutputOptions::default());
//!
//! let stats = processor.run_with_progress(&mut reader, &mut writer, |progress| {
//!     eprintln!("{} rows, {:.0}/s", progress.processed, progress.items_per_second());
//! })?;
//! eprintln!("{} rows with a uORF or Kozak effect", stats.effect);
//! # Ok(())
//! # }
//! ```

mod processor;

pub use processor::{BatchConfig, BatchProcessor, BatchProgress, BatchStats};
