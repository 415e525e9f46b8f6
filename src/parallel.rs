//! Parallel annotation support for ferro-uorf
//!
//! This module annotates chunks of input rows in parallel using rayon.
//! Enable with the `parallel` feature.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "parallel")]
//! # fn main() -> Result<(), ferro_uorf::UltraError> {
//! use ferro_uorf::config::DataPaths;
//! use ferro_uorf::parallel::{annotate_parallel, ParallelConfig};
//! use ferro_uorf::pipeline::{AnnotateOptions, AnnotationContext, Annotator};
//! use ferro_uorf::variant::InputRecord;
//!
//! let context = AnnotationContext::load(&DataPaths::new("/data/5ULTRA"), None)?;
//! let annotator = Annotator::new(&context, AnnotateOptions::default());
//! let rows = vec![InputRecord::new(0, 1, "chr1\t1000\t.\tA\tG")];
//!
//! let pool = ParallelConfig::new().with_num_threads(4).build_pool()?;
//! let annotated = annotate_parallel(pool.as_ref(), &annotator, rows);
//! assert_eq!(annotated.len(), 1);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "parallel"))]
//! # fn main() {}
//! ```

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::UltraError;
use crate::pipeline::{AnnotatedVariant, Annotator};
use crate::variant::InputRecord;

/// Annotate rows in parallel
///
/// Returns one result per row. Order is preserved. When `pool` is None the
/// global rayon pool is used.
pub fn annotate_parallel(
    pool: Option<&ThreadPool>,
    annotator: &Annotator<'_>,
    records: Vec<InputRecord>,
) -> Vec<AnnotatedVariant> {
    let run = move || -> Vec<AnnotatedVariant> {
        records
            .into_par_iter()
            .map(|record| annotator.annotate(record))
            .collect()
    };
    match pool {
        Some(pool) => pool.install(run),
        None => run(),
    }
}

/// Configuration for parallel batch processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Input rows per chunk
    pub chunk_size: usize,
    /// Number of threads (0 = use rayon default)
    pub num_threads: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            num_threads: 0,
        }
    }
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size for batched processing
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the number of threads
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// A dedicated pool when a thread count is set
    pub fn build_pool(&self) -> Result<Option<ThreadPool>, UltraError> {
        if self.num_threads == 0 {
            return Ok(None);
        }
        ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|i| format!("ferro-uorf-{}", i))
            .build()
            .map(Some)
            .map_err(|e| UltraError::Config {
                msg: format!("cannot start {} worker threads: {}", self.num_threads, e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Consequence;
    use crate::pipeline::testing::single_transcript_context;
    use crate::pipeline::AnnotateOptions;

    fn rows(n: usize) -> Vec<InputRecord> {
        // Alternate between an in-UTR SNV and a row outside every transcript
        (0..n)
            .map(|i| {
                let (pos, base) = if i % 2 == 0 {
                    (101 + (i % 10) as u64, "G")
                } else {
                    (5000, "A")
                };
                InputRecord::new(i, i + 1, &format!("chr2\t{}\tv{}\t{}\tT", pos, i, base))
            })
            .collect()
    }

    #[test]
    fn test_annotate_parallel_preserves_order() {
        let context = single_transcript_context(0.75);
        let annotator = Annotator::new(&context, AnnotateOptions::default());
        let results = annotate_parallel(None, &annotator, rows(200));
        assert_eq!(results.len(), 200);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.input.index, i);
            assert_eq!(result.input.id(), format!("v{}", i));
            if i % 2 == 1 {
                assert_eq!(result.consequence(), Consequence::Unannotatable);
            } else {
                assert!(result.is_annotated(), "row {}", i);
            }
        }
    }

    #[test]
    fn test_dedicated_pool_matches_global() {
        let context = single_transcript_context(0.75);
        let annotator = Annotator::new(&context, AnnotateOptions::default());
        let pool = ParallelConfig::new().with_num_threads(2).build_pool().unwrap();
        assert!(pool.is_some());
        let a = annotate_parallel(pool.as_ref(), &annotator, rows(50));
        let b = annotate_parallel(None, &annotator, rows(50));
        assert_eq!(a, b);
    }

    #[test]
    fn test_stress_empty_input() {
        let context = single_transcript_context(0.75);
        let annotator = Annotator::new(&context, AnnotateOptions::default());
        assert!(annotate_parallel(None, &annotator, Vec::new()).is_empty());
    }

    #[test]
    fn test_parallel_config_variations() {
        let config = ParallelConfig::new().with_chunk_size(100).with_num_threads(2);
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.num_threads, 2);

        let config = ParallelConfig::new();
        assert_eq!(config.chunk_size, 1000);
        assert!(config.build_pool().unwrap().is_none());
    }
}
