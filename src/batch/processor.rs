//! Batch processor implementation.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::UltraError;
use crate::output::{passthrough_names, OutputWriter};
use crate::pipeline::{AnnotatedVariant, Annotator};
use crate::variant::{InputReader, InputRecord};

#[cfg(feature = "parallel")]
type Pool = Option<rayon::ThreadPool>;
#[cfg(not(feature = "parallel"))]
type Pool = ();

/// Configuration for batch processing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Input rows annotated per chunk.
    pub chunk_size: usize,
    /// Worker threads (0 = use rayon default).
    pub num_threads: usize,
    /// Stop starting new chunks after this long.
    pub timeout: Option<Duration>,
    /// Stop starting new chunks once set.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            num_threads: 0,
            timeout: None,
            cancel: None,
        }
    }
}

impl BatchConfig {
    /// Create a new batch configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set the number of worker threads.
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Set the run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share a cancellation flag with the caller.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

/// Progress information, reported after each chunk.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Rows written so far.
    pub processed: usize,
    /// Rows with a uORF or Kozak effect so far.
    pub effect: usize,
    /// Unannotatable rows so far.
    pub unannotatable: usize,
    /// Time elapsed since start.
    pub elapsed: Duration,
}

impl BatchProgress {
    /// Calculate processing rate (items per second).
    ///
    /// Returns 0.0 if no time has elapsed yet.
    pub fn items_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs < f64::EPSILON {
            0.0
        } else {
            self.processed as f64 / secs
        }
    }
}

/// Statistics from a batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    /// Rows written
    pub total: usize,
    /// Rows whose primary consequence is a uORF or Kozak change
    pub effect: usize,
    /// Rows annotated as `No effect`
    pub no_effect: usize,
    /// Rows that could not be placed on any transcript
    pub unannotatable: usize,
    /// Annotated rows with a score
    pub scored: usize,
    /// Annotated rows whose score is NA
    pub score_na: usize,
    /// Wall-clock time of the run
    pub duration: Duration,
}

impl BatchStats {
    /// Count one annotated row
    pub fn record(&mut self, annotated: &AnnotatedVariant) {
        self.total += 1;
        if !annotated.is_annotated() {
            self.unannotatable += 1;
            return;
        }
        if annotated.consequence().has_effect() {
            self.effect += 1;
        } else {
            self.no_effect += 1;
        }
        if annotated.score().is_some() {
            self.scored += 1;
        } else {
            self.score_na += 1;
        }
    }

    /// Add the counters of another (chunk-level) tally
    pub fn merge(&mut self, other: &BatchStats) {
        self.total += other.total;
        self.effect += other.effect;
        self.no_effect += other.no_effect;
        self.unannotatable += other.unannotatable;
        self.scored += other.scored;
        self.score_na += other.score_na;
    }

    /// Rows annotated on at least one transcript
    pub fn annotated(&self) -> usize {
        self.effect + self.no_effect
    }

    /// Fraction of rows annotated on at least one transcript
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.annotated() as f64 / self.total as f64
        }
    }

    /// Processing rate (rows per second).
    pub fn items_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs < f64::EPSILON {
            0.0
        } else {
            self.total as f64 / secs
        }
    }
}

/// Streams input rows through an [`Annotator`] into an [`OutputWriter`].
pub struct BatchProcessor<'a> {
    annotator: Annotator<'a>,
    config: BatchConfig,
}

impl<'a> BatchProcessor<'a> {
    /// Create a new batch processor.
    pub fn new(annotator: Annotator<'a>) -> Self {
        Self::with_config(annotator, BatchConfig::default())
    }

    /// Create a new batch processor with configuration.
    pub fn with_config(annotator: Annotator<'a>, config: BatchConfig) -> Self {
        Self { annotator, config }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Annotate every row of `reader` into `writer`.
    pub fn run<R: BufRead, W: Write>(
        &self,
        reader: &mut InputReader<R>,
        writer: &mut OutputWriter<W>,
    ) -> Result<BatchStats, UltraError> {
        self.run_with_progress(reader, writer, |_| {})
    }

    /// Annotate every row with a progress callback after each chunk.
    ///
    /// The header is written once the first chunk has been read, so that
    /// pass-through column names are known. Rows are written in input order.
    /// Cancellation and the timeout are checked before each chunk; when
    /// either fires, the rows already written stay written and the run
    /// fails with [`UltraError::Interrupted`].
    pub fn run_with_progress<R, W, F>(
        &self,
        reader: &mut InputReader<R>,
        writer: &mut OutputWriter<W>,
        mut progress_fn: F,
    ) -> Result<BatchStats, UltraError>
    where
        R: BufRead,
        W: Write,
        F: FnMut(BatchProgress),
    {
        let start = Instant::now();
        let pool = self.build_pool()?;
        let mut stats = BatchStats::default();

        loop {
            if let Some(reason) = self.interruption(start) {
                writer.flush()?;
                log::warn!("Stopping after {} rows: {}", stats.total, reason);
                return Err(UltraError::Interrupted {
                    processed: stats.total,
                });
            }

            let chunk = reader.next_chunk(self.config.chunk_size.max(1))?;
            if !writer.header_written() {
                writer.write_header(passthrough_names(reader.header(), chunk.first()))?;
            }
            if chunk.is_empty() {
                break;
            }

            let annotated = self.annotate_chunk(&pool, chunk);
            let mut chunk_stats = BatchStats::default();
            for row in &annotated {
                writer.write(row)?;
                chunk_stats.record(row);
            }
            stats.merge(&chunk_stats);

            progress_fn(BatchProgress {
                processed: stats.total,
                effect: stats.effect,
                unannotatable: stats.unannotatable,
                elapsed: start.elapsed(),
            });
        }

        writer.flush()?;
        stats.duration = start.elapsed();
        log::info!(
            "Annotated {} rows in {:.2?} ({} with effect, {} no effect, {} unannotatable, {} score NA)",
            stats.total,
            stats.duration,
            stats.effect,
            stats.no_effect,
            stats.unannotatable,
            stats.score_na
        );
        Ok(stats)
    }

    fn interruption(&self, start: Instant) -> Option<&'static str> {
        if self
            .config
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Some("cancelled");
        }
        match self.config.timeout {
            Some(timeout) if start.elapsed() >= timeout => Some("timeout reached"),
            _ => None,
        }
    }

    #[cfg(feature = "parallel")]
    fn build_pool(&self) -> Result<Pool, UltraError> {
        crate::parallel::ParallelConfig::new()
            .with_chunk_size(self.config.chunk_size)
            .with_num_threads(self.config.num_threads)
            .build_pool()
    }

    #[cfg(not(feature = "parallel"))]
    fn build_pool(&self) -> Result<Pool, UltraError> {
        if self.config.num_threads > 1 {
            log::warn!("Built without the parallel feature; annotating on one thread");
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn annotate_chunk(&self, pool: &Pool, chunk: Vec<InputRecord>) -> Vec<AnnotatedVariant> {
        crate::parallel::annotate_parallel(pool.as_ref(), &self.annotator, chunk)
    }

    #[cfg(not(feature = "parallel"))]
    fn annotate_chunk(&self, _pool: &Pool, chunk: Vec<InputRecord>) -> Vec<AnnotatedVariant> {
        chunk
            .into_iter()
            .map(|record| self.annotator.annotate(record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputOptions;
    use crate::pipeline::testing::single_transcript_context;
    use crate::pipeline::AnnotateOptions;
    use std::io::Cursor;

    const INPUT: &str = "##source=test\n\
#CHROM\tPOS\tID\tREF\tALT\tSAMPLE\n\
chr2\t101\tv1\tG\tT\ts1\n\
chr2\t5000\tv2\tA\tG\ts2\n\
chr2\tbad\tv3\tA\tG\ts3\n\
chr2\t103\tv4\tG\tA\n";

    fn run(config: BatchConfig, options: OutputOptions) -> (Result<BatchStats, UltraError>, String) {
        let context = single_transcript_context(0.75);
        let processor =
            BatchProcessor::with_config(Annotator::new(&context, AnnotateOptions::default()), config);
        let mut reader = InputReader::new(Cursor::new(INPUT));
        let mut writer = OutputWriter::new(Vec::new(), options);
        let result = processor.run(&mut reader, &mut writer);
        (result, String::from_utf8(writer.into_inner()).unwrap())
    }

    #[test]
    fn test_batch_config_builder_chain() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = BatchConfig::new()
            .with_chunk_size(0)
            .with_num_threads(3)
            .with_timeout(Duration::from_secs(5))
            .with_cancel_flag(flag.clone());
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.num_threads, 3);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(config.cancel.is_some());
    }

    #[test]
    fn test_one_row_per_input_row() {
        let (result, text) = run(BatchConfig::new().with_chunk_size(2), OutputOptions::default());
        let stats = result.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.no_effect, 2);
        assert_eq!(stats.unannotatable, 2);
        assert_eq!(stats.scored, 2);
        assert_eq!(stats.annotated(), 2);
        assert!((stats.success_rate() - 0.5).abs() < 1e-12);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("#CHROM\tPOS"));
        assert_eq!(
            lines[1],
            "chr2\t101\tv1\tG\tT\tNo effect\tGENEP\tNM_P.1\tNA\t0.7500"
        );
        assert_eq!(lines[2], "chr2\t5000\tv2\tA\tG\tUnannotatable\tNA\tNA\tNA\tNA");
        assert!(lines[3].starts_with("chr2\tbad\tv3\tA\tG\tUnannotatable"));
        assert!(lines[4].starts_with("chr2\t103\tv4\tG\tA\tNo effect"));
    }

    #[test]
    fn test_full_mode_passthrough() {
        let (result, text) = run(
            BatchConfig::new(),
            OutputOptions {
                splice: false,
                full: true,
            },
        );
        result.unwrap();
        let lines: Vec<Vec<&str>> = text.lines().map(|l| l.split('\t').collect()).collect();
        let width = lines[0].len();
        assert_eq!(lines[0][width - 1], "SAMPLE");
        assert!(lines.iter().all(|l| l.len() == width));
        assert_eq!(lines[1][width - 1], "s1");
        assert_eq!(lines[4][width - 1], "NA");
        // MANE of the annotated row, NA for the unannotatable one
        assert_eq!(lines[1][10], "True");
        assert_eq!(lines[2][10], "NA");
    }

    #[test]
    fn test_cancelled_run_is_interrupted() {
        let flag = Arc::new(AtomicBool::new(true));
        let (result, text) = run(BatchConfig::new().with_cancel_flag(flag), OutputOptions::default());
        assert_eq!(result, Err(UltraError::Interrupted { processed: 0 }));
        assert!(text.is_empty());
    }

    #[test]
    fn test_timeout_interrupts() {
        let (result, _) = run(
            BatchConfig::new().with_timeout(Duration::ZERO),
            OutputOptions::default(),
        );
        assert!(matches!(result, Err(UltraError::Interrupted { .. })));
    }

    #[test]
    fn test_empty_input_writes_header() {
        let context = single_transcript_context(0.75);
        let processor = BatchProcessor::new(Annotator::new(&context, AnnotateOptions::default()));
        let mut reader = InputReader::new(Cursor::new(""));
        let mut writer = OutputWriter::new(Vec::new(), OutputOptions::default());
        let stats = processor.run(&mut reader, &mut writer).unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(writer.rows_written(), 0);
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_batch_stats_merge() {
        let mut a = BatchStats {
            total: 3,
            effect: 1,
            no_effect: 1,
            unannotatable: 1,
            scored: 2,
            score_na: 0,
            duration: Duration::ZERO,
        };
        let b = a.clone();
        a.merge(&b);
        assert_eq!(a.total, 6);
        assert_eq!(a.annotated(), 4);
        assert_eq!(a.items_per_second(), 0.0);
    }
}
