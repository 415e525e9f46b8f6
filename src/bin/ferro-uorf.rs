// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-uorf CLI
//!
//! Command-line interface for 5' UTR variant annotation.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use ferro_uorf::batch::{BatchConfig, BatchProcessor, BatchProgress, BatchStats};
use ferro_uorf::config::{expand_home, DataPaths, UltraConfig};
use ferro_uorf::io::open_reader;
use ferro_uorf::output::{OutputOptions, OutputWriter};
use ferro_uorf::pipeline::{AnnotateOptions, AnnotationContext, Annotator};
use ferro_uorf::scoring::RandomForest;
use ferro_uorf::splicing::DEFAULT_SPLICE_CUTOFF;
use ferro_uorf::variant::InputReader;
use ferro_uorf::{ReferenceIndex, UltraError};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "ferro-uorf")]
#[command(author, version, about = "5' UTR variant annotator for uORF and Kozak effects")]
#[command(
    long_about = "Annotate 5' UTR variants with their effect on upstream open reading frames
and on the Kozak context of the main start codon, and score each effect.

Examples:
  ferro-uorf annotate -i variants.tsv
  ferro-uorf annotate -i variants.vcf.gz -o annotated.tsv --full
  ferro-uorf annotate -i variants.tsv --splice spliceai.tsv --mane
  ferro-uorf check --data-dir ~/.5ULTRA/data"
)]
struct Cli {
    /// Log level or filter directive (e.g. debug, ferro_uorf=trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate a tab-separated variant file
    Annotate {
        /// Input file with CHROM, POS, ID, REF, ALT columns (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (use - for stdout) [default: <input stem>.uorf.tsv]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reference data directory [default: ~/.5ULTRA/data]
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Splicing predictor output to merge (CHROM, POS, REF, ALT, SpliceAI)
        #[arg(long)]
        splice: Option<PathBuf>,

        /// SpliceAI delta-score cutoff
        #[arg(long)]
        splice_cutoff: Option<f64>,

        /// Write every feature column and the input's extra columns
        #[arg(long)]
        full: bool,

        /// Only annotate MANE Select transcripts
        #[arg(long)]
        mane: bool,

        /// Worker threads (0 = all cores)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Rows per parallel chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Stop starting new chunks after this many seconds (Ctrl-C stops the
        /// same way)
        #[arg(long)]
        timeout: Option<u64>,

        /// Hide the progress spinner
        #[arg(long)]
        quiet: bool,
    },

    /// Verify the reference data directory and classifier artifact
    Check {
        /// Reference data directory [default: ~/.5ULTRA/data]
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    let config = UltraConfig::load()?;

    let result = match cli.command {
        Commands::Annotate {
            input,
            output,
            data_dir,
            splice,
            splice_cutoff,
            full,
            mane,
            threads,
            chunk_size,
            timeout,
            quiet,
        } => {
            let data_dir = data_dir.map(expand_home).unwrap_or_else(|| config.data_dir());
            let options = RunOptions {
                output: output.unwrap_or_else(|| default_output(&input)),
                input,
                paths: DataPaths::new(data_dir),
                splice,
                splice_cutoff: splice_cutoff
                    .or(config.splice_cutoff)
                    .unwrap_or(DEFAULT_SPLICE_CUTOFF),
                full: full || config.full.unwrap_or(false),
                mane: mane || config.mane.unwrap_or(false),
                threads: threads.or(config.threads).unwrap_or(0),
                chunk_size: chunk_size.or(config.chunk_size).unwrap_or(1000),
                timeout: timeout.or(config.timeout_seconds).map(Duration::from_secs),
                quiet,
            };
            run_annotate(&options).map(|_| ())
        }
        Commands::Check { data_dir } => {
            let data_dir = data_dir.map(expand_home).unwrap_or_else(|| config.data_dir());
            run_check(&DataPaths::new(data_dir))
        }
    };

    if let Err(e) = &result {
        error!("{}", e.detailed_message());
    }
    result.map_err(Into::into)
}

fn init_tracing(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}

/// Resolved settings of one annotate run (CLI over config file over defaults)
struct RunOptions {
    input: PathBuf,
    output: PathBuf,
    paths: DataPaths,
    splice: Option<PathBuf>,
    splice_cutoff: f64,
    full: bool,
    mane: bool,
    threads: usize,
    chunk_size: usize,
    timeout: Option<Duration>,
    quiet: bool,
}

/// `<input stem>.uorf.tsv` next to the input; compression suffixes are dropped
fn default_output(input: &Path) -> PathBuf {
    if is_std_stream(input) {
        return PathBuf::from("-");
    }
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}.uorf.tsv", stem))
}

fn is_std_stream(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// First interrupt finishes the current chunk and stops; a second exits at once
fn interrupt_handler(cancel: Arc<AtomicBool>) -> impl FnMut() + Send + 'static {
    move || {
        if cancel.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
        warn!("Interrupted, finishing the current chunk");
    }
}

fn run_annotate(options: &RunOptions) -> Result<BatchStats, UltraError> {
    let splicing = options
        .splice
        .as_deref()
        .map(|path| (path, options.splice_cutoff));
    let context = AnnotationContext::load(&options.paths, splicing)?;
    let annotator = Annotator::new(
        &context,
        AnnotateOptions {
            mane_only: options.mane,
        },
    );

    let cancel = Arc::new(AtomicBool::new(false));
    if let Err(e) = ctrlc::set_handler(interrupt_handler(Arc::clone(&cancel))) {
        warn!("Ctrl-C will not stop the run cleanly: {}", e);
    }
    let mut batch_config = BatchConfig::new()
        .with_chunk_size(options.chunk_size)
        .with_num_threads(options.threads)
        .with_cancel_flag(cancel);
    if let Some(timeout) = options.timeout {
        batch_config = batch_config.with_timeout(timeout);
    }
    let processor = BatchProcessor::with_config(annotator, batch_config);

    let input: Box<dyn BufRead + Send> = if is_std_stream(&options.input) {
        Box::new(BufReader::new(io::stdin()))
    } else {
        open_reader(&options.input)?
    };
    let mut reader = InputReader::new(input);
    let output_options = OutputOptions {
        splice: options.splice.is_some(),
        full: options.full,
    };

    let progress = (!options.quiet).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("[{elapsed_precise}] {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(200));
        pb
    });
    let on_progress = |p: BatchProgress| {
        if let Some(pb) = &progress {
            pb.set_message(format!(
                "{} rows, {} with effect ({:.0} rows/s)",
                p.processed,
                p.effect,
                p.items_per_second()
            ));
        }
    };

    let start = Instant::now();
    let stats = if is_std_stream(&options.output) {
        let mut writer = OutputWriter::new(BufWriter::new(io::stdout().lock()), output_options);
        processor.run_with_progress(&mut reader, &mut writer, on_progress)
    } else {
        let partial = partial_path(&options.output);
        let file = File::create(&partial)?;
        let mut writer = OutputWriter::new(BufWriter::new(file), output_options);
        let stats = processor.run_with_progress(&mut reader, &mut writer, on_progress);
        if stats.is_ok() {
            writer.into_inner().flush()?;
            fs::rename(&partial, &options.output)?;
        } else {
            info!("Completed rows kept in {}", partial.display());
        }
        stats
    };

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let stats = stats?;
    info!(
        "Wrote {} rows to {} in {:.2?}: {} with effect, {} no effect, {} unannotatable",
        stats.total,
        options.output.display(),
        start.elapsed(),
        stats.effect,
        stats.no_effect,
        stats.unannotatable
    );
    Ok(stats)
}

fn run_check(paths: &DataPaths) -> Result<(), UltraError> {
    paths.verify()?;
    let index = ReferenceIndex::load(&paths.utrs, &paths.uorfs)?;
    let forest = RandomForest::load(&paths.model)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Data directory: {}", paths.root.display())?;
    writeln!(out, "  transcripts: {}", index.len())?;
    writeln!(out, "  model trees: {}", forest.n_trees())?;
    writeln!(out, "OK")?;
    Ok(())
}
