//! Conservation score lookup
//!
//! A track is a directory of per-chromosome interval files named
//! `<chrom>.bed.gz` or `<chrom>.bed`. Each line holds `chrom start end ... value`
//! with a 0-based half-open interval and the score in the last column.
//! Chromosomes are loaded on first use and shared by every worker.

use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::UltraError;
use crate::io::open_reader;
use crate::reference::normalize_chrom;

/// Conservation tracks consulted per uORF start codon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    PhyloP,
    PhastCons,
}

impl Track {
    /// Directory name of the track under the data directory
    pub fn dir_name(&self) -> &'static str {
        match self {
            Track::PhyloP => "5UTR.hg38.phyloP100way",
            Track::PhastCons => "5UTR.hg38.phastCons100way",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::PhyloP => write!(f, "phyloP"),
            Track::PhastCons => write!(f, "phastCons"),
        }
    }
}

/// One scored interval, 0-based half-open
#[derive(Debug, Clone, Copy, PartialEq)]
struct Interval {
    start: u64,
    end: u64,
    value: f64,
}

/// Position-sorted intervals of one chromosome
#[derive(Debug, Default)]
struct ChromTrack {
    intervals: Vec<Interval>,
    /// `max_end[i]` is the largest end among `intervals[..=i]`
    max_end: Vec<u64>,
}

impl ChromTrack {
    fn from_reader(name: &str, reader: impl BufRead) -> Result<Self, UltraError> {
        let mut intervals = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let parsed = (fields.len() >= 4)
                .then(|| {
                    let start = fields[1].parse::<u64>().ok()?;
                    let end = fields[2].parse::<u64>().ok()?;
                    let value = fields[fields.len() - 1].parse::<f64>().ok()?;
                    (start < end).then_some(Interval { start, end, value })
                })
                .flatten();
            match parsed {
                Some(interval) => intervals.push(interval),
                None => {
                    return Err(UltraError::reference_data(
                        name,
                        format!("line {}: malformed interval '{}'", idx + 1, line),
                    ))
                }
            }
        }
        Ok(Self::from_intervals(intervals))
    }

    fn from_intervals(mut intervals: Vec<Interval>) -> Self {
        intervals.sort_by_key(|i| (i.start, i.end));
        let max_end = intervals
            .iter()
            .scan(0u64, |max, i| {
                *max = (*max).max(i.end);
                Some(*max)
            })
            .collect();
        Self { intervals, max_end }
    }

    /// Coverage-weighted mean over `[start, end)`
    fn mean(&self, start: u64, end: u64) -> Option<f64> {
        // Nothing before `lower` reaches past `start`; nothing from `upper`
        // on starts before `end`.
        let lower = self.max_end.partition_point(|&e| e <= start);
        let upper = self.intervals.partition_point(|i| i.start < end);
        if lower >= upper {
            return None;
        }
        let (sum, covered) = self.intervals[lower..upper]
            .iter()
            .filter(|i| i.end > start)
            .fold((0.0, 0u64), |(sum, covered), i| {
                let overlap = i.end.min(end) - i.start.max(start);
                (sum + i.value * overlap as f64, covered + overlap)
            });
        (covered > 0).then(|| sum / covered as f64)
    }
}

/// Lookup of per-position conservation scores
pub trait ConservationSource {
    /// Mean score over the 1-based inclusive interval `start..=end`, or None
    /// when no position is covered
    fn mean_score(&self, track: Track, chrom: &str, start: u64, end: u64) -> Option<f64>;
}

/// File-backed conservation tracks with a per-chromosome cache
#[derive(Debug)]
pub struct ConservationLookup {
    root: PathBuf,
    cache: RwLock<HashMap<(Track, String), Arc<ChromTrack>>>,
}

impl ConservationLookup {
    /// Use the tracks under `root` (the reference data directory)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Directory of one track
    pub fn track_dir(&self, track: Track) -> PathBuf {
        self.root.join(track.dir_name())
    }

    /// Number of chromosome tracks currently cached
    pub fn cached(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    fn chrom_file(&self, track: Track, chrom: &str) -> Option<PathBuf> {
        let dir = self.track_dir(track);
        let bare = normalize_chrom(chrom);
        [format!("chr{}", bare), bare]
            .iter()
            .flat_map(|name| [format!("{}.bed.gz", name), format!("{}.bed", name)])
            .map(|file| dir.join(file))
            .find(|path| path.is_file())
    }

    fn load(path: &Path) -> Result<ChromTrack, UltraError> {
        let reader = open_reader(path)?;
        ChromTrack::from_reader(&path.display().to_string(), reader)
    }

    /// Load a chromosome, retrying once on failure
    fn chrom_track(&self, track: Track, chrom: &str) -> Option<Arc<ChromTrack>> {
        let key = (track, normalize_chrom(chrom));
        if let Some(cached) = self.cache.read().ok()?.get(&key) {
            return Some(Arc::clone(cached));
        }

        let loaded = match self.chrom_file(track, chrom) {
            None => {
                log::debug!("no {} track for {}", track, chrom);
                ChromTrack::default()
            }
            Some(path) => match Self::load(&path).or_else(|first| {
                log::debug!("retrying {}: {}", path.display(), first);
                Self::load(&path)
            }) {
                Ok(loaded) => {
                    log::debug!(
                        "loaded {} {} intervals from {}",
                        loaded.intervals.len(),
                        track,
                        path.display()
                    );
                    loaded
                }
                Err(e) => {
                    // Not cached, so a later variant may try again
                    log::warn!("{} scores unavailable for {}: {}", track, chrom, e);
                    return None;
                }
            },
        };

        let mut cache = self.cache.write().ok()?;
        let entry = cache.entry(key).or_insert_with(|| Arc::new(loaded));
        Some(Arc::clone(entry))
    }
}

impl ConservationSource for ConservationLookup {
    fn mean_score(&self, track: Track, chrom: &str, start: u64, end: u64) -> Option<f64> {
        let (lo, hi) = (start.min(end), start.max(end));
        if lo == 0 {
            return None;
        }
        self.chrom_track(track, chrom)?.mean(lo - 1, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    const BED: &str = "track name=test\nchr1\t100\t102\t1.0\nchr1\t102\t103\t4.0\nchr1\t200\t210\t-2.5\n";

    fn write_track(dir: &Path, track: Track, file: &str, content: &str) {
        let track_dir = dir.join(track.dir_name());
        std::fs::create_dir_all(&track_dir).unwrap();
        let path = track_dir.join(file);
        if file.ends_with(".gz") {
            let mut enc = GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::default());
            enc.write_all(content.as_bytes()).unwrap();
            enc.finish().unwrap();
        } else {
            std::fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn test_chrom_track_mean() {
        let track = ChromTrack::from_reader("test", Cursor::new(BED)).unwrap();
        // 1-based 101..=103 is 0-based [100, 103)
        assert_eq!(track.mean(100, 103), Some(2.0));
        assert_eq!(track.mean(101, 102), Some(1.0));
        assert_eq!(track.mean(150, 160), None);
        assert_eq!(track.mean(205, 215), Some(-2.5));
    }

    #[test]
    fn test_chrom_track_mean_dense() {
        let intervals = (0..10_000u64)
            .map(|i| Interval {
                start: i * 10,
                end: i * 10 + 10,
                value: i as f64,
            })
            .collect();
        let track = ChromTrack::from_intervals(intervals);
        assert_eq!(track.mean(50_000, 50_010), Some(5000.0));
        assert_eq!(track.mean(50_005, 50_015), Some(5000.5));
        assert_eq!(track.mean(100_000, 100_010), None);
    }

    #[test]
    fn test_chrom_track_mean_nested_interval() {
        // A long interval still covers positions past shorter ones nested in it
        let bed = "chr1\t0\t100\t2.0\nchr1\t50\t51\t5.0\nchr1\t52\t53\t8.0\n";
        let track = ChromTrack::from_reader("nested", Cursor::new(bed)).unwrap();
        assert_eq!(track.mean(60, 61), Some(2.0));
        assert_eq!(track.mean(50, 51), Some(3.5));
        assert_eq!(track.mean(99, 101), Some(2.0));
        assert_eq!(track.mean(100, 101), None);
    }

    #[test]
    fn test_chrom_track_malformed() {
        let err = ChromTrack::from_reader("bad", Cursor::new("chr1\tx\t10\t1.0\n")).unwrap_err();
        assert!(matches!(err, UltraError::ReferenceData { .. }));
    }

    #[test]
    fn test_lookup_plain_and_gz() {
        let dir = TempDir::new().unwrap();
        write_track(dir.path(), Track::PhyloP, "chr1.bed", BED);
        write_track(dir.path(), Track::PhastCons, "chr1.bed.gz", BED);
        let lookup = ConservationLookup::new(dir.path());

        assert_eq!(lookup.mean_score(Track::PhyloP, "chr1", 101, 103), Some(2.0));
        assert_eq!(lookup.mean_score(Track::PhastCons, "1", 101, 103), Some(2.0));
        // Minus-strand intervals arrive reversed
        assert_eq!(lookup.mean_score(Track::PhyloP, "chr1", 103, 101), Some(2.0));
        assert_eq!(lookup.cached(), 2);
    }

    #[test]
    fn test_lookup_missing_coverage_is_na() {
        let dir = TempDir::new().unwrap();
        write_track(dir.path(), Track::PhyloP, "chr1.bed", BED);
        let lookup = ConservationLookup::new(dir.path());

        assert_eq!(lookup.mean_score(Track::PhyloP, "chr1", 500, 502), None);
        assert_eq!(lookup.mean_score(Track::PhyloP, "chr2", 101, 103), None);
        assert_eq!(lookup.mean_score(Track::PhastCons, "chr1", 101, 103), None);
    }

    #[test]
    fn test_lookup_unreadable_track_is_na() {
        let dir = TempDir::new().unwrap();
        write_track(dir.path(), Track::PhyloP, "chr3.bed", "chr3\tbad\n");
        let lookup = ConservationLookup::new(dir.path());
        assert_eq!(lookup.mean_score(Track::PhyloP, "chr3", 1, 3), None);
        assert_eq!(lookup.cached(), 0);
    }
}
