//! Configuration file support for ferro-uorf.
//!
//! # Example Configuration
//!
//! ```toml
//! data-dir = "/data/5ULTRA"
//! threads = 8
//! chunk-size = 5000
//! splice-cutoff = 0.2
//! full = true
//! mane = false
//! timeout-seconds = 3600
//! ```
//!
//! # Config File Locations
//!
//! Configuration is searched in this order (first found wins):
//! 1. `.ferro-uorf.toml` in current directory
//! 2. `~/.config/ferro/uorf.toml`
//!
//! CLI flags take precedence over config file settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::UltraError;

/// Reference file names inside the data directory
pub const UTR_TABLE: &str = "5UTRs.tsv";
pub const UORF_TABLE: &str = "uORFs.tsv";
pub const CONSTRAINT_TABLE: &str = "pli_LOEUFByGene.tsv";
pub const PHYLOP_DIR: &str = "5UTR.hg38.phyloP100way";
pub const PHASTCONS_DIR: &str = "5UTR.hg38.phastCons100way";
pub const MODEL_FILE: &str = "uorf_model.json";

/// Parsed configuration from a `.ferro-uorf.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct UltraConfig {
    /// Reference data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Worker threads (0 = all cores).
    #[serde(default)]
    pub threads: Option<usize>,
    /// Input rows per parallel chunk.
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// SpliceAI delta-score cutoff.
    #[serde(default)]
    pub splice_cutoff: Option<f64>,
    /// Write the full annotation.
    #[serde(default)]
    pub full: Option<bool>,
    /// Restrict annotation to MANE Select transcripts.
    #[serde(default)]
    pub mane: Option<bool>,
    /// Stop starting new chunks after this many seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl UltraConfig {
    /// Load configuration from the default locations.
    ///
    /// A file that exists but cannot be parsed is an error; no file at all
    /// yields the default configuration.
    pub fn load() -> Result<Self, UltraError> {
        let cwd_config = PathBuf::from(".ferro-uorf.toml");
        if cwd_config.exists() {
            return Self::load_from_path(&cwd_config);
        }

        if let Some(home) = dirs_home() {
            let home_config = home.join(".config").join("ferro").join("uorf.toml");
            if home_config.exists() {
                return Self::load_from_path(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, UltraError> {
        let content = fs::read_to_string(path).map_err(|e| UltraError::Config {
            msg: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config = Self::parse(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML content.
    pub fn parse(content: &str) -> Result<Self, UltraError> {
        let config: Self = toml::from_str(content)?;
        if let Some(cutoff) = config.splice_cutoff {
            if !(0.0..=1.0).contains(&cutoff) {
                return Err(UltraError::Config {
                    msg: format!("splice-cutoff {} outside [0, 1]", cutoff),
                });
            }
        }
        if config.chunk_size == Some(0) {
            return Err(UltraError::Config {
                msg: "chunk-size must be positive".to_string(),
            });
        }
        Ok(config)
    }

    /// Data directory, falling back to `~/.5ULTRA/data`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .map(expand_home)
            .unwrap_or_else(default_data_dir)
    }
}

/// Paths of every reference file under a data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
    pub utrs: PathBuf,
    pub uorfs: PathBuf,
    pub constraints: PathBuf,
    pub phylop: PathBuf,
    pub phastcons: PathBuf,
    pub model: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            utrs: root.join(UTR_TABLE),
            uorfs: root.join(UORF_TABLE),
            constraints: root.join(CONSTRAINT_TABLE),
            phylop: root.join(PHYLOP_DIR),
            phastcons: root.join(PHASTCONS_DIR),
            model: root.join(MODEL_FILE),
            root,
        }
    }

    /// Required files and directories, in the order they are checked
    pub fn required(&self) -> [&Path; 6] {
        [
            &self.utrs,
            &self.uorfs,
            &self.constraints,
            &self.phylop,
            &self.phastcons,
            &self.model,
        ]
    }

    /// Fail with [`UltraError::MissingReferenceData`] naming the first
    /// required path that does not exist
    pub fn verify(&self) -> Result<(), UltraError> {
        match self.required().into_iter().find(|p| !p.exists()) {
            Some(missing) => Err(UltraError::MissingReferenceData {
                path: missing.display().to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// `~/.5ULTRA/data`, or `.5ULTRA/data` when HOME is unset
pub fn default_data_dir() -> PathBuf {
    dirs_home()
        .unwrap_or_default()
        .join(".5ULTRA")
        .join("data")
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), dirs_home()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path,
    }
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_config() {
        let config = UltraConfig::parse("").unwrap();
        assert_eq!(config, UltraConfig::default());
    }

    #[test]
    fn test_parse_all_keys() {
        let content = r#"
data-dir = "/data/5ULTRA"
threads = 4
chunk-size = 250
splice-cutoff = 0.5
full = true
mane = true
timeout-seconds = 60
"#;
        let config = UltraConfig::parse(content).unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/data/5ULTRA"));
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.chunk_size, Some(250));
        assert_eq!(config.splice_cutoff, Some(0.5));
        assert_eq!(config.full, Some(true));
        assert_eq!(config.mane, Some(true));
        assert_eq!(config.timeout_seconds, Some(60));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(matches!(
            UltraConfig::parse("splice-cutoff = 1.5"),
            Err(UltraError::Config { .. })
        ));
        assert!(matches!(
            UltraConfig::parse("chunk-size = 0"),
            Err(UltraError::Config { .. })
        ));
        assert!(matches!(
            UltraConfig::parse("unknown-key = 1"),
            Err(UltraError::Config { .. })
        ));
        assert!(matches!(
            UltraConfig::parse("threads = \"many\""),
            Err(UltraError::Config { .. })
        ));
    }

    #[test]
    fn test_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uorf.toml");
        std::fs::write(&path, "threads = 2\n").unwrap();
        let config = UltraConfig::load_from_path(&path).unwrap();
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_data_paths_verify() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        assert_eq!(paths.utrs, dir.path().join("5UTRs.tsv"));

        let err = paths.verify().unwrap_err();
        assert_eq!(
            err,
            UltraError::MissingReferenceData {
                path: paths.utrs.display().to_string()
            }
        );

        for path in &paths.required()[..3] {
            std::fs::write(path, "").unwrap();
        }
        std::fs::create_dir(&paths.phylop).unwrap();
        std::fs::create_dir(&paths.phastcons).unwrap();
        let err = paths.verify().unwrap_err();
        assert!(err.to_string().contains("uorf_model.json"));

        std::fs::write(&paths.model, "{}").unwrap();
        assert!(paths.verify().is_ok());
    }
}
