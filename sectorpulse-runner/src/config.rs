//! Pipeline configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) describes the standard layout under `data/`.
//!
//! ```toml
//! vocabulary_file = "config/sectors.toml"
//!
//! [paths]
//! raw_stock_dir = "data/raw/stock"
//! ledger_dir = "data/ledgers"
//!
//! [ledgers]
//! retention = 19800
//!
//! [momentum]
//! lookback = 20
//!
//! [run]
//! continue_on_error = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use sectorpulse_core::data::{ColumnAliases, IndexColumns};
use sectorpulse_core::digest::DEFAULT_TOP_N;
use sectorpulse_core::engine::DEFAULT_LOOKBACK;
use sectorpulse_core::ledger::{LedgerSpec, DEFAULT_RETENTION};
use sectorpulse_core::SectorVocabulary;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("vocabulary: {0}")]
    Vocabulary(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// TOML sector vocabulary; the built-in TSE 33-sector list when unset.
    pub vocabulary_file: Option<PathBuf>,
    pub paths: PathsConfig,
    pub ledgers: LedgersConfig,
    pub momentum: MomentumConfig,
    pub run: RunOptions,
    pub columns: ColumnAliases,
    pub index_columns: IndexColumns,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_stock_dir: PathBuf,
    pub raw_index_dir: PathBuf,
    pub sector_dir: PathBuf,
    pub momentum_dir: PathBuf,
    pub manifest_dir: PathBuf,
    pub ledger_dir: PathBuf,
    /// Raw stock files are `{stock_prefix}YYYYMMDD.csv`.
    pub stock_prefix: String,
    /// Index files are `{index_prefix}YYYYMMDD.csv`.
    pub index_prefix: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_stock_dir: PathBuf::from("data/raw/stock"),
            raw_index_dir: PathBuf::from("data/raw/index"),
            sector_dir: PathBuf::from("data/processed/sector"),
            momentum_dir: PathBuf::from("data/processed/momentum"),
            manifest_dir: PathBuf::from("data/processed/manifests"),
            ledger_dir: PathBuf::from("data/ledgers"),
            stock_prefix: "japan-all-stock-prices_".to_string(),
            index_prefix: "tosho-index-data_".to_string(),
        }
    }
}

impl PathsConfig {
    /// Re-root every directory under `base`.
    pub fn rooted_at(base: &Path) -> Self {
        let d = Self::default();
        Self {
            raw_stock_dir: base.join(d.raw_stock_dir),
            raw_index_dir: base.join(d.raw_index_dir),
            sector_dir: base.join(d.sector_dir),
            momentum_dir: base.join(d.momentum_dir),
            manifest_dir: base.join(d.manifest_dir),
            ledger_dir: base.join(d.ledger_dir),
            ..d
        }
    }
}

/// Both ledgers are newest-first; the ordering is part of each ledger's
/// layout and is not configurable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgersConfig {
    /// Row bound for both ledgers; 0 disables trimming.
    pub retention: usize,
}

impl Default for LedgersConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
        }
    }
}

impl LedgersConfig {
    fn apply(&self, mut spec: LedgerSpec) -> LedgerSpec {
        spec.retention = (self.retention > 0).then_some(self.retention);
        spec
    }

    pub fn sector_spec(&self) -> LedgerSpec {
        self.apply(LedgerSpec::sector_log())
    }

    pub fn momentum_spec(&self) -> LedgerSpec {
        self.apply(LedgerSpec::momentum_log())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MomentumConfig {
    /// Daily files in the window, target included.
    pub lookback: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunOptions {
    /// Keep going when a date fails during backfill.
    pub continue_on_error: bool,
    /// Refresh the pivot views after each processed date.
    pub refresh_views: bool,
    pub digest_top_n: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            refresh_views: true,
            digest_top_n: DEFAULT_TOP_N,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load_vocabulary(&self) -> Result<SectorVocabulary, ConfigError> {
        match &self.vocabulary_file {
            Some(path) => SectorVocabulary::from_file(path).map_err(ConfigError::Vocabulary),
            None => Ok(SectorVocabulary::tse33()),
        }
    }
}
