//! Per-day artifacts: summary CSVs and the run manifest.
//!
//! - `{sector_dir}/YYYYMMDD_sector_summary.csv`
//! - `{momentum_dir}/YYYYMMDD_momentum_summary.csv`
//! - `{manifest_dir}/YYYYMMDD_manifest.json`
//!
//! Every file is written to a `.tmp` sibling and renamed into place, so a
//! crashed run never leaves a half-written artifact behind.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

use sectorpulse_core::data::SanitizeReport;
use sectorpulse_core::ledger::{momentum_table, sector_summary_table, LedgerTable, MergeOutcome, SchemaDrift};
use sectorpulse_core::domain::{MomentumWindowRow, SectorSummaryRow};

use crate::config::PathsConfig;
use crate::store::{table_to_csv, write_atomic};

pub const SCHEMA_VERSION: u32 = 1;

fn stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn sector_summary_path(paths: &PathsConfig, date: NaiveDate) -> PathBuf {
    paths.sector_dir.join(format!("{}_sector_summary.csv", stamp(date)))
}

pub fn momentum_summary_path(paths: &PathsConfig, date: NaiveDate) -> PathBuf {
    paths.momentum_dir.join(format!("{}_momentum_summary.csv", stamp(date)))
}

pub fn manifest_path(paths: &PathsConfig, date: NaiveDate) -> PathBuf {
    paths.manifest_dir.join(format!("{}_manifest.json", stamp(date)))
}

/// Both summary artifacts for `date` are already on disk.
pub fn artifacts_exist(paths: &PathsConfig, date: NaiveDate) -> bool {
    sector_summary_path(paths, date).exists() && momentum_summary_path(paths, date).exists()
}

fn write_table(path: &Path, table: &LedgerTable) -> Result<()> {
    let mut bytes = Vec::with_capacity(3 + table.len() * 64);
    // BOM so spreadsheet apps detect UTF-8.
    bytes.extend_from_slice("\u{feff}".as_bytes());
    bytes.extend(table_to_csv(table).context("failed to encode CSV")?);
    write_atomic(path, &bytes).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_sector_summary(
    paths: &PathsConfig,
    date: NaiveDate,
    rows: &[SectorSummaryRow],
) -> Result<PathBuf> {
    let path = sector_summary_path(paths, date);
    write_table(&path, &sector_summary_table(rows))?;
    Ok(path)
}

pub fn write_momentum_summary(
    paths: &PathsConfig,
    date: NaiveDate,
    rows: &[MomentumWindowRow],
) -> Result<PathBuf> {
    let path = momentum_summary_path(paths, date);
    write_table(&path, &momentum_table(rows))?;
    Ok(path)
}

// ─── Manifest ───────────────────────────────────────────────────────

/// Merge counters for one ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub sheet: String,
    pub added: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub total: usize,
    pub drift: Option<SchemaDrift>,
}

impl MergeSummary {
    pub fn from_outcome(sheet: &str, outcome: &MergeOutcome) -> Self {
        Self {
            sheet: sheet.to_string(),
            added: outcome.added,
            skipped: outcome.skipped,
            dropped: outcome.dropped,
            total: outcome.total,
            drift: outcome.drift.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Written { rows: usize, artifact: PathBuf },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    /// BLAKE3 over every input file, in order.
    pub input_hash: String,
    pub inputs: Vec<PathBuf>,
    pub sanitize: SanitizeReport,
    pub sector: StageStatus,
    pub momentum: StageStatus,
    /// Window files used / offered to the momentum engine.
    pub window_files: usize,
    pub window_failures: Vec<PathBuf>,
    pub ledgers: Vec<MergeSummary>,
}

/// BLAKE3 of the concatenated contents of `paths`, streamed.
pub fn hash_inputs(paths: &[PathBuf]) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; 64 * 1024];
    for path in paths {
        let mut f = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        loop {
            let n = f
                .read(&mut buf)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }
    Ok(hasher.finalize().to_hex().to_string())
}

pub fn write_manifest(paths: &PathsConfig, manifest: &RunManifest) -> Result<PathBuf> {
    let path = manifest_path(paths, manifest.date);
    let json = serde_json::to_string_pretty(manifest).context("failed to serialize run manifest")?;
    write_atomic(&path, json.as_bytes())
        .with_context(|| format!("failed to write manifest to {}", path.display()))?;
    Ok(path)
}

pub fn load_manifest(path: &Path) -> Result<RunManifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: RunManifest =
        serde_json::from_str(&json).context("failed to deserialize run manifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        anyhow::bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}
