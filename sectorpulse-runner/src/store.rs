//! Ledger persistence.
//!
//! A store hands back whole sheets and takes whole sheets; every write is a
//! full rewrite. `CsvLedgerStore` keeps one `{sheet}.csv` per sheet and
//! replaces it atomically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sectorpulse_core::ledger::{LedgerError, LedgerTable};

pub const SECTOR_LOG_SHEET: &str = "sector_log";
pub const MOMENTUM_LOG_SHEET: &str = "momentum_log";

pub trait LedgerStore {
    /// Read a sheet. A sheet that does not exist yet reads as an empty table.
    fn read(&self, sheet: &str) -> Result<LedgerTable, LedgerError>;

    /// Replace a sheet's entire contents.
    fn write(&mut self, sheet: &str, table: &LedgerTable) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone)]
pub struct CsvLedgerStore {
    dir: PathBuf,
}

impl CsvLedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{sheet}.csv"))
    }
}

fn store_err(path: &Path, e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Store(format!("{}: {e}", path.display()))
}

/// Encode a table as CSV bytes.
pub fn table_to_csv(table: &LedgerTable) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(vec![]);
    if !table.header.is_empty() {
        wtr.write_record(&table.header)?;
    }
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

/// Write `bytes` to `path` via a sibling `.tmp` file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

impl LedgerStore for CsvLedgerStore {
    fn read(&self, sheet: &str) -> Result<LedgerTable, LedgerError> {
        let path = self.sheet_path(sheet);
        if !path.exists() {
            return Ok(LedgerTable::default());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| store_err(&path, e))?;
        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| store_err(&path, e))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| store_err(&path, e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(LedgerTable::new(header, rows))
    }

    fn write(&mut self, sheet: &str, table: &LedgerTable) -> Result<(), LedgerError> {
        let path = self.sheet_path(sheet);
        let bytes = table_to_csv(table).map_err(|e| store_err(&path, e))?;
        write_atomic(&path, &bytes).map_err(|e| store_err(&path, e))
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    sheets: BTreeMap<String, LedgerTable>,
    writes: usize,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `write` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn read(&self, sheet: &str) -> Result<LedgerTable, LedgerError> {
        Ok(self.sheets.get(sheet).cloned().unwrap_or_default())
    }

    fn write(&mut self, sheet: &str, table: &LedgerTable) -> Result<(), LedgerError> {
        self.sheets.insert(sheet.to_string(), table.clone());
        self.writes += 1;
        Ok(())
    }
}
