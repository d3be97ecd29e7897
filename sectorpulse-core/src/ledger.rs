//! Append-only time-series ledgers and the keyed first-write-wins merge.
//!
//! A ledger is a plain header + string-cell table, the shape a spreadsheet
//! or CSV store hands back. Merging never rewrites an existing row: incoming
//! rows whose key is already present are skipped, so re-running a date is a
//! no-op. New rows go to the front (`NewestFirst`) or back (`OldestFirst`),
//! and the retention bound trims from the opposite end.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::warn;

use crate::domain::{
    format_ledger_date, parse_ledger_date, MomentumWindowRow, SectorSummaryRow,
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("key column '{column}' missing from {side} header")]
    MissingKeyColumn { column: String, side: &'static str },

    #[error("ledger store: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LedgerTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    pub fn with_header(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| header_name(h) == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Row counts and date coverage, given the name of the date column.
    pub fn stats(&self, date_column: &str) -> LedgerStats {
        let dates: BTreeSet<_> = match self.column_index(date_column) {
            Some(col) => (0..self.len())
                .filter_map(|i| parse_ledger_date(self.cell(i, col)))
                .collect(),
            None => BTreeSet::new(),
        };
        LedgerStats {
            rows: self.len(),
            first_date: dates.first().copied(),
            last_date: dates.last().copied(),
            distinct_dates: dates.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub rows: usize,
    pub first_date: Option<chrono::NaiveDate>,
    pub last_date: Option<chrono::NaiveDate>,
    pub distinct_dates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOrdering {
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSpec {
    pub key_columns: Vec<String>,
    pub ordering: LedgerOrdering,
    /// Maximum data rows kept; `None` for unbounded.
    pub retention: Option<usize>,
}

/// Row bound applied to both ledgers by default.
pub const DEFAULT_RETENTION: usize = 19_800;

impl LedgerSpec {
    pub fn new(key_columns: &[&str], ordering: LedgerOrdering, retention: Option<usize>) -> Self {
        Self {
            key_columns: key_columns.iter().map(|s| s.to_string()).collect(),
            ordering,
            retention,
        }
    }

    /// `sector_log`: keyed by (date, sector, tier).
    pub fn sector_log() -> Self {
        Self::new(
            &[col::DATE, col::SECTOR, col::TIER],
            LedgerOrdering::NewestFirst,
            Some(DEFAULT_RETENTION),
        )
    }

    /// `momentum_log`: keyed by (date, sector).
    pub fn momentum_log() -> Self {
        Self::new(
            &[col::DATE, col::SECTOR],
            LedgerOrdering::NewestFirst,
            Some(DEFAULT_RETENTION),
        )
    }
}

/// Header differences between the stored ledger and an incoming batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDrift {
    /// In the incoming batch but not yet in the ledger.
    pub added: Vec<String>,
    /// In the ledger but absent from the incoming batch.
    pub missing: Vec<String>,
}

impl SchemaDrift {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.missing.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub table: LedgerTable,
    pub added: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub total: usize,
    pub drift: Option<SchemaDrift>,
}

/// Header cell as a column name: BOM and padding from hand-edited sheets
/// are ignored.
fn header_name(h: &str) -> &str {
    h.trim_start_matches('\u{feff}').trim()
}

/// Ordering the stored rows were written in, read off the date column.
/// `None` when it cannot be told (no date column, fewer than two distinct
/// parseable dates at the ends).
fn stored_ordering(table: &LedgerTable) -> Option<LedgerOrdering> {
    let date_col = table.column_index(col::DATE)?;
    let first = parse_ledger_date(table.cell(0, date_col))?;
    let last = parse_ledger_date(table.cell(table.len().checked_sub(1)?, date_col))?;
    match first.cmp(&last) {
        std::cmp::Ordering::Greater => Some(LedgerOrdering::NewestFirst),
        std::cmp::Ordering::Less => Some(LedgerOrdering::OldestFirst),
        std::cmp::Ordering::Equal => None,
    }
}

/// Names in `from` that have no counterpart in `other`.
fn names_missing_from(from: &[String], other: &[String]) -> Vec<String> {
    from.iter()
        .map(|h| header_name(h))
        .filter(|name| !other.iter().any(|o| header_name(o) == *name))
        .map(str::to_string)
        .collect()
}

fn key_indices(
    header: &[String],
    spec: &LedgerSpec,
    side: &'static str,
) -> Result<Vec<usize>, LedgerError> {
    spec.key_columns
        .iter()
        .map(|k| {
            header
                .iter()
                .position(|h| header_name(h) == k.as_str())
                .ok_or_else(|| LedgerError::MissingKeyColumn {
                    column: k.clone(),
                    side,
                })
        })
        .collect()
}

fn key_of(row: &[String], idx: &[usize]) -> Vec<String> {
    idx.iter()
        .map(|&i| row.get(i).map(|c| c.trim().to_string()).unwrap_or_default())
        .collect()
}

/// Merge `incoming` into `existing` under `spec`.
///
/// An existing table without a header adopts the incoming one. Header drift
/// is tolerated: incoming rows are re-projected by column name, new columns
/// are appended and missing ones left blank. Adding zero rows is success.
///
/// A ledger's ordering is fixed once written: when the stored rows are
/// visibly in the other order, the stored order wins and a warning is logged.
pub fn merge(
    existing: &LedgerTable,
    incoming: &LedgerTable,
    spec: &LedgerSpec,
) -> Result<MergeOutcome, LedgerError> {
    if incoming.header.is_empty() {
        return Ok(MergeOutcome {
            total: existing.len(),
            table: existing.clone(),
            added: 0,
            skipped: 0,
            dropped: 0,
            drift: None,
        });
    }
    let incoming_keys = key_indices(&incoming.header, spec, "incoming")?;

    let (header, drift) = if existing.header.is_empty() {
        (incoming.header.clone(), None)
    } else {
        key_indices(&existing.header, spec, "existing")?;
        let drift = SchemaDrift {
            added: names_missing_from(&incoming.header, &existing.header),
            missing: names_missing_from(&existing.header, &incoming.header),
        };
        let mut header = existing.header.clone();
        header.extend(drift.added.iter().cloned());
        if drift.is_empty() {
            (header, None)
        } else {
            warn!(added = ?drift.added, missing = ?drift.missing, "ledger header drift");
            (header, Some(drift))
        }
    };
    let width = header.len();

    let old_rows: Vec<Vec<String>> = existing
        .rows
        .iter()
        .map(|r| {
            let mut r = r.clone();
            r.resize(width, String::new());
            r
        })
        .collect();

    let key_idx = key_indices(&header, spec, "existing")?;
    let mut seen: HashSet<Vec<String>> = old_rows.iter().map(|r| key_of(r, &key_idx)).collect();

    // Position of each merged-header column in the incoming header.
    let projection: Vec<Option<usize>> = header
        .iter()
        .map(|h| {
            incoming
                .header
                .iter()
                .position(|ih| header_name(ih) == header_name(h))
        })
        .collect();

    let mut accepted = Vec::new();
    let mut skipped = 0;
    for row in &incoming.rows {
        if !seen.insert(key_of(row, &incoming_keys)) {
            skipped += 1;
            continue;
        }
        accepted.push(
            projection
                .iter()
                .map(|p| p.and_then(|i| row.get(i)).cloned().unwrap_or_default())
                .collect::<Vec<String>>(),
        );
    }
    let added = accepted.len();

    let ordering = match stored_ordering(existing) {
        Some(stored) if stored != spec.ordering => {
            warn!(
                requested = ?spec.ordering,
                stored = ?stored,
                "ledger ordering mismatch, keeping stored ordering"
            );
            stored
        }
        _ => spec.ordering,
    };

    let mut rows = match ordering {
        LedgerOrdering::NewestFirst => {
            let mut rows = accepted;
            rows.extend(old_rows);
            rows
        }
        LedgerOrdering::OldestFirst => {
            let mut rows = old_rows;
            rows.extend(accepted);
            rows
        }
    };

    let mut dropped = 0;
    if let Some(limit) = spec.retention {
        if rows.len() > limit {
            dropped = rows.len() - limit;
            match ordering {
                LedgerOrdering::NewestFirst => rows.truncate(limit),
                LedgerOrdering::OldestFirst => {
                    rows.drain(..dropped);
                }
            }
        }
    }

    let total = rows.len();
    Ok(MergeOutcome {
        table: LedgerTable::new(header, rows),
        added,
        skipped,
        dropped,
        total,
        drift,
    })
}

// ── Row encoding ─────────────────────────────────────────────────────

/// Ledger and artifact column names.
pub mod col {
    pub const DATE: &str = "date";
    pub const SECTOR: &str = "sector";
    pub const TIER: &str = "tier";
    pub const UP_COUNT: &str = "up_count";
    pub const DOWN_COUNT: &str = "down_count";
    pub const WEIGHTED_CHANGE: &str = "weighted_change";
    pub const TURNOVER: &str = "turnover";
    pub const CHANGE_SOURCE: &str = "change_source";
    pub const RANK: &str = "rank";
    pub const MA3: &str = "ma3";
    pub const MA5: &str = "ma5";
    pub const MA10: &str = "ma10";
    pub const MA20: &str = "ma20";
    pub const RATIO_5_20: &str = "ratio_5_20";
    pub const RATIO_3_10: &str = "ratio_3_10";
}

pub const SECTOR_SUMMARY_HEADER: [&str; 9] = [
    col::DATE,
    col::SECTOR,
    col::TIER,
    col::UP_COUNT,
    col::DOWN_COUNT,
    col::WEIGHTED_CHANGE,
    col::TURNOVER,
    col::CHANGE_SOURCE,
    col::RANK,
];

pub const MOMENTUM_HEADER: [&str; 9] = [
    col::DATE,
    col::SECTOR,
    col::TURNOVER,
    col::MA3,
    col::MA5,
    col::MA10,
    col::MA20,
    col::RATIO_5_20,
    col::RATIO_3_10,
];

fn opt_cell<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

pub fn sector_summary_table(rows: &[SectorSummaryRow]) -> LedgerTable {
    let mut table = LedgerTable::with_header(&SECTOR_SUMMARY_HEADER);
    for row in rows {
        let a = &row.aggregate;
        let source = match a.change_source {
            crate::domain::ChangeSource::Derived => "derived",
            crate::domain::ChangeSource::IndexFeed => "index_feed",
        };
        table.push_row(vec![
            format_ledger_date(a.date),
            a.sector.clone(),
            a.tier.label().to_string(),
            a.up_count.to_string(),
            a.down_count.to_string(),
            a.weighted_change.to_string(),
            a.turnover.to_string(),
            source.to_string(),
            opt_cell(row.rank),
        ]);
    }
    table
}

pub fn momentum_table(rows: &[MomentumWindowRow]) -> LedgerTable {
    let mut table = LedgerTable::with_header(&MOMENTUM_HEADER);
    for r in rows {
        table.push_row(vec![
            format_ledger_date(r.date),
            r.sector.clone(),
            r.turnover.to_string(),
            r.ma3.to_string(),
            r.ma5.to_string(),
            r.ma10.to_string(),
            r.ma20.to_string(),
            opt_cell(r.ratio_5_20),
            opt_cell(r.ratio_3_10),
        ]);
    }
    table
}
