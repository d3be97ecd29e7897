//! Human-facing pivot views derived from the ledgers.
//!
//! Each view is a plain grid of cells: a title row, a header row
//! (`sector` + one column per date, ascending), one row per vocabulary
//! sector in vocabulary order, then three blank rows before the next block.
//! Sectors without a value on a date get an empty cell.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::domain::{format_ledger_date, parse_ledger_date, TierKey};
use crate::engine::competition_rank;
use crate::ledger::{col, LedgerTable};
use crate::vocab::SectorVocabulary;

pub const SECTOR_RANKING_SHEET: &str = "sector_ranking";
pub const MOMENTUM_FLOW_SHEET: &str = "momentum_flow";

const BLOCK_GAP: usize = 3;

/// Overall-tier figures for one sector on one date, read back from `sector_log`.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallEntry {
    pub date: NaiveDate,
    pub sector: String,
    pub weighted_change: Option<f64>,
    pub up_count: u32,
    pub down_count: u32,
}

/// Momentum ratios for one sector on one date, read back from `momentum_log`.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioEntry {
    pub date: NaiveDate,
    pub sector: String,
    pub ratio_5_20: Option<f64>,
    pub ratio_3_10: Option<f64>,
}

fn number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Overall rows of `sector_log`. Rows with an unparseable date are skipped.
pub fn overall_entries(table: &LedgerTable, vocab: &SectorVocabulary) -> Vec<OverallEntry> {
    let (Some(date_c), Some(sector_c), Some(tier_c)) = (
        table.column_index(col::DATE),
        table.column_index(col::SECTOR),
        table.column_index(col::TIER),
    ) else {
        return Vec::new();
    };
    let change_c = table.column_index(col::WEIGHTED_CHANGE);
    let up_c = table.column_index(col::UP_COUNT);
    let down_c = table.column_index(col::DOWN_COUNT);
    let count = |i: usize, c: Option<usize>| {
        c.and_then(|c| number(table.cell(i, c))).map(|v| v as u32).unwrap_or(0)
    };

    (0..table.len())
        .filter(|&i| table.cell(i, tier_c).parse::<TierKey>() == Ok(TierKey::Overall))
        .filter_map(|i| {
            Some(OverallEntry {
                date: parse_ledger_date(table.cell(i, date_c))?,
                sector: vocab.normalize(table.cell(i, sector_c)),
                weighted_change: change_c.and_then(|c| number(table.cell(i, c))),
                up_count: count(i, up_c),
                down_count: count(i, down_c),
            })
        })
        .collect()
}

/// Rows of `momentum_log`. Rows with an unparseable date are skipped.
pub fn ratio_entries(table: &LedgerTable, vocab: &SectorVocabulary) -> Vec<RatioEntry> {
    let (Some(date_c), Some(sector_c)) = (
        table.column_index(col::DATE),
        table.column_index(col::SECTOR),
    ) else {
        return Vec::new();
    };
    let r520 = table.column_index(col::RATIO_5_20);
    let r310 = table.column_index(col::RATIO_3_10);

    (0..table.len())
        .filter_map(|i| {
            Some(RatioEntry {
                date: parse_ledger_date(table.cell(i, date_c))?,
                sector: vocab.normalize(table.cell(i, sector_c)),
                ratio_5_20: r520.and_then(|c| number(table.cell(i, c))),
                ratio_3_10: r310.and_then(|c| number(table.cell(i, c))),
            })
        })
        .collect()
}

/// Sector × date matrix in vocabulary order. The first value seen for a
/// (sector, date) pair wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub dates: Vec<NaiveDate>,
    pub sectors: Vec<String>,
    /// `values[sector][date]`
    pub values: Vec<Vec<Option<f64>>>,
}

impl Pivot {
    pub fn build(
        entries: impl IntoIterator<Item = (NaiveDate, String, Option<f64>)>,
        vocab: &SectorVocabulary,
    ) -> Self {
        let mut cells: HashMap<(String, NaiveDate), Option<f64>> = HashMap::new();
        let mut dates = BTreeSet::new();
        for (date, sector, value) in entries {
            dates.insert(date);
            cells.entry((sector, date)).or_insert(value);
        }
        let dates: Vec<NaiveDate> = dates.into_iter().collect();
        let sectors: Vec<String> = vocab.sectors().to_vec();
        let values = sectors
            .iter()
            .map(|s| {
                dates
                    .iter()
                    .map(|d| cells.get(&(s.clone(), *d)).copied().flatten())
                    .collect()
            })
            .collect();
        Self {
            dates,
            sectors,
            values,
        }
    }

    /// Competition rank within each date column; empty cells stay empty.
    pub fn ranked(&self) -> Self {
        let mut values = vec![vec![None; self.dates.len()]; self.sectors.len()];
        for d in 0..self.dates.len() {
            let present: Vec<(usize, f64)> = self
                .values
                .iter()
                .enumerate()
                .filter_map(|(s, row)| row[d].map(|v| (s, v)))
                .collect();
            let ranks = competition_rank(&present.iter().map(|(_, v)| *v).collect::<Vec<_>>());
            for ((s, _), rank) in present.into_iter().zip(ranks) {
                values[s][d] = Some(rank as f64);
            }
        }
        Self {
            dates: self.dates.clone(),
            sectors: self.sectors.clone(),
            values,
        }
    }

    fn render(&self, title: &str, out: &mut Vec<Vec<String>>) {
        let width = self.dates.len() + 1;
        let mut title_row = vec![String::new(); width];
        title_row[0] = title.to_string();
        out.push(title_row);

        let mut header = vec![col::SECTOR.to_string()];
        header.extend(self.dates.iter().map(|d| format_ledger_date(*d)));
        out.push(header);

        for (sector, row) in self.sectors.iter().zip(&self.values) {
            let mut line = vec![sector.clone()];
            line.extend(row.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
            out.push(line);
        }
    }
}

/// A rendered view: rows of cells, written to its sheet as a full rewrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewGrid {
    pub rows: Vec<Vec<String>>,
}

impl ViewGrid {
    fn from_blocks(blocks: &[(&str, &Pivot)]) -> Self {
        let mut rows = Vec::new();
        let width = blocks.first().map(|(_, p)| p.dates.len() + 1).unwrap_or(1);
        for (i, (title, pivot)) in blocks.iter().enumerate() {
            if i > 0 {
                rows.extend(std::iter::repeat(vec![String::new(); width]).take(BLOCK_GAP));
            }
            pivot.render(title, &mut rows);
        }
        Self { rows }
    }

    /// The grid as a ledger table: the title row becomes the header.
    pub fn into_table(self) -> LedgerTable {
        let mut rows = self.rows.into_iter();
        let header = rows.next().unwrap_or_default();
        LedgerTable::new(header, rows.collect())
    }
}

/// `sector_ranking`: overall weighted change per sector and date, then the
/// per-date competition ranks.
pub fn sector_ranking_view(sector_log: &LedgerTable, vocab: &SectorVocabulary) -> Option<ViewGrid> {
    let entries = overall_entries(sector_log, vocab);
    if entries.is_empty() {
        return None;
    }
    let changes = Pivot::build(
        entries.into_iter().map(|e| (e.date, e.sector, e.weighted_change)),
        vocab,
    );
    let ranks = changes.ranked();
    Some(ViewGrid::from_blocks(&[
        ("sector weighted change (%)", &changes),
        ("sector change ranking", &ranks),
    ]))
}

/// `momentum_flow`: turnover ratio 5/20 and ratio 3/10 per sector and date.
pub fn momentum_flow_view(momentum_log: &LedgerTable, vocab: &SectorVocabulary) -> Option<ViewGrid> {
    let entries = ratio_entries(momentum_log, vocab);
    if entries.is_empty() {
        return None;
    }
    let r520 = Pivot::build(
        entries.iter().map(|e| (e.date, e.sector.clone(), e.ratio_5_20)),
        vocab,
    );
    let r310 = Pivot::build(
        entries.into_iter().map(|e| (e.date, e.sector, e.ratio_3_10)),
        vocab,
    );
    Some(ViewGrid::from_blocks(&[
        ("turnover 5d/20d average ratio", &r520),
        ("turnover 3d/10d average ratio", &r310),
    ]))
}

/// Dates present in a set of entries, newest first.
pub fn dates_desc<'a>(dates: impl IntoIterator<Item = &'a NaiveDate>) -> Vec<NaiveDate> {
    let set: BTreeSet<NaiveDate> = dates.into_iter().copied().collect();
    set.into_iter().rev().collect()
}
