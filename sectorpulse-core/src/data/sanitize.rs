//! Row sanitizer: raw string table → [`StockRecord`]s.
//!
//! Numeric cells arrive locale-formatted (`1,234`, `-` for zero/unknown).
//! Capitalization and turnover fall back to 0, percent change falls back to
//! unknown. Every non-placeholder cell that fails to parse is counted in a
//! [`ParseDegraded`] diagnostic; none of this is an error.
//!
//! Date policy: each row's date is parsed independently. The file's resolved
//! date is the most frequent parsed date; rows whose date cannot be parsed
//! take it. When no row carries a usable date the file-name hint is used, and
//! the current local date only as a last resort. Both fallbacks are logged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use super::table::RawTable;
use crate::domain::{parse_flexible_date, StockRecord};
use crate::error::EngineError;
use crate::vocab::SectorVocabulary;

/// Semantic input fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Sector,
    MarketCap,
    ChangePct,
    Turnover,
    Date,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Field::Sector => "sector",
            Field::MarketCap => "market_cap",
            Field::ChangePct => "change_pct",
            Field::Turnover => "turnover",
            Field::Date => "date",
        };
        f.write_str(s)
    }
}

/// Candidate header names per semantic field. First match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub sector: Vec<String>,
    pub market_cap: Vec<String>,
    pub change_pct: Vec<String>,
    pub turnover: Vec<String>,
    /// Substring fallback for the turnover header (units vary between feeds).
    pub turnover_fragment: String,
    pub date: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            sector: names(&["業種", "sector"]),
            market_cap: names(&["時価総額（百万円）", "時価総額(百万円)", "market_cap"]),
            change_pct: names(&["前日比（％）", "前日比(%)", "change_pct"]),
            turnover: names(&["売買代金（千円）", "売買代金(千円)", "turnover"]),
            turnover_fragment: "売買代金".to_string(),
            date: names(&["日付", "date"]),
        }
    }
}

/// Outcome of parsing one numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell {
    Value(f64),
    /// Empty, dash or `nan`: an expected "no value" marker.
    Placeholder,
    /// Anything else that is not a finite number.
    Invalid,
}

/// Parse a locale-formatted number: thousands separators, surrounding
/// whitespace and a trailing `%` are ignored.
pub fn parse_locale_number(raw: &str) -> NumericCell {
    let trimmed = raw.trim();
    if matches!(trimmed, "" | "-" | "－" | "—" | "―" | "--") || trimmed.eq_ignore_ascii_case("nan")
    {
        return NumericCell::Placeholder;
    }

    let cleaned: String = trimmed
        .trim_end_matches(['%', '％'])
        .chars()
        .filter(|c| !matches!(c, ',' | '，' | ' ' | '\u{3000}'))
        .collect();

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => NumericCell::Value(v),
        _ => NumericCell::Invalid,
    }
}

/// A field whose cells partly failed to parse and were replaced by defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseDegraded {
    pub field: Field,
    pub count: usize,
    /// First offending cell, for the log line.
    pub sample: String,
}

/// How the file's trading date was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateResolution {
    /// Parsed from the date column.
    Column,
    /// Date column missing or entirely unparseable; took the file-name date.
    FileHint,
    /// No usable date anywhere; took today's date.
    Today,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizeReport {
    pub rows_in: usize,
    pub rows_kept: usize,
    pub index_rows_dropped: usize,
    pub blank_sector_rows: usize,
    pub date_resolution: DateResolution,
    pub degraded: Vec<ParseDegraded>,
}

impl SanitizeReport {
    pub fn degraded_cells(&self) -> usize {
        self.degraded.iter().map(|d| d.count).sum()
    }
}

/// One sanitized raw file.
#[derive(Debug, Clone)]
pub struct SanitizedDay {
    /// The file's resolved trading date.
    pub date: NaiveDate,
    pub records: Vec<StockRecord>,
    pub report: SanitizeReport,
}

/// Which numeric fields a caller needs. Momentum only needs turnover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Full,
    TurnoverOnly,
}

impl Requirement {
    fn required_fields(self) -> &'static [Field] {
        match self {
            Requirement::Full => &[
                Field::Sector,
                Field::MarketCap,
                Field::ChangePct,
                Field::Turnover,
            ],
            Requirement::TurnoverOnly => &[Field::Sector, Field::Turnover],
        }
    }
}

struct Resolved {
    sector: Option<usize>,
    market_cap: Option<usize>,
    change_pct: Option<usize>,
    turnover: Option<usize>,
    date: Option<usize>,
}

impl Resolved {
    fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Sector => self.sector,
            Field::MarketCap => self.market_cap,
            Field::ChangePct => self.change_pct,
            Field::Turnover => self.turnover,
            Field::Date => self.date,
        }
    }
}

#[derive(Default)]
struct Degradation {
    by_field: Vec<ParseDegraded>,
}

impl Degradation {
    fn record(&mut self, field: Field, cell: &str) {
        match self.by_field.iter_mut().find(|d| d.field == field) {
            Some(d) => d.count += 1,
            None => self.by_field.push(ParseDegraded {
                field,
                count: 1,
                sample: cell.to_string(),
            }),
        }
    }
}

/// Turns raw tables into stock records.
#[derive(Debug, Clone)]
pub struct Sanitizer<'a> {
    vocab: &'a SectorVocabulary,
    columns: &'a ColumnAliases,
    today: NaiveDate,
}

impl<'a> Sanitizer<'a> {
    pub fn new(vocab: &'a SectorVocabulary, columns: &'a ColumnAliases) -> Self {
        Self {
            vocab,
            columns,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Override the last-resort date (tests, replays).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn resolve(&self, table: &RawTable) -> Resolved {
        Resolved {
            sector: table.find_column(&self.columns.sector),
            market_cap: table.find_column(&self.columns.market_cap),
            change_pct: table.find_column(&self.columns.change_pct),
            turnover: table
                .find_column(&self.columns.turnover)
                .or_else(|| table.find_column_containing(&self.columns.turnover_fragment)),
            date: table.find_column(&self.columns.date),
        }
    }

    /// Sanitize one raw file.
    ///
    /// Fails with `DataUnavailable` when the table has no rows, a required
    /// column cannot be resolved, or nothing is left after filtering.
    pub fn sanitize(
        &self,
        table: &RawTable,
        date_hint: Option<NaiveDate>,
        requirement: Requirement,
    ) -> Result<SanitizedDay, EngineError> {
        if table.is_empty() {
            return Err(EngineError::data_unavailable(date_hint, "input has no data rows"));
        }

        let cols = self.resolve(table);
        for field in requirement.required_fields() {
            if cols.get(*field).is_none() {
                return Err(EngineError::data_unavailable(
                    date_hint,
                    format!("no column resolves to {field} (header: {:?})", table.header),
                ));
            }
        }

        let mut degraded = Degradation::default();
        let (resolved_date, resolution) =
            self.resolve_dates(table, cols.date, date_hint, &mut degraded);

        let mut records = Vec::with_capacity(table.len());
        let mut index_rows_dropped = 0;
        let mut blank_sector_rows = 0;

        for i in 0..table.len() {
            let raw_sector = cols.sector.map(|c| table.cell(i, c)).unwrap_or("");
            if self.vocab.is_index_sentinel(raw_sector) {
                index_rows_dropped += 1;
                continue;
            }
            let sector = self.vocab.normalize(raw_sector);
            if sector.is_empty() {
                blank_sector_rows += 1;
                continue;
            }

            let market_cap = self.numeric_or_zero(table, i, cols.market_cap, Field::MarketCap, &mut degraded);
            let turnover = self.numeric_or_zero(table, i, cols.turnover, Field::Turnover, &mut degraded);
            let change_pct = match cols.change_pct {
                Some(c) => {
                    let cell = table.cell(i, c);
                    match parse_locale_number(cell) {
                        NumericCell::Value(v) => Some(v),
                        NumericCell::Placeholder => None,
                        NumericCell::Invalid => {
                            degraded.record(Field::ChangePct, cell);
                            None
                        }
                    }
                }
                None => None,
            };

            records.push(StockRecord::new(
                resolved_date,
                sector,
                market_cap,
                change_pct,
                turnover,
            ));
        }

        for d in &degraded.by_field {
            warn!(
                date = %resolved_date,
                field = %d.field,
                count = d.count,
                sample = %d.sample,
                "parse degraded: substituted defaults"
            );
        }

        if records.is_empty() {
            return Err(EngineError::data_unavailable(
                Some(resolved_date),
                format!(
                    "no rows left after filtering ({index_rows_dropped} index rows, {blank_sector_rows} blank sectors)"
                ),
            ));
        }

        debug!(
            date = %resolved_date,
            rows_in = table.len(),
            rows_kept = records.len(),
            index_rows_dropped,
            "sanitized raw table"
        );

        let report = SanitizeReport {
            rows_in: table.len(),
            rows_kept: records.len(),
            index_rows_dropped,
            blank_sector_rows,
            date_resolution: resolution,
            degraded: degraded.by_field,
        };

        Ok(SanitizedDay {
            date: resolved_date,
            records,
            report,
        })
    }

    fn numeric_or_zero(
        &self,
        table: &RawTable,
        row: usize,
        col: Option<usize>,
        field: Field,
        degraded: &mut Degradation,
    ) -> f64 {
        let Some(c) = col else { return 0.0 };
        let cell = table.cell(row, c);
        match parse_locale_number(cell) {
            NumericCell::Value(v) if v >= 0.0 => v,
            NumericCell::Value(_) => {
                degraded.record(field, cell);
                0.0
            }
            NumericCell::Placeholder => 0.0,
            NumericCell::Invalid => {
                degraded.record(field, cell);
                0.0
            }
        }
    }

    /// Returns the resolved file date and how it was found. Every record of
    /// the file carries that date; row dates that are unparseable or disagree
    /// with it count as degraded.
    fn resolve_dates(
        &self,
        table: &RawTable,
        date_col: Option<usize>,
        hint: Option<NaiveDate>,
        degraded: &mut Degradation,
    ) -> (NaiveDate, DateResolution) {
        let row_dates: Vec<Option<NaiveDate>> = match date_col {
            Some(c) => (0..table.len())
                .map(|i| parse_flexible_date(table.cell(i, c)))
                .collect(),
            None => vec![None; table.len()],
        };

        let mut counts: HashMap<NaiveDate, usize> = HashMap::new();
        for d in row_dates.iter().flatten() {
            *counts.entry(*d).or_default() += 1;
        }

        // Most frequent date; ties go to the later date.
        let dominant = counts
            .into_iter()
            .max_by(|(da, ca), (db, cb)| ca.cmp(cb).then(da.cmp(db)))
            .map(|(d, _)| d);

        let (resolved, resolution) = match (dominant, hint) {
            (Some(d), _) => (d, DateResolution::Column),
            (None, Some(h)) => {
                warn!(hint = %h, "date column unusable, falling back to file-name date");
                (h, DateResolution::FileHint)
            }
            (None, None) => {
                warn!(today = %self.today, "no usable date in column or file name, falling back to today");
                (self.today, DateResolution::Today)
            }
        };

        if resolution == DateResolution::Column {
            if let Some(c) = date_col {
                for (i, d) in row_dates.iter().enumerate() {
                    if *d != Some(resolved) {
                        degraded.record(Field::Date, table.cell(i, c));
                    }
                }
            }
        }

        (resolved, resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CapTier;

    const HEADER: [&str; 5] = ["日付", "業種", "時価総額（百万円）", "前日比（％）", "売買代金（千円）"];

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sanitize(table: &RawTable, hint: Option<NaiveDate>) -> Result<SanitizedDay, EngineError> {
        let vocab = SectorVocabulary::tse33();
        let columns = ColumnAliases::default();
        Sanitizer::new(&vocab, &columns)
            .with_today(d(2030, 1, 1))
            .sanitize(table, hint, Requirement::Full)
    }

    #[test]
    fn locale_numbers() {
        assert_eq!(parse_locale_number("1,234.5"), NumericCell::Value(1234.5));
        assert_eq!(parse_locale_number(" -0.75 "), NumericCell::Value(-0.75));
        assert_eq!(parse_locale_number("+1.2%"), NumericCell::Value(1.2));
        assert_eq!(parse_locale_number("-"), NumericCell::Placeholder);
        assert_eq!(parse_locale_number(""), NumericCell::Placeholder);
        assert_eq!(parse_locale_number("NaN"), NumericCell::Placeholder);
        assert_eq!(parse_locale_number("abc"), NumericCell::Invalid);
        assert_eq!(parse_locale_number("inf"), NumericCell::Invalid);
    }

    #[test]
    fn sanitizes_rows_and_drops_index_sentinel() {
        let table = RawTable::from_rows(
            &HEADER,
            &[
                &["20241001", "銀行業", "1,500,000", "1.5", "2,000"],
                &["20241001", "株価指数", "-", "0.3", "-"],
                &["20241001", "電気･ガス業", "9,999", "-", "10"],
            ],
        );

        let day = sanitize(&table, None).unwrap();
        assert_eq!(day.date, d(2024, 10, 1));
        assert_eq!(day.records.len(), 2);
        assert_eq!(day.report.index_rows_dropped, 1);
        assert_eq!(day.report.date_resolution, DateResolution::Column);

        let bank = &day.records[0];
        assert_eq!(bank.market_cap, 1_500_000.0);
        assert_eq!(bank.tier, CapTier::Mega);
        assert_eq!(bank.change_pct, Some(1.5));
        assert_eq!(bank.turnover, 2_000.0);

        let utility = &day.records[1];
        assert_eq!(utility.sector, "電気・ガス業");
        assert_eq!(utility.change_pct, None);
        assert_eq!(utility.tier, CapTier::Small);
        assert!(day.report.degraded.is_empty());
    }

    #[test]
    fn malformed_cells_degrade_to_defaults() {
        let table = RawTable::from_rows(
            &HEADER,
            &[
                &["20241001", "銀行業", "lots", "x", "??"],
                &["20241001", "銀行業", "100", "1.0", "5"],
            ],
        );
        let day = sanitize(&table, None).unwrap();
        let rec = &day.records[0];
        assert_eq!(rec.market_cap, 0.0);
        assert_eq!(rec.change_pct, None);
        assert_eq!(rec.turnover, 0.0);

        let fields: Vec<Field> = day.report.degraded.iter().map(|d| d.field).collect();
        assert!(fields.contains(&Field::MarketCap));
        assert!(fields.contains(&Field::ChangePct));
        assert!(fields.contains(&Field::Turnover));
        assert_eq!(day.report.degraded_cells(), 3);
    }

    #[test]
    fn free_form_dates_normalize() {
        let table = RawTable::from_rows(
            &HEADER,
            &[&["2024-10-01 00:00:00", "鉱業", "1", "1", "1"]],
        );
        let day = sanitize(&table, None).unwrap();
        assert_eq!(day.records[0].date, d(2024, 10, 1));
    }

    #[test]
    fn unparseable_row_dates_take_the_dominant_date() {
        let table = RawTable::from_rows(
            &HEADER,
            &[
                &["20241001", "鉱業", "1", "1", "1"],
                &["20241001", "鉱業", "1", "1", "1"],
                &["??", "鉱業", "1", "1", "1"],
            ],
        );
        let day = sanitize(&table, None).unwrap();
        assert!(day.records.iter().all(|r| r.date == d(2024, 10, 1)));
        assert_eq!(day.report.date_resolution, DateResolution::Column);
        assert!(day.report.degraded.iter().any(|x| x.field == Field::Date && x.count == 1));
    }

    #[test]
    fn stray_row_dates_take_the_file_date() {
        let table = RawTable::from_rows(
            &HEADER,
            &[
                &["20241001", "鉱業", "1", "1", "1"],
                &["20241001", "銀行業", "1", "1", "1"],
                &["20250101", "鉱業", "1", "1", "1"],
            ],
        );
        let day = sanitize(&table, None).unwrap();
        assert_eq!(day.date, d(2024, 10, 1));
        assert!(day.records.iter().all(|r| r.date == d(2024, 10, 1)));
        let dates = day.report.degraded.iter().find(|x| x.field == Field::Date).unwrap();
        assert_eq!(dates.count, 1);
        assert_eq!(dates.sample, "20250101");
    }

    #[test]
    fn negative_cap_and_turnover_degrade_to_zero() {
        let table = RawTable::from_rows(
            &HEADER,
            &[
                &["20241001", "銀行業", "100", "1.0", "-500"],
                &["20241001", "銀行業", "-99", "-1.0", "10"],
            ],
        );
        let day = sanitize(&table, None).unwrap();
        assert_eq!(day.records[0].market_cap, 100.0);
        assert_eq!(day.records[0].turnover, 0.0);
        assert_eq!(day.records[1].market_cap, 0.0);
        assert_eq!(day.records[1].turnover, 10.0);
        assert_eq!(day.records[1].change_pct, Some(-1.0));

        let fields: Vec<Field> = day.report.degraded.iter().map(|d| d.field).collect();
        assert!(fields.contains(&Field::MarketCap));
        assert!(fields.contains(&Field::Turnover));
        assert_eq!(day.report.degraded_cells(), 2);

        let rows = crate::engine::aggregate_day(day.date, &day.records, None);
        assert!(rows
            .iter()
            .all(|r| r.weighted_change.abs() <= 1.0 && r.turnover >= 0.0));
    }

    #[test]
    fn unusable_date_column_falls_back_to_hint() {
        let table = RawTable::from_rows(&HEADER, &[&["n/a", "鉱業", "1", "1", "1"]]);
        let day = sanitize(&table, Some(d(2024, 9, 30))).unwrap();
        assert_eq!(day.date, d(2024, 9, 30));
        assert_eq!(day.report.date_resolution, DateResolution::FileHint);
        assert_eq!(day.records[0].date, d(2024, 9, 30));
    }

    #[test]
    fn no_date_anywhere_falls_back_to_today() {
        let table = RawTable::from_rows(
            &["業種", "時価総額（百万円）", "前日比（％）", "売買代金（千円）"],
            &[&["鉱業", "1", "1", "1"]],
        );
        let day = sanitize(&table, None).unwrap();
        assert_eq!(day.date, d(2030, 1, 1));
        assert_eq!(day.report.date_resolution, DateResolution::Today);
    }

    #[test]
    fn empty_input_is_data_unavailable() {
        let table = RawTable::from_rows(&HEADER, &[]);
        let err = sanitize(&table, Some(d(2024, 10, 1))).unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable { .. }));
    }

    #[test]
    fn only_index_rows_is_data_unavailable() {
        let table = RawTable::from_rows(&HEADER, &[&["20241001", "株価指数", "-", "1", "-"]]);
        assert!(matches!(
            sanitize(&table, None),
            Err(EngineError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn missing_required_column_is_data_unavailable() {
        let table = RawTable::from_rows(&["日付", "業種"], &[&["20241001", "鉱業"]]);
        assert!(matches!(
            sanitize(&table, None),
            Err(EngineError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn turnover_only_accepts_fragment_header() {
        let vocab = SectorVocabulary::tse33();
        let columns = ColumnAliases::default();
        let table = RawTable::from_rows(
            &["日付", "業種", "売買代金（百万円）"],
            &[&["20241001", "鉱業", "1,000"]],
        );
        let day = Sanitizer::new(&vocab, &columns)
            .sanitize(&table, None, Requirement::TurnoverOnly)
            .unwrap();
        assert_eq!(day.records[0].turnover, 1000.0);
        assert_eq!(day.records[0].change_pct, None);
    }

    #[test]
    fn blank_sector_rows_are_skipped() {
        let table = RawTable::from_rows(
            &HEADER,
            &[
                &["20241001", "", "1", "1", "1"],
                &["20241001", "鉱業", "1", "1", "1"],
            ],
        );
        let day = sanitize(&table, None).unwrap();
        assert_eq!(day.records.len(), 1);
        assert_eq!(day.report.blank_sector_rows, 1);
    }
}
