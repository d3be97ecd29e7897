//! Trading-date parsing and the ledger's date representation.
//!
//! Raw files carry dates either as integer-encoded `YYYYMMDD` or as free-form
//! strings. Ledgers and summary artifacts always use `YYYY/MM/DD`.

use chrono::{NaiveDate, NaiveDateTime};

const LEDGER_FORMAT: &str = "%Y/%m/%d";

pub fn format_ledger_date(date: NaiveDate) -> String {
    date.format(LEDGER_FORMAT).to_string()
}

/// Parse a ledger cell. Accepts the other common separators as well, since
/// hand-edited sheets drift.
pub fn parse_ledger_date(s: &str) -> Option<NaiveDate> {
    parse_flexible_date(s)
}

/// Parse a raw date cell.
///
/// Accepted: `20241001`, `20241001.0`, `2024/10/01`, `2024-10-01`,
/// `2024.10.01`, each optionally followed by a time part.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let integer_part = s.strip_suffix(".0").unwrap_or(s);
    if integer_part.len() == 8 && integer_part.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(integer_part, "%Y%m%d").ok();
    }

    for fmt in ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    for fmt in [
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    None
}

/// Extract the trailing `YYYYMMDD` stamp from a file stem such as
/// `japan-all-stock-prices_20241001`.
pub fn date_from_file_stem(stem: &str) -> Option<NaiveDate> {
    let stamp = stem.rsplit(['_', '-']).next()?;
    if stamp.len() != 8 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(stamp, "%Y%m%d").ok()
}
