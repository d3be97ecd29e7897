//! Raw file discovery and trailing-window selection.
//!
//! Raw files carry their trading date in the name
//! (`{prefix}YYYYMMDD.csv`); discovery never opens them.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::debug;

use sectorpulse_core::domain::date::date_from_file_stem;

use crate::error::RunError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// List `{prefix}YYYYMMDD.csv` files in `dir`, sorted by date.
///
/// A missing directory yields an empty list. When two files resolve to the
/// same date the lexically last path wins.
pub fn discover(dir: &Path, prefix: &str) -> Result<Vec<RawFile>, RunError> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "raw directory does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| RunError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| RunError::io(dir, e))?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !stem.starts_with(prefix) {
            continue;
        }
        if let Some(date) = date_from_file_stem(stem) {
            files.push(RawFile { date, path });
        }
    }

    files.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
    files.dedup_by(|later, earlier| {
        if later.date == earlier.date {
            std::mem::swap(later, earlier);
            true
        } else {
            false
        }
    });
    Ok(files)
}

pub fn find(files: &[RawFile], date: NaiveDate) -> Option<&RawFile> {
    files
        .binary_search_by(|f| f.date.cmp(&date))
        .ok()
        .map(|i| &files[i])
}

/// The target file plus up to `lookback - 1` files preceding it.
///
/// `files` must be sorted by date. Empty when `target` has no file.
pub fn trailing_window(files: &[RawFile], target: NaiveDate, lookback: usize) -> &[RawFile] {
    let Ok(end) = files.binary_search_by(|f| f.date.cmp(&target)) else {
        return &[];
    };
    let start = (end + 1).saturating_sub(lookback.max(1));
    &files[start..=end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "x").unwrap();
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    #[test]
    fn discovers_matching_files_in_date_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "japan-all-stock-prices_20241002.csv");
        touch(dir.path(), "japan-all-stock-prices_20241001.csv");
        touch(dir.path(), "tosho-index-data_20241001.csv");
        touch(dir.path(), "japan-all-stock-prices_latest.csv");
        touch(dir.path(), "japan-all-stock-prices_20241003.txt");

        let files = discover(dir.path(), "japan-all-stock-prices_").unwrap();
        let dates: Vec<NaiveDate> = files.iter().map(|f| f.date).collect();
        assert_eq!(dates, vec![d(1), d(2)]);
    }

    #[test]
    fn missing_dir_is_empty() {
        let files = discover(Path::new("/nonexistent/raw"), "x_").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn window_is_bounded_by_lookback() {
        let files: Vec<RawFile> = (1..=25)
            .map(|day| RawFile {
                date: d(day),
                path: PathBuf::from(format!("f{day}.csv")),
            })
            .collect();

        let window = trailing_window(&files, d(25), 20);
        assert_eq!(window.len(), 20);
        assert_eq!(window[0].date, d(6));
        assert_eq!(window[19].date, d(25));

        let window = trailing_window(&files, d(3), 20);
        assert_eq!(window.len(), 3);

        assert!(trailing_window(&files, d(31), 20).is_empty());
        assert_eq!(find(&files, d(7)).unwrap().path, PathBuf::from("f7.csv"));
    }
}
