//! Loading raw files into sanitized days.
//!
//! Window files are independent, so they are ingested and sanitized in
//! parallel; the momentum engine only runs once every file has been read.

use rayon::prelude::*;
use std::path::Path;
use tracing::warn;

use sectorpulse_core::data::{
    ColumnAliases, DataIngestor, IndexColumns, IndexFeed, Requirement, SanitizedDay, Sanitizer,
};
use sectorpulse_core::engine::DailyTurnover;
use sectorpulse_core::{EngineError, SectorVocabulary};

use crate::discovery::RawFile;

/// Ingest and sanitize one raw stock file, hinting its name's date.
pub fn load_day(
    file: &RawFile,
    sanitizer: &Sanitizer<'_>,
    requirement: Requirement,
) -> Result<SanitizedDay, EngineError> {
    let table = DataIngestor::new().ingest_csv(&file.path)?;
    sanitizer.sanitize(&table, Some(file.date), requirement)
}

/// Outcome of loading a momentum window.
#[derive(Debug, Default)]
pub struct WindowLoad {
    /// Per-file turnover totals, in window order.
    pub days: Vec<DailyTurnover>,
    /// Files that could not be used.
    pub failures: Vec<(RawFile, EngineError)>,
}

/// Load every file of a momentum window in parallel. Unusable files are
/// logged and left out; they never fail the window as a whole.
pub fn load_window(
    files: &[RawFile],
    vocab: &SectorVocabulary,
    columns: &ColumnAliases,
) -> WindowLoad {
    let sanitizer = Sanitizer::new(vocab, columns);
    let results: Vec<(RawFile, Result<SanitizedDay, EngineError>)> = files
        .par_iter()
        .map(|f| (f.clone(), load_day(f, &sanitizer, Requirement::TurnoverOnly)))
        .collect();

    let mut load = WindowLoad::default();
    for (file, result) in results {
        match result {
            Ok(day) => load.days.push(DailyTurnover::from_records(&day.records)),
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "skipping window file");
                load.failures.push((file, e));
            }
        }
    }
    load
}

/// Load the index feed for a date. Any failure just means no overrides.
pub fn load_index_feed(
    path: Option<&Path>,
    vocab: &SectorVocabulary,
    columns: &IndexColumns,
) -> Option<IndexFeed> {
    let path = path?;
    let result = DataIngestor::new()
        .ingest_csv(path)
        .and_then(|table| IndexFeed::from_table(&table, columns, vocab));
    match result {
        Ok(feed) if !feed.is_empty() => Some(feed),
        Ok(_) => {
            warn!(file = %path.display(), "index file has no usable rows");
            None
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "index file unusable, deriving overall changes");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, body: &str) -> RawFile {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        let stamp = name.trim_end_matches(".csv").rsplit('_').next().unwrap();
        RawFile {
            date: NaiveDate::parse_from_str(stamp, "%Y%m%d").unwrap(),
            path,
        }
    }

    #[test]
    fn window_skips_unusable_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(
            dir.path(),
            "p_20241001.csv",
            "日付,業種,売買代金（千円）\n20241001,鉱業,\"1,000\"\n",
        );
        let empty = write(dir.path(), "p_20241002.csv", "");
        let missing = RawFile {
            date: NaiveDate::from_ymd_opt(2024, 10, 3).unwrap(),
            path: PathBuf::from("/nonexistent/p_20241003.csv"),
        };

        let vocab = SectorVocabulary::tse33();
        let load = load_window(&[good, empty, missing], &vocab, &ColumnAliases::default());
        assert_eq!(load.days.len(), 1);
        assert_eq!(load.failures.len(), 2);
    }

    #[test]
    fn index_feed_is_optional() {
        let vocab = SectorVocabulary::tse33();
        let cols = IndexColumns::default();
        assert!(load_index_feed(None, &vocab, &cols).is_none());
        assert!(load_index_feed(Some(Path::new("/nonexistent.csv")), &vocab, &cols).is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx.csv");
        std::fs::write(&path, "指数名,前日比（％）\n鉱業,1.25\n").unwrap();
        let feed = load_index_feed(Some(&path), &vocab, &cols).unwrap();
        assert_eq!(feed.change_for("鉱業"), Some(1.25));
    }
}
