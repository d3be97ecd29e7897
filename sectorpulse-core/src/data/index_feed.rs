//! Authoritative per-sector change figures published with the index data.
//!
//! The index file lists one row per index; sector indices are named after
//! the sector itself, so names are normalized through the same vocabulary
//! as stock rows and matched exactly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::sanitize::{parse_locale_number, NumericCell};
use super::table::RawTable;
use crate::error::EngineError;
use crate::vocab::SectorVocabulary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexColumns {
    pub name: Vec<String>,
    pub change_pct: Vec<String>,
}

impl Default for IndexColumns {
    fn default() -> Self {
        Self {
            name: vec!["指数名".to_string(), "index_name".to_string()],
            change_pct: vec![
                "前日比（％）".to_string(),
                "前日比(%)".to_string(),
                "change_pct".to_string(),
            ],
        }
    }
}

/// Sector name → published percent change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexFeed {
    changes: HashMap<String, f64>,
}

impl IndexFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an index table. The first row for a name wins; rows whose
    /// change does not parse are skipped.
    pub fn from_table(
        table: &RawTable,
        columns: &IndexColumns,
        vocab: &SectorVocabulary,
    ) -> Result<Self, EngineError> {
        let name_col = table.find_column(&columns.name);
        let change_col = table.find_column(&columns.change_pct);
        let (Some(name_col), Some(change_col)) = (name_col, change_col) else {
            return Err(EngineError::Ingest(format!(
                "index table lacks name/change columns (header: {:?})",
                table.header
            )));
        };

        let mut feed = Self::new();
        let mut skipped = 0usize;
        for i in 0..table.len() {
            let name = vocab.normalize(table.cell(i, name_col));
            if name.is_empty() {
                continue;
            }
            match parse_locale_number(table.cell(i, change_col)) {
                NumericCell::Value(v) => {
                    feed.changes.entry(name).or_insert(v);
                }
                _ => skipped += 1,
            }
        }
        debug!(entries = feed.len(), skipped, "loaded index feed");
        Ok(feed)
    }

    pub fn insert(&mut self, sector: impl Into<String>, change_pct: f64) {
        self.changes.insert(sector.into(), change_pct);
    }

    pub fn change_for(&self, sector: &str) -> Option<f64> {
        self.changes.get(sector).copied()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl FromIterator<(String, f64)> for IndexFeed {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins_and_names_normalize() {
        let table = RawTable::from_rows(
            &["指数名", "前日比（％）"],
            &[
                &["TOPIX", "0.52"],
                &["電気･ガス業", "-1.25"],
                &["電気・ガス業", "9.99"],
                &["銀行業", "-"],
            ],
        );
        let feed =
            IndexFeed::from_table(&table, &IndexColumns::default(), &SectorVocabulary::tse33())
                .unwrap();
        assert_eq!(feed.change_for("電気・ガス業"), Some(-1.25));
        assert_eq!(feed.change_for("TOPIX"), Some(0.52));
        assert_eq!(feed.change_for("銀行業"), None);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn missing_columns_is_an_ingest_error() {
        let table = RawTable::from_rows(&["name"], &[&["TOPIX"]]);
        let err =
            IndexFeed::from_table(&table, &IndexColumns::default(), &SectorVocabulary::tse33())
                .unwrap_err();
        assert!(matches!(err, EngineError::Ingest(_)));
    }
}
