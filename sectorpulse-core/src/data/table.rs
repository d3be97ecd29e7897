//! Untyped tabular input as delivered by the raw-file collaborator.

use serde::{Deserialize, Serialize};

/// Header plus string rows. Cells are never null; missing values are `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let header = header
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Self { header, rows }
    }

    /// Convenience constructor used heavily in tests.
    pub fn from_rows(header: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first header equal to any candidate.
    pub fn find_column(&self, candidates: &[String]) -> Option<usize> {
        candidates
            .iter()
            .find_map(|c| self.header.iter().position(|h| h == c.trim()))
    }

    /// Index of the first header containing `fragment`.
    pub fn find_column_containing(&self, fragment: &str) -> Option<usize> {
        if fragment.is_empty() {
            return None;
        }
        self.header.iter().position(|h| h.contains(fragment))
    }

    /// Cell text, `""` for ragged rows.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bom_and_padding_stripped() {
        let t = RawTable::new(vec!["\u{feff}日付".into(), " 業種 ".into()], vec![]);
        assert_eq!(t.header, vec!["日付", "業種"]);
    }

    #[test]
    fn find_column_prefers_candidate_order() {
        let t = RawTable::from_rows(&["sector", "業種"], &[]);
        let found = t.find_column(&["業種".to_string(), "sector".to_string()]);
        assert_eq!(found, Some(1));
    }

    #[test]
    fn ragged_rows_read_as_empty() {
        let t = RawTable::from_rows(&["a", "b"], &[&["1"]]);
        assert_eq!(t.cell(0, 0), "1");
        assert_eq!(t.cell(0, 1), "");
        assert_eq!(t.cell(5, 0), "");
    }

    #[test]
    fn fragment_match() {
        let t = RawTable::from_rows(&["コード", "売買代金（千円）"], &[]);
        assert_eq!(t.find_column_containing("売買代金"), Some(1));
        assert_eq!(t.find_column_containing(""), None);
    }
}
