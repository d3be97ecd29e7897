use polars::prelude::*;
use std::path::Path;

use super::table::RawTable;
use crate::error::EngineError;

/// Reads raw daily CSV files into untyped tables.
///
/// Every column is read as a string (schema inference disabled) so that
/// locale formatting such as `1,234` or `-` survives until the sanitizer.
/// Files are expected to be UTF-8; invalid bytes are replaced.
pub struct DataIngestor {
    separator: u8,
}

impl DataIngestor {
    pub fn new() -> Self {
        Self { separator: b',' }
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Ingest a CSV file. A zero-byte file yields an empty table.
    pub fn ingest_csv(&self, path: &Path) -> Result<RawTable, EngineError> {
        let meta = std::fs::metadata(path)
            .map_err(|e| EngineError::Ingest(format!("{}: {e}", path.display())))?;
        if meta.len() == 0 {
            return Ok(RawTable::default());
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_separator(self.separator)
            .with_encoding(CsvEncoding::LossyUtf8)
            .with_truncate_ragged_lines(true)
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(|e| EngineError::Ingest(format!("{}: {e}", path.display())))?;

        dataframe_to_table(&df)
    }
}

impl Default for DataIngestor {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten a DataFrame into a [`RawTable`], casting every column to text.
pub fn dataframe_to_table(df: &DataFrame) -> Result<RawTable, EngineError> {
    let header: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    let mut rows: Vec<Vec<String>> = vec![Vec::with_capacity(header.len()); df.height()];

    for column in df.get_columns() {
        let series = column
            .as_materialized_series()
            .cast(&DataType::String)
            .map_err(|e| EngineError::Ingest(format!("column {}: {e}", column.name())))?;
        let values = series
            .str()
            .map_err(|e| EngineError::Ingest(format!("column {}: {e}", column.name())))?;
        for (row, value) in rows.iter_mut().zip(values.into_iter()) {
            row.push(value.unwrap_or("").to_string());
        }
    }

    Ok(RawTable::new(header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_every_column_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "prices.csv",
            "日付,業種,時価総額（百万円）\n20241001,銀行業,\"1,234\"\n20241001,株価指数,-\n",
        );

        let table = DataIngestor::new().ingest_csv(&path).unwrap();
        assert_eq!(table.header, vec!["日付", "業種", "時価総額（百万円）"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), "20241001");
        assert_eq!(table.cell(0, 2), "1,234");
        assert_eq!(table.cell(1, 2), "-");
    }

    #[test]
    fn nulls_become_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "gaps.csv", "a,b\n1,\n,2\n");
        let table = DataIngestor::new().ingest_csv(&path).unwrap();
        assert_eq!(table.cell(0, 1), "");
        assert_eq!(table.cell(1, 0), "");
    }

    #[test]
    fn zero_byte_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "empty.csv", "");
        let table = DataIngestor::new().ingest_csv(&path).unwrap();
        assert!(table.is_empty());
        assert!(table.header.is_empty());
    }

    #[test]
    fn missing_file_is_ingest_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataIngestor::new()
            .ingest_csv(&dir.path().join("nope.csv"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Ingest(_)));
    }
}
