//! Raw input: file ingestion, sanitizing and the authoritative index feed.

pub mod index_feed;
pub mod ingest;
pub mod sanitize;
pub mod table;

pub use index_feed::{IndexColumns, IndexFeed};
pub use ingest::{dataframe_to_table, DataIngestor};
pub use sanitize::{
    parse_locale_number, ColumnAliases, DateResolution, Field, NumericCell, ParseDegraded,
    Requirement, SanitizeReport, SanitizedDay, Sanitizer,
};
pub use table::RawTable;
