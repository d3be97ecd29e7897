//! SectorPulse runner: batch orchestration around `sectorpulse-core`.
//!
//! - TOML pipeline configuration
//! - Raw file discovery and trailing-window selection
//! - Parallel window loading (rayon)
//! - Ledger stores (CSV directory, in-memory)
//! - Per-day pipeline, backfill, views, digest and ledger status
//! - CSV artifacts and JSON run manifests with BLAKE3 input hashes

pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod store;

pub use config::{ConfigError, PipelineConfig};
pub use discovery::{discover, trailing_window, RawFile};
pub use error::RunError;
pub use export::{MergeSummary, RunManifest, StageStatus};
pub use pipeline::{BackfillReport, DayReport, Pipeline, SheetStatus, ViewsReport};
pub use store::{CsvLedgerStore, LedgerStore, MemoryLedgerStore};
