//! SectorPulse core: sector/tier aggregation and turnover momentum engine.
//!
//! - Raw-file ingestion and row sanitizing (`data`)
//! - Domain types: stock records, capitalization tiers, summary rows
//! - Sector aggregation, competition ranking, rolling momentum (`engine`)
//! - Keyed first-write-wins ledger merge (`ledger`)
//! - Pivot views and the latest-date digest derived from the ledgers

pub mod data;
pub mod digest;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod views;
pub mod vocab;

pub use error::EngineError;
pub use vocab::SectorVocabulary;
