//! Domain types shared by every stage of the engine.

pub mod date;
pub mod record;
pub mod summary;
pub mod tier;

pub use date::{format_ledger_date, parse_flexible_date, parse_ledger_date};
pub use record::StockRecord;
pub use summary::{
    ChangeSource, MomentumWindowRow, SectorRankRow, SectorSummaryRow, SectorTierAggregate,
};
pub use tier::{CapTier, TierKey};

/// Round to a fixed number of decimal places (half away from zero).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Decimal places kept for weighted changes and momentum ratios.
pub const OUTPUT_DECIMALS: u32 = 3;
