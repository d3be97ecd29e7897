//! Sanitized per-security daily record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::tier::CapTier;

/// One listed security on one trading day, after sanitizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub date: NaiveDate,
    /// Canonical sector name.
    pub sector: String,
    pub tier: CapTier,
    /// Market capitalization in millions; 0 when the raw value was unusable.
    pub market_cap: f64,
    /// Percent change from the previous close; `None` when unknown.
    pub change_pct: Option<f64>,
    /// Trading value in thousands; 0 when the raw value was unusable.
    pub turnover: f64,
}

impl StockRecord {
    pub fn new(
        date: NaiveDate,
        sector: impl Into<String>,
        market_cap: f64,
        change_pct: Option<f64>,
        turnover: f64,
    ) -> Self {
        Self {
            date,
            sector: sector.into(),
            tier: CapTier::classify(market_cap),
            market_cap,
            change_pct,
            turnover,
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self.change_pct, Some(c) if c > 0.0)
    }

    pub fn is_down(&self) -> bool {
        matches!(self.change_pct, Some(c) if c <= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_derived_from_cap() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let rec = StockRecord::new(date, "銀行業", 250_000.0, Some(1.2), 5_000.0);
        assert_eq!(rec.tier, CapTier::Large);
    }

    #[test]
    fn unchanged_counts_as_down_and_unknown_as_neither() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let flat = StockRecord::new(date, "A", 1.0, Some(0.0), 0.0);
        assert!(!flat.is_up());
        assert!(flat.is_down());

        let unknown = StockRecord::new(date, "A", 1.0, None, 0.0);
        assert!(!unknown.is_up());
        assert!(!unknown.is_down());
    }
}
