//! Output row types: sector/tier aggregates, ranks, momentum windows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::tier::TierKey;

/// Where an aggregate's weighted change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// Computed from the tracked records (or from the tier rows, for overall).
    Derived,
    /// Taken verbatim from the authoritative index feed.
    IndexFeed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorTierAggregate {
    pub date: NaiveDate,
    pub sector: String,
    pub tier: TierKey,
    pub up_count: u32,
    pub down_count: u32,
    /// Capitalization-weighted average percent change, rounded.
    pub weighted_change: f64,
    pub turnover: f64,
    pub change_source: ChangeSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorRankRow {
    pub date: NaiveDate,
    pub sector: String,
    pub weighted_change: f64,
    /// Competition rank, 1 = strongest.
    pub rank: u32,
}

/// A sector-summary artifact row: the aggregate plus its sector's rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSummaryRow {
    #[serde(flatten)]
    pub aggregate: SectorTierAggregate,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumWindowRow {
    pub date: NaiveDate,
    pub sector: String,
    pub turnover: f64,
    pub ma3: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    /// 5-day / 20-day average; `None` when the division is not a finite number.
    pub ratio_5_20: Option<f64>,
    /// 3-day / 10-day average; `None` when the division is not a finite number.
    pub ratio_3_10: Option<f64>,
}
