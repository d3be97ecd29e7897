//! Per-day sector × tier aggregation.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::data::IndexFeed;
use crate::domain::{
    round_to, CapTier, ChangeSource, SectorTierAggregate, StockRecord, TierKey, OUTPUT_DECIMALS,
};

#[derive(Debug, Default, Clone, Copy)]
struct TierAccumulator {
    up: u32,
    down: u32,
    weighted_sum: f64,
    weight: f64,
    turnover: f64,
}

impl TierAccumulator {
    fn push(&mut self, rec: &StockRecord) {
        if rec.is_up() {
            self.up += 1;
        } else if rec.is_down() {
            self.down += 1;
        }
        if let Some(change) = rec.change_pct {
            self.weighted_sum += change * rec.market_cap;
            self.weight += rec.market_cap;
        }
        self.turnover += rec.turnover;
    }
}

/// Σ(value × weight) / Σ(weight), 0 when the total weight is zero or the
/// result is not finite.
pub fn weighted_mean(pairs: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let (num, den) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(n, d), (v, w)| (n + v * w, d + w));
    guarded_ratio(num, den)
}

fn guarded_ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    let q = num / den;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}

/// Overall weighted change derived from already-rounded tier rows, weighted
/// by tier turnover.
pub fn derive_overall_change(tiers: &[SectorTierAggregate]) -> f64 {
    round_to(
        weighted_mean(tiers.iter().map(|t| (t.weighted_change, t.turnover))),
        OUTPUT_DECIMALS,
    )
}

/// Aggregate one day's records.
///
/// Emits one row per (sector, tier) combination present in the input plus
/// one `Overall` row per sector. Rows are ordered by sector name, then
/// small → mega → overall. When `feed` carries a figure for a sector, the
/// overall row uses it verbatim.
pub fn aggregate_day(
    date: NaiveDate,
    records: &[StockRecord],
    feed: Option<&IndexFeed>,
) -> Vec<SectorTierAggregate> {
    let mut groups: BTreeMap<&str, BTreeMap<CapTier, TierAccumulator>> = BTreeMap::new();
    for rec in records {
        groups
            .entry(rec.sector.as_str())
            .or_default()
            .entry(rec.tier)
            .or_default()
            .push(rec);
    }

    let mut out = Vec::with_capacity(groups.len() * 5);
    for (sector, tiers) in groups {
        let start = out.len();
        for (tier, acc) in tiers {
            out.push(SectorTierAggregate {
                date,
                sector: sector.to_string(),
                tier: TierKey::Tier(tier),
                up_count: acc.up,
                down_count: acc.down,
                weighted_change: round_to(guarded_ratio(acc.weighted_sum, acc.weight), OUTPUT_DECIMALS),
                turnover: acc.turnover,
                change_source: ChangeSource::Derived,
            });
        }

        let tier_rows = &out[start..];
        let (weighted_change, change_source) = match feed.and_then(|f| f.change_for(sector)) {
            Some(published) => (published, ChangeSource::IndexFeed),
            None => (derive_overall_change(tier_rows), ChangeSource::Derived),
        };
        let overall = SectorTierAggregate {
            date,
            sector: sector.to_string(),
            tier: TierKey::Overall,
            up_count: tier_rows.iter().map(|t| t.up_count).sum(),
            down_count: tier_rows.iter().map(|t| t.down_count).sum(),
            weighted_change,
            turnover: tier_rows.iter().map(|t| t.turnover).sum(),
            change_source,
        };
        out.push(overall);
    }
    out
}
