//! Rolling trading-value momentum per sector.
//!
//! Turnover is summed per (date, sector) across the trailing window of daily
//! files, then each sector's series is smoothed with trailing means over 3, 5,
//! 10 and 20 observations. Means use however many observations exist
//! (minimum one), so early dates and short windows still yield values.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::domain::{round_to, MomentumWindowRow, StockRecord, OUTPUT_DECIMALS};
use crate::error::EngineError;

/// Number of daily files (target included) the engine looks back over.
pub const DEFAULT_LOOKBACK: usize = 20;

/// One sanitized daily file reduced to turnover totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyTurnover {
    totals: BTreeMap<(NaiveDate, String), f64>,
}

impl DailyTurnover {
    /// Sum turnover per (record date, sector).
    pub fn from_records(records: &[StockRecord]) -> Self {
        let mut totals = BTreeMap::new();
        for rec in records {
            *totals.entry((rec.date, rec.sector.clone())).or_insert(0.0) += rec.turnover;
        }
        Self { totals }
    }

    pub fn add(&mut self, date: NaiveDate, sector: impl Into<String>, turnover: f64) {
        *self.totals.entry((date, sector.into())).or_insert(0.0) += turnover;
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Trailing mean over up to `window` observations ending at each index.
///
/// The first `window - 1` positions average over what is available, so the
/// output never contains NaN for finite input. A zero window is treated as 1.
pub fn rolling_mean(series: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(series.len());
    let mut sum = 0.0;
    for (i, v) in series.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= series[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    let q = num / den;
    q.is_finite().then(|| round_to(q, OUTPUT_DECIMALS))
}

#[derive(Debug, Clone)]
pub struct MomentumEngine {
    lookback: usize,
}

impl MomentumEngine {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Compute momentum rows for the latest date present in `days`.
    ///
    /// Returns one row per sector that has turnover on that date, sorted by
    /// sector. Only the `lookback` most recent distinct dates feed the means;
    /// older history in `days` is ignored.
    pub fn compute(&self, days: &[DailyTurnover]) -> Result<Vec<MomentumWindowRow>, EngineError> {
        let dates: BTreeSet<NaiveDate> = days
            .iter()
            .flat_map(|day| day.totals.keys().map(|(d, _)| *d))
            .collect();
        let cutoff = dates.iter().rev().take(self.lookback).last().copied();

        let mut combined: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for day in days {
            for ((date, sector), turnover) in &day.totals {
                if cutoff.is_some_and(|c| *date < c) {
                    continue;
                }
                *combined
                    .entry(sector.as_str())
                    .or_default()
                    .entry(*date)
                    .or_insert(0.0) += turnover;
            }
        }

        let Some(&target) = dates.last() else {
            return Err(EngineError::InsufficientWindow {
                target: None,
                found: days.len(),
            });
        };

        let mut rows = Vec::new();
        for (sector, series) in &combined {
            let Some(&last_date) = series.keys().next_back() else {
                continue;
            };
            if last_date != target {
                continue;
            }
            let values: Vec<f64> = series.values().copied().collect();
            let last = values.len() - 1;
            let ma = |w: usize| rolling_mean(&values, w)[last];
            let (ma3, ma5, ma10, ma20) = (ma(3), ma(5), ma(10), ma(20));

            rows.push(MomentumWindowRow {
                date: target,
                sector: sector.to_string(),
                turnover: values[last],
                ma3,
                ma5,
                ma10,
                ma20,
                ratio_5_20: ratio(ma5, ma20),
                ratio_3_10: ratio(ma3, ma10),
            });
        }

        debug!(
            target = %target,
            files = days.len(),
            sectors = rows.len(),
            "computed momentum window"
        );
        Ok(rows)
    }
}

impl Default for MomentumEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK)
    }
}
