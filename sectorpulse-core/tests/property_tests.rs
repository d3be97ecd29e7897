//! Property tests for engine invariants.
//!
//! 1. Tier classification is total and monotone in capitalization
//! 2. Weighted averages stay finite and within the input range
//! 3. Competition ranks are consistent with the value order
//! 4. Rolling means honour min-periods and window bounds
//! 5. Ledger merges are idempotent and respect the retention bound

use chrono::NaiveDate;
use proptest::prelude::*;
use sectorpulse_core::domain::{CapTier, StockRecord};
use sectorpulse_core::engine::{aggregate_day, competition_rank, rolling_mean, weighted_mean};
use sectorpulse_core::ledger::{merge, LedgerOrdering, LedgerSpec, LedgerTable};

// ── Strategies ───────────────────────────────────────────────────────

fn arb_cap() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        Just(9_999.0),
        Just(10_000.0),
        Just(1_000_000.0),
        0.0..5_000_000.0_f64,
    ]
}

fn arb_record() -> impl Strategy<Value = StockRecord> {
    (
        prop::sample::select(vec!["A", "B", "C"]),
        arb_cap(),
        prop::option::of(-20.0..20.0_f64),
        0.0..1_000_000.0_f64,
    )
        .prop_map(|(sector, cap, change, turnover)| {
            StockRecord::new(
                NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
                sector,
                cap,
                change,
                turnover,
            )
        })
}

fn ledger_batch(day: u32, sectors: usize) -> LedgerTable {
    let mut t = LedgerTable::with_header(&["date", "sector", "value"]);
    for s in 0..sectors {
        t.push_row(vec![
            format!("2024/01/{day:02}"),
            format!("S{s}"),
            format!("{day}.{s}"),
        ]);
    }
    t
}

// ── 1. Tier classification ───────────────────────────────────────────

proptest! {
    #[test]
    fn tier_is_monotone(a in -1e7..1e7_f64, b in -1e7..1e7_f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(CapTier::classify(lo) <= CapTier::classify(hi));
    }

    #[test]
    fn tier_is_total(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        let tier = CapTier::classify(v);
        prop_assert!(CapTier::ALL.contains(&tier));
    }
}

// ── 2. Weighted averages ─────────────────────────────────────────────

proptest! {
    #[test]
    fn weighted_mean_within_input_range(
        pairs in prop::collection::vec((-50.0..50.0_f64, 0.0..1e6_f64), 1..30)
    ) {
        let m = weighted_mean(pairs.iter().copied());
        prop_assert!(m.is_finite());
        let total: f64 = pairs.iter().map(|p| p.1).sum();
        if total > 0.0 {
            let lo = pairs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
            let hi = pairs.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(m >= lo - 1e-9 && m <= hi + 1e-9);
        } else {
            prop_assert_eq!(m, 0.0);
        }
    }

    #[test]
    fn aggregates_are_finite_and_overall_counts_add_up(
        records in prop::collection::vec(arb_record(), 0..60)
    ) {
        let date = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let rows = aggregate_day(date, &records, None);
        for row in &rows {
            prop_assert!(row.weighted_change.is_finite());
        }
        for overall in rows.iter().filter(|r| r.tier.is_overall()) {
            let tiers = rows.iter().filter(|r| r.sector == overall.sector && !r.tier.is_overall());
            let (up, down) = tiers.fold((0, 0), |(u, d), r| (u + r.up_count, d + r.down_count));
            prop_assert_eq!(overall.up_count, up);
            prop_assert_eq!(overall.down_count, down);
        }
    }
}

// ── 3. Competition ranking ───────────────────────────────────────────

proptest! {
    #[test]
    fn ranks_follow_values(values in prop::collection::vec(-100i32..100, 0..40)) {
        let values: Vec<f64> = values.into_iter().map(f64::from).collect();
        let ranks = competition_rank(&values);
        prop_assert_eq!(ranks.len(), values.len());
        for (i, &v) in values.iter().enumerate() {
            let greater = values.iter().filter(|&&w| w > v).count() as u32;
            prop_assert_eq!(ranks[i], greater + 1);
        }
    }
}

// ── 4. Rolling means ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn rolling_mean_bounds(
        series in prop::collection::vec(0.0..1e6_f64, 0..50),
        window in 1usize..25,
    ) {
        let out = rolling_mean(&series, window);
        prop_assert_eq!(out.len(), series.len());
        if let Some(first) = series.first() {
            prop_assert!((out[0] - first).abs() < 1e-6);
        }
        for (i, m) in out.iter().enumerate() {
            let start = (i + 1).saturating_sub(window);
            let slice = &series[start..=i];
            let expected = slice.iter().sum::<f64>() / slice.len() as f64;
            prop_assert!((m - expected).abs() <= 1e-6 * expected.abs().max(1.0));
        }
    }
}

// ── 5. Ledger merge ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_twice_adds_nothing(days in 1u32..10, sectors in 1usize..8) {
        let spec = LedgerSpec::new(&["date", "sector"], LedgerOrdering::NewestFirst, None);
        let mut ledger = LedgerTable::default();
        for day in 1..=days {
            ledger = merge(&ledger, &ledger_batch(day, sectors), &spec).unwrap().table;
        }
        let again = merge(&ledger, &ledger_batch(days, sectors), &spec).unwrap();
        prop_assert_eq!(again.added, 0);
        prop_assert_eq!(again.total, ledger.len());
    }

    #[test]
    fn bounded_ledger_keeps_most_recent(
        days in 1u32..20,
        sectors in 1usize..6,
        bound in 1usize..30,
        newest_first in any::<bool>(),
    ) {
        let ordering = if newest_first { LedgerOrdering::NewestFirst } else { LedgerOrdering::OldestFirst };
        let spec = LedgerSpec::new(&["date", "sector"], ordering, Some(bound));
        let mut ledger = LedgerTable::default();
        for day in 1..=days {
            ledger = merge(&ledger, &ledger_batch(day, sectors), &spec).unwrap().table;
            prop_assert!(ledger.len() <= bound);
        }

        // Retained rows are the newest `bound` of everything merged.
        let total = days as usize * sectors;
        let kept = total.min(bound);
        prop_assert_eq!(ledger.len(), kept);
        let newest = format!("2024/01/{days:02}");
        let newest_idx = if newest_first { 0 } else { ledger.len() - 1 };
        prop_assert_eq!(ledger.cell(newest_idx, 0), newest.as_str());
    }
}
