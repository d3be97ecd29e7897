//! Competition ranking of sectors by overall weighted change.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::{SectorRankRow, SectorSummaryRow, SectorTierAggregate};
use crate::vocab::SectorVocabulary;

fn descending(a: f64, b: f64) -> Ordering {
    // NaN ranks below every number.
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Standard competition ranking, descending: `[5, 5, 3, 1]` → `[1, 1, 3, 4]`.
///
/// Ranks are returned in input order.
pub fn competition_rank(values: &[f64]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| descending(values[i], values[j]));

    let mut ranks = vec![0u32; values.len()];
    let mut current = 0u32;
    for (pos, &idx) in order.iter().enumerate() {
        let tied_with_prev =
            pos > 0 && descending(values[order[pos - 1]], values[idx]) == Ordering::Equal;
        if !tied_with_prev {
            current = pos as u32 + 1;
        }
        ranks[idx] = current;
    }
    ranks
}

/// Rank sectors using their `Overall` rows only.
///
/// Output is sorted by rank, ties broken by vocabulary position and then name.
pub fn rank_sectors(
    aggregates: &[SectorTierAggregate],
    vocab: &SectorVocabulary,
) -> Vec<SectorRankRow> {
    let overall: Vec<&SectorTierAggregate> =
        aggregates.iter().filter(|a| a.tier.is_overall()).collect();
    let values: Vec<f64> = overall.iter().map(|a| a.weighted_change).collect();
    let ranks = competition_rank(&values);

    let mut rows: Vec<SectorRankRow> = overall
        .into_iter()
        .zip(ranks)
        .map(|(a, rank)| SectorRankRow {
            date: a.date,
            sector: a.sector.clone(),
            weighted_change: a.weighted_change,
            rank,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| vocab.sort_key(&a.sector).cmp(&vocab.sort_key(&b.sector)))
    });
    rows
}

/// Join each sector's rank onto all of its tier rows.
pub fn attach_ranks(
    aggregates: &[SectorTierAggregate],
    ranks: &[SectorRankRow],
) -> Vec<SectorSummaryRow> {
    let by_sector: HashMap<&str, u32> = ranks
        .iter()
        .map(|r| (r.sector.as_str(), r.rank))
        .collect();
    aggregates
        .iter()
        .map(|a| SectorSummaryRow {
            aggregate: a.clone(),
            rank: by_sector.get(a.sector.as_str()).copied(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapTier, ChangeSource, TierKey};
    use chrono::NaiveDate;

    fn agg(sector: &str, tier: TierKey, change: f64) -> SectorTierAggregate {
        SectorTierAggregate {
            date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            sector: sector.to_string(),
            tier,
            up_count: 0,
            down_count: 0,
            weighted_change: change,
            turnover: 0.0,
            change_source: ChangeSource::Derived,
        }
    }

    #[test]
    fn competition_ranking_ties() {
        assert_eq!(competition_rank(&[5.0, 5.0, 3.0, 1.0]), vec![1, 1, 3, 4]);
        assert_eq!(competition_rank(&[1.0, 3.0, 3.0, 5.0]), vec![4, 2, 2, 1]);
        assert_eq!(competition_rank(&[2.0, 2.0, 2.0]), vec![1, 1, 1]);
        assert!(competition_rank(&[]).is_empty());
    }

    #[test]
    fn nan_ranks_last() {
        assert_eq!(competition_rank(&[f64::NAN, 1.0, -1.0]), vec![3, 1, 2]);
    }

    #[test]
    fn ranks_only_overall_rows() {
        let vocab = SectorVocabulary::tse33();
        let rows = vec![
            agg("銀行業", TierKey::Tier(CapTier::Mega), 99.0),
            agg("銀行業", TierKey::Overall, 1.0),
            agg("水産・農林業", TierKey::Overall, 2.0),
            agg("鉱業", TierKey::Overall, 1.0),
        ];
        let ranked = rank_sectors(&rows, &vocab);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].sector, "水産・農林業");
        assert_eq!(ranked[0].rank, 1);
        // tie at rank 2 broken by vocabulary position: 鉱業 precedes 銀行業
        assert_eq!(ranked[1].sector, "鉱業");
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].sector, "銀行業");
        assert_eq!(ranked[2].rank, 2);
    }

    #[test]
    fn every_tier_row_carries_its_sector_rank() {
        let vocab = SectorVocabulary::tse33();
        let rows = vec![
            agg("A", TierKey::Tier(CapTier::Small), 0.0),
            agg("A", TierKey::Overall, 1.0),
            agg("B", TierKey::Overall, 2.0),
        ];
        let ranks = rank_sectors(&rows, &vocab);
        let summary = attach_ranks(&rows, &ranks);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].rank, Some(2));
        assert_eq!(summary[1].rank, Some(2));
        assert_eq!(summary[2].rank, Some(1));
    }
}
