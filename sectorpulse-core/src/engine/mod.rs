//! Aggregation, ranking and momentum over sanitized records.

pub mod aggregate;
pub mod momentum;
pub mod ranking;

pub use aggregate::{aggregate_day, derive_overall_change, weighted_mean};
pub use momentum::{rolling_mean, DailyTurnover, MomentumEngine, DEFAULT_LOOKBACK};
pub use ranking::{attach_ranks, competition_rank, rank_sectors};
