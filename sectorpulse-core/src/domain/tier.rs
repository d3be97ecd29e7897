//! Capitalization tiers.
//!
//! Capitalization is expressed in millions of yen. Lower bounds are
//! inclusive, so a boundary value belongs to the upper tier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapTier {
    Small,
    Mid,
    Large,
    Mega,
}

impl CapTier {
    pub const MID_FLOOR: f64 = 10_000.0;
    pub const LARGE_FLOOR: f64 = 100_000.0;
    pub const MEGA_FLOOR: f64 = 1_000_000.0;

    pub const ALL: [CapTier; 4] = [CapTier::Small, CapTier::Mid, CapTier::Large, CapTier::Mega];

    /// Bucket a capitalization value. Total: negative, zero and NaN are `Small`.
    pub fn classify(cap: f64) -> Self {
        if cap.is_nan() || cap < Self::MID_FLOOR {
            CapTier::Small
        } else if cap < Self::LARGE_FLOOR {
            CapTier::Mid
        } else if cap < Self::MEGA_FLOOR {
            CapTier::Large
        } else {
            CapTier::Mega
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CapTier::Small => "small",
            CapTier::Mid => "mid",
            CapTier::Large => "large",
            CapTier::Mega => "mega",
        }
    }
}

impl fmt::Display for CapTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A summary row's tier: one capitalization bucket, or the synthesized
/// aggregate across all of them. Sorts after every concrete tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKey {
    Tier(CapTier),
    Overall,
}

impl TierKey {
    pub fn label(self) -> &'static str {
        match self {
            TierKey::Tier(t) => t.label(),
            TierKey::Overall => "overall",
        }
    }

    pub fn is_overall(self) -> bool {
        matches!(self, TierKey::Overall)
    }
}

impl fmt::Display for TierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TierKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "small" => Ok(TierKey::Tier(CapTier::Small)),
            "mid" => Ok(TierKey::Tier(CapTier::Mid)),
            "large" => Ok(TierKey::Tier(CapTier::Large)),
            "mega" => Ok(TierKey::Tier(CapTier::Mega)),
            "overall" => Ok(TierKey::Overall),
            other => Err(format!("unknown tier label '{other}'")),
        }
    }
}
