//! Tier ladder derived from the current points balance

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound (inclusive) of each tier, ascending
const TIER_THRESHOLDS: [(Tier, i64); 3] = [
    (Tier::Bronze, 0),
    (Tier::Silver, 1000),
    (Tier::Gold, 5000),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    /// Tier for a balance. Negative balances cannot be stored, but map to Bronze.
    pub fn for_points(points: i64) -> Tier {
        TIER_THRESHOLDS
            .iter()
            .rev()
            .find(|(_, min)| points >= *min)
            .map(|(tier, _)| *tier)
            .unwrap_or(Tier::Bronze)
    }

    pub fn min_points(self) -> i64 {
        TIER_THRESHOLDS
            .iter()
            .find(|(tier, _)| *tier == self)
            .map(|(_, min)| *min)
            .unwrap_or(0)
    }

    pub fn next_tier(self) -> Option<Tier> {
        match self {
            Tier::Bronze => Some(Tier::Silver),
            Tier::Silver => Some(Tier::Gold),
            Tier::Gold => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Points still needed to reach the next tier; `None` at the top tier
pub fn points_to_next_tier(points: i64) -> Option<i64> {
    Tier::for_points(points)
        .next_tier()
        .map(|next| (next.min_points() - points).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::for_points(0), Tier::Bronze);
        assert_eq!(Tier::for_points(999), Tier::Bronze);
        assert_eq!(Tier::for_points(1000), Tier::Silver);
        assert_eq!(Tier::for_points(4999), Tier::Silver);
        assert_eq!(Tier::for_points(5000), Tier::Gold);
        assert_eq!(Tier::for_points(1_000_000), Tier::Gold);
        assert_eq!(Tier::for_points(-10), Tier::Bronze);
    }

    #[test]
    fn test_points_to_next_tier() {
        assert_eq!(points_to_next_tier(0), Some(1000));
        assert_eq!(points_to_next_tier(999), Some(1));
        assert_eq!(points_to_next_tier(1000), Some(4000));
        assert_eq!(points_to_next_tier(4999), Some(1));
        assert_eq!(points_to_next_tier(5000), None);
    }

    #[test]
    fn test_thresholds_are_ascending() {
        for pair in TIER_THRESHOLDS.windows(2) {
            assert!(pair[0].1 < pair[1].1);
            assert_eq!(pair[0].0.next_tier(), Some(pair[1].0));
        }
    }

    #[test]
    fn test_serialized_label() {
        assert_eq!(serde_json::to_string(&Tier::Silver).unwrap(), "\"Silver\"");
        assert_eq!(Tier::Gold.to_string(), "Gold");
    }
}
