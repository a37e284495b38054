use serde::{Deserialize, Serialize};

use crate::money::{BasisPoints, Cents};

pub const DEFAULT_SAME_QUARTER_BP: i64 = 8_900;
pub const DEFAULT_NEXT_QUARTER_BP: i64 = 1_000;
pub const DEFAULT_TWO_QUARTER_BP: i64 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRate {
    pub region: String,
    pub sql_type: String,
    pub opp_coverage_ratio: BasisPoints,
    pub win_rate_new: BasisPoints,
    pub win_rate_upsell: BasisPoints,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealEconomics {
    pub region: String,
    pub acv_new: Cents,
    pub acv_upsell: Cents,
}

/// Share of a cohort's opportunities landing in its own quarter and the two after.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDistribution {
    pub same_quarter: BasisPoints,
    pub next_quarter: BasisPoints,
    pub two_quarter: BasisPoints,
}

impl Default for TimeDistribution {
    fn default() -> Self {
        Self {
            same_quarter: BasisPoints(DEFAULT_SAME_QUARTER_BP),
            next_quarter: BasisPoints(DEFAULT_NEXT_QUARTER_BP),
            two_quarter: BasisPoints(DEFAULT_TWO_QUARTER_BP),
        }
    }
}

impl TimeDistribution {
    pub fn new(same_quarter: i64, next_quarter: i64, two_quarter: i64) -> Self {
        Self {
            same_quarter: BasisPoints(same_quarter),
            next_quarter: BasisPoints(next_quarter),
            two_quarter: BasisPoints(two_quarter),
        }
    }

    /// Weights indexed by quarter offset.
    pub fn weights(&self) -> [BasisPoints; 3] {
        [self.same_quarter, self.next_quarter, self.two_quarter]
    }

    pub fn total(&self) -> BasisPoints {
        self.weights().into_iter().sum()
    }

    pub fn is_normalized(&self) -> bool {
        self.total() == BasisPoints::WHOLE
    }
}
