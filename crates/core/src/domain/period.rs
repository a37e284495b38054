use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A calendar quarter. Field order makes the derived ordering chronological.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u8,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid quarter `{0}` (expected YYYY-QN with N in 1..=4)")]
pub struct QuarterParseError(pub String);

impl Quarter {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9_999;

    pub fn new(year: i32, quarter: u8) -> Option<Self> {
        (1..=4).contains(&quarter).then_some(Self { year, quarter })
    }

    /// Years outside `MIN_YEAR..=MAX_YEAR` are rejected before shifting.
    pub fn shift(self, quarters: u32) -> Self {
        let zero_based = i64::from(self.quarter) - 1 + i64::from(quarters);
        Self {
            year: self.year + zero_based.div_euclid(4) as i32,
            quarter: zero_based.rem_euclid(4) as u8 + 1,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

impl FromStr for Quarter {
    type Err = QuarterParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        let (year, quarter) = normalized
            .split_once("-Q")
            .or_else(|| normalized.split_once('Q'))
            .ok_or_else(|| QuarterParseError(value.to_string()))?;

        let year = year.trim_end_matches('-').parse::<i32>();
        let quarter = quarter.parse::<u8>();
        match (year, quarter) {
            (Ok(year), Ok(quarter)) => {
                Self::new(year, quarter).ok_or_else(|| QuarterParseError(value.to_string()))
            }
            _ => Err(QuarterParseError(value.to_string())),
        }
    }
}
