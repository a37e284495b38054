//! Fixed-point value types for stored money, percentages and opportunity counts.
//!
//! Everything at rest is an integer: cents, basis points, and hundredths of an
//! opportunity. Arithmetic between them goes through [`Decimal`] and is rounded
//! back to an integer exactly once, half away from zero.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BASIS_POINTS_PER_UNIT: i64 = 10_000;
pub const CENTS_PER_DOLLAR: i64 = 100;
pub const OPPORTUNITY_SCALE: i64 = 100;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("{field} value {value} does not fit in fixed-point storage")]
    OutOfRange { field: &'static str, value: String },
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(pub i64);

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BasisPoints(pub i64);

/// Opportunity count in hundredths (580 == 5.8 opportunities).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Opportunities(pub i64);

impl Cents {
    pub const ZERO: Self = Self(0);

    pub fn from_dollars(dollars: Decimal) -> Result<Self, MoneyError> {
        to_fixed("cents", dollars * Decimal::from(CENTS_PER_DOLLAR)).map(Self)
    }

    pub fn to_dollars(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl BasisPoints {
    pub const ZERO: Self = Self(0);
    pub const WHOLE: Self = Self(BASIS_POINTS_PER_UNIT);

    pub fn from_percent(percent: Decimal) -> Result<Self, MoneyError> {
        to_fixed("basis_points", percent * Decimal::from(BASIS_POINTS_PER_UNIT / 100)).map(Self)
    }

    pub fn to_percent(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn to_ratio(self) -> Decimal {
        Decimal::new(self.0, 4)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Scales the basis points by a multiplier, rounding to a whole basis point.
    pub fn scale(self, multiplier: Decimal) -> Result<Self, MoneyError> {
        to_fixed("basis_points", Decimal::from(self.0) * multiplier).map(Self)
    }
}

impl Opportunities {
    pub const ZERO: Self = Self(0);

    pub fn to_count(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Opportunities produced by `volume` SQLs at the given coverage ratio.
    pub fn from_sql_volume(volume: i64, coverage: BasisPoints) -> Result<Self, MoneyError> {
        let scaled = Decimal::from(volume) * Decimal::from(coverage.0)
            / Decimal::from(BASIS_POINTS_PER_UNIT / OPPORTUNITY_SCALE);
        to_fixed("opportunities", scaled).map(Self)
    }

    /// Portion of this cohort selected by `weight`, rounded on its own.
    pub fn portion(self, weight: BasisPoints) -> Result<Self, MoneyError> {
        let scaled =
            Decimal::from(self.0) * Decimal::from(weight.0) / Decimal::from(BASIS_POINTS_PER_UNIT);
        to_fixed("opportunities", scaled).map(Self)
    }

    /// Expected revenue when these opportunities close at `win_rate` for `acv` each.
    pub fn expected_revenue(self, win_rate: BasisPoints, acv: Cents) -> Result<Cents, MoneyError> {
        let scaled = Decimal::from(self.0) * Decimal::from(win_rate.0) * Decimal::from(acv.0)
            / Decimal::from(OPPORTUNITY_SCALE * BASIS_POINTS_PER_UNIT);
        to_fixed("cents", scaled).map(Cents)
    }
}

pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// `change / baseline * 100`, two decimal places, zero when the baseline is zero.
pub fn percent_change(change: i64, baseline: i64) -> Decimal {
    if baseline == 0 {
        return Decimal::new(0, 2);
    }
    let mut percent = (Decimal::from(change) * Decimal::ONE_HUNDRED / Decimal::from(baseline))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    percent.rescale(2);
    percent
}

fn to_fixed(field: &'static str, value: Decimal) -> Result<i64, MoneyError> {
    round_half_up(value)
        .to_i64()
        .ok_or_else(|| MoneyError::OutOfRange { field, value: value.to_string() })
}

macro_rules! fixed_point_arithmetic {
    ($($ty:ident => $field:literal),+) => {
        $(
            impl $ty {
                /// Sum that reports overflow instead of wrapping.
                pub fn checked_add(self, rhs: Self) -> Result<Self, MoneyError> {
                    self.0.checked_add(rhs.0).map(Self).ok_or_else(|| MoneyError::OutOfRange {
                        field: $field,
                        value: format!("{} + {}", self.0, rhs.0),
                    })
                }
            }

            impl Add for $ty {
                type Output = Self;

                fn add(self, rhs: Self) -> Self {
                    Self(self.0 + rhs.0)
                }
            }

            impl AddAssign for $ty {
                fn add_assign(&mut self, rhs: Self) {
                    self.0 += rhs.0;
                }
            }

            impl Sub for $ty {
                type Output = Self;

                fn sub(self, rhs: Self) -> Self {
                    Self(self.0 - rhs.0)
                }
            }

            impl Neg for $ty {
                type Output = Self;

                fn neg(self) -> Self {
                    Self(-self.0)
                }
            }

            impl Sum for $ty {
                fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                    iter.fold(Self::ZERO, |acc, value| acc + value)
                }
            }
        )+
    };
}

fixed_point_arithmetic!(
    Cents => "cents",
    BasisPoints => "basis_points",
    Opportunities => "opportunities"
);

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.to_dollars())
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.to_percent())
    }
}

impl fmt::Display for Opportunities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_count())
    }
}
