//! The SQL → Opportunity → Revenue cascade.
//!
//! Inputs arrive as a [`ForecastSnapshot`] fetched once per run. The snapshot
//! is grouped by [`aggregator`], the conversion and timing assumptions are
//! wrapped in [`model::ConversionModel`] and [`distribution::TimeDistributionCurve`],
//! and [`engine::CascadeForecastEngine`] turns them into forecast rows.
//! [`what_if::WhatIfEngine`] runs the engine twice and diffs the outputs.

pub mod aggregator;
pub mod distribution;
pub mod engine;
pub mod model;
pub mod performance;
pub mod summary;
pub mod what_if;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::conversion::{ConversionRate, DealEconomics, TimeDistribution};
use crate::domain::historical::HistoricalSqlRecord;
use crate::money::MoneyError;

pub use aggregator::{aggregate, HistoricalSeries, QuarterVolume};
pub use distribution::TimeDistributionCurve;
pub use engine::{CascadeForecastEngine, ForecastEngine, PreparedForecast};
pub use model::ConversionModel;
pub use performance::{compare_performance, PerformanceRow};
pub use summary::{summarize, ForecastQuery, ForecastSummary, QuarterTotals};
pub use what_if::{compute_impact, WhatIfEngine, WhatIfResult};

/// Read-only copy of every input a forecast run needs for one company.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub historical: Vec<HistoricalSqlRecord>,
    pub conversion_rates: Vec<ConversionRate>,
    pub deal_economics: Vec<DealEconomics>,
    pub time_distribution: TimeDistribution,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ForecastError {
    #[error("negative SQL volume {volume} for {region}/{sql_type} in {year} Q{quarter}")]
    NegativeVolume { region: String, sql_type: String, year: i32, quarter: u8, volume: i64 },
    #[error("quarter {quarter} of {year} for {region}/{sql_type} is outside 1..=4")]
    InvalidQuarter { region: String, sql_type: String, year: i32, quarter: u8 },
    #[error("year {year} for {region}/{sql_type} is outside the supported range 1..=9999")]
    YearOutOfRange { region: String, sql_type: String, year: i32 },
    #[error("duplicate historical record for {region}/{sql_type} in {year} Q{quarter}")]
    DuplicateHistoricalRecord { region: String, sql_type: String, year: i32, quarter: u8 },
    #[error("{field} for {dimension} is negative ({value} bp)")]
    NegativeRate { dimension: String, field: &'static str, value: i64 },
    #[error("{field} for region {region} is negative ({value} cents)")]
    NegativeAcv { region: String, field: &'static str, value: i64 },
    #[error("{bucket} distribution weight is negative ({value} bp)")]
    NegativeDistributionWeight { bucket: &'static str, value: i64 },
    #[error("conversion rate multiplier must be finite and non-negative, got {value}")]
    InvalidMultiplier { value: String },
    #[error("conversion rate multiplier {value} exceeds the allowed maximum {max_allowed}")]
    MultiplierOutOfBounds { value: String, max_allowed: String },
    #[error(transparent)]
    Arithmetic(#[from] MoneyError),
}

impl ForecastError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NegativeVolume { .. } => "negative_volume",
            Self::InvalidQuarter { .. } => "invalid_quarter",
            Self::YearOutOfRange { .. } => "year_out_of_range",
            Self::DuplicateHistoricalRecord { .. } => "duplicate_historical_record",
            Self::NegativeRate { .. } => "negative_rate",
            Self::NegativeAcv { .. } => "negative_acv",
            Self::NegativeDistributionWeight { .. } => "negative_distribution_weight",
            Self::InvalidMultiplier { .. } => "invalid_multiplier",
            Self::MultiplierOutOfBounds { .. } => "multiplier_out_of_bounds",
            Self::Arithmetic(_) => "arithmetic_overflow",
        }
    }

    pub fn user_safe_message(&self) -> String {
        match self {
            Self::NegativeVolume { region, sql_type, year, quarter, .. } => {
                format!("SQL volume for {region}/{sql_type} in {year} Q{quarter} cannot be negative.")
            }
            Self::InvalidQuarter { region, sql_type, year, quarter } => format!(
                "Historical data for {region}/{sql_type} has an invalid quarter ({year} Q{quarter})."
            ),
            Self::YearOutOfRange { region, sql_type, year } => {
                format!("Historical data for {region}/{sql_type} has an unsupported year ({year}).")
            }
            Self::DuplicateHistoricalRecord { region, sql_type, year, quarter } => format!(
                "Historical data for {region}/{sql_type} in {year} Q{quarter} was entered twice."
            ),
            Self::NegativeRate { dimension, field, .. } => {
                format!("The {field} configured for {dimension} cannot be negative.")
            }
            Self::NegativeAcv { region, field, .. } => {
                format!("The adjusted {field} for {region} would drop below zero.")
            }
            Self::NegativeDistributionWeight { bucket, .. } => {
                format!("The adjusted {bucket} distribution would drop below zero.")
            }
            Self::InvalidMultiplier { .. } => {
                "The conversion rate multiplier must be a finite, non-negative number.".to_string()
            }
            Self::MultiplierOutOfBounds { max_allowed, .. } => {
                format!("The conversion rate multiplier can be at most {max_allowed}.")
            }
            Self::Arithmetic(_) => {
                "The forecast inputs are too large to compute safely.".to_string()
            }
        }
    }
}
