use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::conversion::{ConversionRate, DealEconomics};
use crate::domain::dimension::Dimension;
use crate::forecast::ForecastError;
use crate::money::{BasisPoints, Cents};

/// Conversion assumptions keyed for lookup. Built from a snapshot and never mutated;
/// adjustments produce a new model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversionModel {
    rates: BTreeMap<Dimension, ConversionRate>,
    economics: BTreeMap<String, DealEconomics>,
}

impl ConversionModel {
    pub fn new(
        rates: &[ConversionRate],
        economics: &[DealEconomics],
    ) -> Result<Self, ForecastError> {
        let mut model = Self::default();

        for rate in rates {
            let dimension = Dimension::new(rate.region.clone(), rate.sql_type.clone());
            validate_rate(&dimension, rate)?;
            if rate.opp_coverage_ratio > BasisPoints::WHOLE {
                tracing::warn!(
                    event_name = "forecast.model.coverage_above_whole",
                    region = %rate.region,
                    sql_type = %rate.sql_type,
                    coverage_bp = rate.opp_coverage_ratio.0,
                    "coverage ratio above 100% accepted as configured"
                );
            }
            model.rates.insert(dimension, rate.clone());
        }

        for deal in economics {
            validate_economics(deal)?;
            model.economics.insert(deal.region.clone(), deal.clone());
        }

        Ok(model)
    }

    pub fn rate(&self, dimension: &Dimension) -> Option<&ConversionRate> {
        self.rates.get(dimension)
    }

    pub fn economics(&self, region: &str) -> Option<&DealEconomics> {
        self.economics.get(region)
    }

    /// Copy of the model with coverage ratios scaled and ACVs shifted.
    /// Win rates are left untouched.
    pub fn adjusted(
        &self,
        coverage_multiplier: Decimal,
        acv_new_delta: Cents,
        acv_upsell_delta: Cents,
    ) -> Result<Self, ForecastError> {
        let mut rates = BTreeMap::new();
        for (dimension, rate) in &self.rates {
            let mut adjusted = rate.clone();
            adjusted.opp_coverage_ratio = rate.opp_coverage_ratio.scale(coverage_multiplier)?;
            rates.insert(dimension.clone(), adjusted);
        }

        let mut economics = BTreeMap::new();
        for (region, deal) in &self.economics {
            let adjusted = DealEconomics {
                region: deal.region.clone(),
                acv_new: deal.acv_new.checked_add(acv_new_delta)?,
                acv_upsell: deal.acv_upsell.checked_add(acv_upsell_delta)?,
            };
            validate_economics(&adjusted)?;
            economics.insert(region.clone(), adjusted);
        }

        Ok(Self { rates, economics })
    }
}

fn validate_rate(dimension: &Dimension, rate: &ConversionRate) -> Result<(), ForecastError> {
    let fields = [
        ("opportunity coverage ratio", rate.opp_coverage_ratio),
        ("new business win rate", rate.win_rate_new),
        ("upsell win rate", rate.win_rate_upsell),
    ];
    for (field, value) in fields {
        if value.is_negative() {
            return Err(ForecastError::NegativeRate {
                dimension: dimension.to_string(),
                field,
                value: value.0,
            });
        }
    }
    Ok(())
}

fn validate_economics(deal: &DealEconomics) -> Result<(), ForecastError> {
    for (field, value) in [("new business ACV", deal.acv_new), ("upsell ACV", deal.acv_upsell)] {
        if value < Cents::ZERO {
            return Err(ForecastError::NegativeAcv {
                region: deal.region.clone(),
                field,
                value: value.0,
            });
        }
    }
    Ok(())
}
