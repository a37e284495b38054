use std::collections::{BTreeMap, BTreeSet};

use crate::domain::dimension::Dimension;
use crate::domain::forecast::ForecastRow;
use crate::domain::period::Quarter;
use crate::forecast::aggregator::{aggregate, HistoricalSeries};
use crate::forecast::distribution::TimeDistributionCurve;
use crate::forecast::model::ConversionModel;
use crate::forecast::{ForecastError, ForecastSnapshot};
use crate::money::{Cents, Opportunities};

pub trait ForecastEngine: Send + Sync {
    fn forecast(
        &self,
        series: &HistoricalSeries,
        model: &ConversionModel,
        curve: &TimeDistributionCurve,
    ) -> Result<Vec<ForecastRow>, ForecastError>;
}

/// Validated, grouped inputs ready to hand to a [`ForecastEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedForecast {
    pub series: HistoricalSeries,
    pub model: ConversionModel,
    pub curve: TimeDistributionCurve,
}

impl PreparedForecast {
    pub fn from_snapshot(snapshot: &ForecastSnapshot) -> Result<Self, ForecastError> {
        Ok(Self {
            series: aggregate(&snapshot.historical)?,
            model: ConversionModel::new(&snapshot.conversion_rates, &snapshot.deal_economics)?,
            curve: TimeDistributionCurve::new(&snapshot.time_distribution)?,
        })
    }

    pub fn run<E: ForecastEngine + ?Sized>(
        &self,
        engine: &E,
    ) -> Result<Vec<ForecastRow>, ForecastError> {
        engine.forecast(&self.series, &self.model, &self.curve)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CascadeForecastEngine;

impl CascadeForecastEngine {
    pub fn forecast_snapshot(
        &self,
        snapshot: &ForecastSnapshot,
    ) -> Result<Vec<ForecastRow>, ForecastError> {
        PreparedForecast::from_snapshot(snapshot)?.run(self)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct QuarterCell {
    sqls: i64,
    opps: Opportunities,
}

impl ForecastEngine for CascadeForecastEngine {
    fn forecast(
        &self,
        series: &HistoricalSeries,
        model: &ConversionModel,
        curve: &TimeDistributionCurve,
    ) -> Result<Vec<ForecastRow>, ForecastError> {
        let mut rows = Vec::new();

        for region in regions_missing_economics(series, model) {
            tracing::warn!(
                event_name = "forecast.engine.missing_deal_economics",
                region = %region,
                "no deal economics configured; revenue forecast as zero"
            );
        }

        for (dimension, volumes) in series {
            let Some(rate) = model.rate(dimension) else {
                tracing::warn!(
                    event_name = "forecast.engine.missing_conversion_rate",
                    region = %dimension.region,
                    sql_type = %dimension.sql_type,
                    quarters = volumes.len(),
                    "no conversion rate configured; dimension skipped"
                );
                continue;
            };

            let mut cells: BTreeMap<Quarter, QuarterCell> = BTreeMap::new();
            for intake in volumes {
                cells.entry(intake.period).or_default().sqls += intake.volume;

                let cohort = Opportunities::from_sql_volume(intake.volume, rate.opp_coverage_ratio)?;
                for (offset, part) in (0u32..).zip(curve.split(cohort)?) {
                    let cell = cells.entry(intake.period.shift(offset)).or_default();
                    cell.opps = cell.opps.checked_add(part)?;
                }
            }

            let economics = model.economics(&dimension.region);
            for (period, cell) in cells {
                let (revenue_new, revenue_upsell) = match economics {
                    Some(deal) => (
                        cell.opps.expected_revenue(rate.win_rate_new, deal.acv_new)?,
                        cell.opps.expected_revenue(rate.win_rate_upsell, deal.acv_upsell)?,
                    ),
                    None => (Cents::ZERO, Cents::ZERO),
                };
                // Row totals must stay representable.
                revenue_new.checked_add(revenue_upsell)?;
                rows.push(row(dimension, period, cell, revenue_new, revenue_upsell));
            }
        }

        tracing::debug!(
            event_name = "forecast.engine.completed",
            dimensions = series.len(),
            rows = rows.len(),
            "cascade forecast computed"
        );

        Ok(rows)
    }
}

/// Regions with at least one rated dimension but no deal economics.
fn regions_missing_economics<'a>(
    series: &'a HistoricalSeries,
    model: &ConversionModel,
) -> BTreeSet<&'a str> {
    series
        .keys()
        .filter(|dimension| model.rate(dimension).is_some())
        .map(|dimension| dimension.region.as_str())
        .filter(|region| model.economics(region).is_none())
        .collect()
}

fn row(
    dimension: &Dimension,
    period: Quarter,
    cell: QuarterCell,
    predicted_revenue_new: Cents,
    predicted_revenue_upsell: Cents,
) -> ForecastRow {
    ForecastRow {
        region: dimension.region.clone(),
        sql_type: dimension.sql_type.clone(),
        year: period.year,
        quarter: period.quarter,
        predicted_sqls: cell.sqls,
        predicted_opps: cell.opps,
        predicted_revenue_new,
        predicted_revenue_upsell,
    }
}
