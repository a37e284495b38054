use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::conversion::TimeDistribution;
use crate::domain::forecast::ForecastRow;
use crate::domain::scenario::{ImpactSummary, WhatIfAdjustment};
use crate::forecast::distribution::TimeDistributionCurve;
use crate::forecast::engine::{ForecastEngine, PreparedForecast};
use crate::forecast::{ForecastError, ForecastSnapshot};
use crate::money::{percent_change, Cents, Opportunities};

pub const DEFAULT_MAX_CONVERSION_MULTIPLIER: f64 = 10.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub baseline: Vec<ForecastRow>,
    pub adjusted: Vec<ForecastRow>,
    pub impact: ImpactSummary,
    /// Distribution the adjusted run used; its total may differ from 100%.
    pub adjusted_distribution: TimeDistribution,
}

/// Re-runs a forecast engine under hypothetical parameters and diffs the result
/// against the unmodified run.
pub struct WhatIfEngine<E> {
    engine: E,
    max_conversion_multiplier: f64,
}

impl<E> WhatIfEngine<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, max_conversion_multiplier: DEFAULT_MAX_CONVERSION_MULTIPLIER }
    }

    pub fn with_max_conversion_multiplier(mut self, max_conversion_multiplier: f64) -> Self {
        self.max_conversion_multiplier = max_conversion_multiplier;
        self
    }

    /// Checks a requested multiplier against the guardrail and converts it to a decimal.
    pub fn validate_multiplier(&self, value: f64) -> Result<Decimal, ForecastError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ForecastError::InvalidMultiplier { value: value.to_string() });
        }
        if value > self.max_conversion_multiplier {
            return Err(ForecastError::MultiplierOutOfBounds {
                value: value.to_string(),
                max_allowed: self.max_conversion_multiplier.to_string(),
            });
        }
        Decimal::from_f64(value)
            .ok_or_else(|| ForecastError::InvalidMultiplier { value: value.to_string() })
    }
}

impl<E: ForecastEngine> WhatIfEngine<E> {
    pub fn evaluate(
        &self,
        snapshot: &ForecastSnapshot,
        adjustment: &WhatIfAdjustment,
    ) -> Result<WhatIfResult, ForecastError> {
        let multiplier = self.validate_multiplier(adjustment.conversion_rate_multiplier)?;

        let prepared = PreparedForecast::from_snapshot(snapshot)?;
        let baseline = prepared.run(&self.engine)?;

        let adjusted_distribution = adjust_distribution(&snapshot.time_distribution, adjustment)?;
        let adjusted_model = prepared.model.adjusted(
            multiplier,
            adjustment.acv_new_adjustment,
            adjustment.acv_upsell_adjustment,
        )?;
        let adjusted_curve = TimeDistributionCurve::new(&adjusted_distribution)?;
        let adjusted = self.engine.forecast(&prepared.series, &adjusted_model, &adjusted_curve)?;

        let impact = compute_impact(&baseline, &adjusted);
        tracing::debug!(
            event_name = "forecast.what_if.evaluated",
            baseline_rows = baseline.len(),
            adjusted_rows = adjusted.len(),
            revenue_change_cents = impact.total_revenue_change.0,
            opportunities_change = impact.total_opportunities_change.0,
            "what-if evaluation completed"
        );

        Ok(WhatIfResult { baseline, adjusted, impact, adjusted_distribution })
    }
}

/// Shifts each bucket by its delta. The result is not renormalized.
pub fn adjust_distribution(
    distribution: &TimeDistribution,
    adjustment: &WhatIfAdjustment,
) -> Result<TimeDistribution, ForecastError> {
    Ok(TimeDistribution {
        same_quarter: distribution.same_quarter.checked_add(adjustment.same_quarter_adjustment)?,
        next_quarter: distribution.next_quarter.checked_add(adjustment.next_quarter_adjustment)?,
        two_quarter: distribution.two_quarter.checked_add(adjustment.two_quarter_adjustment)?,
    })
}

pub fn compute_impact(baseline: &[ForecastRow], adjusted: &[ForecastRow]) -> ImpactSummary {
    let baseline_revenue: Cents = baseline.iter().map(ForecastRow::total_revenue).sum();
    let adjusted_revenue: Cents = adjusted.iter().map(ForecastRow::total_revenue).sum();
    let baseline_opps: Opportunities = baseline.iter().map(|row| row.predicted_opps).sum();
    let adjusted_opps: Opportunities = adjusted.iter().map(|row| row.predicted_opps).sum();

    let revenue_change = adjusted_revenue - baseline_revenue;
    let opps_change = adjusted_opps - baseline_opps;

    ImpactSummary {
        total_revenue_change: revenue_change,
        total_revenue_change_percent: percent_change(revenue_change.0, baseline_revenue.0),
        total_opportunities_change: opps_change,
        total_opportunities_change_percent: percent_change(opps_change.0, baseline_opps.0),
    }
}
