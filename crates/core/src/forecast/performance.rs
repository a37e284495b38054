use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::actuals::ActualResult;
use crate::domain::dimension::Dimension;
use crate::domain::forecast::ForecastRow;
use crate::domain::period::Quarter;
use crate::money::{percent_change, Cents, Opportunities};

/// Forecast against actuals for one (region, SQL type, quarter) cell.
///
/// Variances are `actual - predicted`. A cell present on only one side reports
/// zero for the other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub region: String,
    pub sql_type: String,
    pub year: i32,
    pub quarter: u8,
    pub predicted_sqls: i64,
    pub actual_sqls: i64,
    pub predicted_opps: Opportunities,
    pub actual_opps: Opportunities,
    pub opps_variance: Opportunities,
    pub predicted_revenue: Cents,
    pub actual_revenue: Cents,
    pub revenue_variance: Cents,
    pub revenue_variance_percent: Decimal,
    pub has_forecast: bool,
    pub has_actual: bool,
}

#[derive(Default)]
struct Pair<'a> {
    forecast: Option<&'a ForecastRow>,
    actual: Option<&'a ActualResult>,
}

pub fn compare_performance(forecast: &[ForecastRow], actuals: &[ActualResult]) -> Vec<PerformanceRow> {
    let mut cells: BTreeMap<(Dimension, Quarter), Pair<'_>> = BTreeMap::new();
    for row in forecast {
        cells.entry((row.dimension(), row.period())).or_default().forecast = Some(row);
    }
    for actual in actuals {
        let dimension = Dimension::new(actual.region.clone(), actual.sql_type.clone());
        cells.entry((dimension, actual.period())).or_default().actual = Some(actual);
    }

    cells
        .into_iter()
        .map(|((dimension, period), pair)| {
            let predicted_sqls = pair.forecast.map_or(0, |row| row.predicted_sqls);
            let predicted_opps = pair.forecast.map_or(Opportunities::ZERO, |row| row.predicted_opps);
            let predicted_revenue = pair.forecast.map_or(Cents::ZERO, ForecastRow::total_revenue);
            let actual_sqls = pair.actual.map_or(0, |actual| actual.actual_sqls);
            let actual_opps = pair.actual.map_or(Opportunities::ZERO, |actual| actual.actual_opps);
            let actual_revenue = pair.actual.map_or(Cents::ZERO, ActualResult::total_revenue);
            let revenue_variance = actual_revenue - predicted_revenue;

            PerformanceRow {
                region: dimension.region,
                sql_type: dimension.sql_type,
                year: period.year,
                quarter: period.quarter,
                predicted_sqls,
                actual_sqls,
                predicted_opps,
                actual_opps,
                opps_variance: actual_opps - predicted_opps,
                predicted_revenue,
                actual_revenue,
                revenue_variance,
                revenue_variance_percent: percent_change(revenue_variance.0, predicted_revenue.0),
                has_forecast: pair.forecast.is_some(),
                has_actual: pair.actual.is_some(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::compare_performance;
    use crate::domain::actuals::ActualResult;
    use crate::domain::forecast::ForecastRow;
    use crate::money::{Cents, Opportunities};

    fn forecast(quarter: u8, opps: i64, revenue_new: i64) -> ForecastRow {
        ForecastRow {
            region: "NORAM".to_string(),
            sql_type: "INBOUND".to_string(),
            year: 2024,
            quarter,
            predicted_sqls: 100,
            predicted_opps: Opportunities(opps),
            predicted_revenue_new: Cents(revenue_new),
            predicted_revenue_upsell: Cents::ZERO,
        }
    }

    fn actual(quarter: u8, opps: i64, revenue_new: i64) -> ActualResult {
        ActualResult {
            region: "NORAM".to_string(),
            sql_type: "INBOUND".to_string(),
            year: 2024,
            quarter,
            actual_sqls: 90,
            actual_opps: Opportunities(opps),
            actual_revenue_new: Cents(revenue_new),
            actual_revenue_upsell: Cents::ZERO,
        }
    }

    #[test]
    fn matched_cells_report_variance() {
        let rows = compare_performance(&[forecast(1, 516, 645_000)], &[actual(1, 500, 600_000)]);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.opps_variance, Opportunities(-16));
        assert_eq!(row.revenue_variance, Cents(-45_000));
        assert_eq!(row.revenue_variance_percent, Decimal::from_str("-6.98").expect("decimal"));
        assert!(row.has_forecast && row.has_actual);
    }

    #[test]
    fn unmatched_cells_are_kept_in_order() {
        let rows = compare_performance(
            &[forecast(2, 58, 72_500)],
            &[actual(1, 500, 600_000), actual(3, 10, 5_000)],
        );

        let quarters: Vec<(u8, bool, bool)> =
            rows.iter().map(|row| (row.quarter, row.has_forecast, row.has_actual)).collect();
        assert_eq!(quarters, vec![(1, false, true), (2, true, false), (3, false, true)]);
        assert_eq!(rows[0].revenue_variance_percent, Decimal::ZERO);
        assert_eq!(rows[1].revenue_variance, Cents(-72_500));
    }
}
