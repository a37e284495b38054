use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::forecast::ForecastRow;
use crate::domain::period::Quarter;
use crate::money::{Cents, Opportunities};

/// Row filter for dashboard views. Empty sets match everything; bounds are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastQuery {
    pub regions: BTreeSet<String>,
    pub sql_types: BTreeSet<String>,
    pub from: Option<Quarter>,
    pub to: Option<Quarter>,
}

impl ForecastQuery {
    pub fn matches(&self, row: &ForecastRow) -> bool {
        let period = row.period();
        (self.regions.is_empty() || self.regions.contains(&row.region))
            && (self.sql_types.is_empty() || self.sql_types.contains(&row.sql_type))
            && self.from.map_or(true, |from| period >= from)
            && self.to.map_or(true, |to| period <= to)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterTotals {
    pub year: i32,
    pub quarter: u8,
    pub sqls: i64,
    pub opportunities: Opportunities,
    pub revenue_new: Cents,
    pub revenue_upsell: Cents,
}

impl QuarterTotals {
    pub fn total_revenue(&self) -> Cents {
        self.revenue_new + self.revenue_upsell
    }

    fn absorb(&mut self, row: &ForecastRow) {
        self.sqls += row.predicted_sqls;
        self.opportunities += row.predicted_opps;
        self.revenue_new += row.predicted_revenue_new;
        self.revenue_upsell += row.predicted_revenue_upsell;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub quarters: Vec<QuarterTotals>,
    pub totals: QuarterTotals,
    pub rows_matched: usize,
}

/// Rolls matching rows up per quarter. `totals` carries year and quarter zero.
pub fn summarize(rows: &[ForecastRow], query: &ForecastQuery) -> ForecastSummary {
    let mut quarters: BTreeMap<Quarter, QuarterTotals> = BTreeMap::new();
    let mut totals = QuarterTotals::default();
    let mut rows_matched = 0;

    for row in rows.iter().filter(|row| query.matches(row)) {
        let period = row.period();
        quarters
            .entry(period)
            .or_insert_with(|| QuarterTotals {
                year: period.year,
                quarter: period.quarter,
                ..QuarterTotals::default()
            })
            .absorb(row);
        totals.absorb(row);
        rows_matched += 1;
    }

    ForecastSummary { quarters: quarters.into_values().collect(), totals, rows_matched }
}
