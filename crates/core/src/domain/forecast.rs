use serde::{Deserialize, Serialize};

use crate::domain::dimension::Dimension;
use crate::domain::period::Quarter;
use crate::money::{Cents, Opportunities};

/// One predicted (region, SQL type, quarter) cell of a company's forecast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub region: String,
    pub sql_type: String,
    pub year: i32,
    pub quarter: u8,
    pub predicted_sqls: i64,
    pub predicted_opps: Opportunities,
    pub predicted_revenue_new: Cents,
    pub predicted_revenue_upsell: Cents,
}

impl ForecastRow {
    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.region.clone(), self.sql_type.clone())
    }

    pub fn period(&self) -> Quarter {
        Quarter { year: self.year, quarter: self.quarter }
    }

    pub fn total_revenue(&self) -> Cents {
        self.predicted_revenue_new + self.predicted_revenue_upsell
    }
}
