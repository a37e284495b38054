use serde::{Deserialize, Serialize};

use crate::domain::period::Quarter;
use crate::money::{Cents, Opportunities};

/// Observed outcome for a quarter, recorded after the fact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualResult {
    pub region: String,
    pub sql_type: String,
    pub year: i32,
    pub quarter: u8,
    pub actual_sqls: i64,
    pub actual_opps: Opportunities,
    pub actual_revenue_new: Cents,
    pub actual_revenue_upsell: Cents,
}

impl ActualResult {
    pub fn period(&self) -> Quarter {
        Quarter { year: self.year, quarter: self.quarter }
    }

    pub fn total_revenue(&self) -> Cents {
        self.actual_revenue_new + self.actual_revenue_upsell
    }
}
