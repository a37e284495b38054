use serde::{Deserialize, Serialize};

use crate::domain::dimension::Dimension;
use crate::domain::period::Quarter;

/// Recorded SQL intake for one (region, SQL type, quarter).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalSqlRecord {
    pub region: String,
    pub sql_type: String,
    pub year: i32,
    pub quarter: u8,
    pub volume: i64,
}

impl HistoricalSqlRecord {
    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.region.clone(), self.sql_type.clone())
    }

    pub fn period(&self) -> Option<Quarter> {
        Quarter::new(self.year, self.quarter)
    }
}
