use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::dimension::CompanyId;
use crate::money::{BasisPoints, Cents, Opportunities};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioId(pub String);

impl ScenarioId {
    pub fn generate() -> Self {
        Self(format!("scn-{}", uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hypothetical overrides applied on top of the stored forecast parameters.
///
/// The multiplier scales coverage ratios; every other field is an additive
/// delta. Distribution deltas are applied as-is and may leave the buckets
/// summing to something other than 100%.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhatIfAdjustment {
    pub conversion_rate_multiplier: f64,
    pub acv_new_adjustment: Cents,
    pub acv_upsell_adjustment: Cents,
    pub same_quarter_adjustment: BasisPoints,
    pub next_quarter_adjustment: BasisPoints,
    pub two_quarter_adjustment: BasisPoints,
}

impl Default for WhatIfAdjustment {
    fn default() -> Self {
        Self {
            conversion_rate_multiplier: 1.0,
            acv_new_adjustment: Cents::ZERO,
            acv_upsell_adjustment: Cents::ZERO,
            same_quarter_adjustment: BasisPoints::ZERO,
            next_quarter_adjustment: BasisPoints::ZERO,
            two_quarter_adjustment: BasisPoints::ZERO,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub total_revenue_change: Cents,
    pub total_revenue_change_percent: Decimal,
    pub total_opportunities_change: Opportunities,
    pub total_opportunities_change_percent: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub adjustment: WhatIfAdjustment,
    pub impact: ImpactSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewScenario {
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub adjustment: WhatIfAdjustment,
    pub impact: ImpactSummary,
}

#[cfg(test)]
mod tests {
    use super::{ScenarioId, WhatIfAdjustment};
    use crate::money::{BasisPoints, Cents};

    #[test]
    fn default_adjustment_changes_nothing() {
        let adjustment = WhatIfAdjustment::default();
        assert_eq!(adjustment.conversion_rate_multiplier, 1.0);
        assert_eq!(adjustment.acv_new_adjustment, Cents::ZERO);
        assert_eq!(adjustment.same_quarter_adjustment, BasisPoints::ZERO);
    }

    #[test]
    fn generated_scenario_ids_are_prefixed_and_unique() {
        let first = ScenarioId::generate();
        let second = ScenarioId::generate();
        assert!(first.0.starts_with("scn-"));
        assert_ne!(first, second);
    }
}
