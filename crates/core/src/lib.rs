pub mod config;
pub mod domain;
pub mod errors;
pub mod forecast;
pub mod money;

pub use domain::actuals::ActualResult;
pub use domain::conversion::{ConversionRate, DealEconomics, TimeDistribution};
pub use domain::dimension::{CompanyId, Dimension};
pub use domain::forecast::ForecastRow;
pub use domain::historical::HistoricalSqlRecord;
pub use domain::period::Quarter;
pub use domain::scenario::{ImpactSummary, NewScenario, Scenario, ScenarioId, WhatIfAdjustment};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use forecast::{
    CascadeForecastEngine, ForecastEngine, ForecastError, ForecastQuery, ForecastSnapshot,
    ForecastSummary, PerformanceRow, WhatIfEngine, WhatIfResult,
};
pub use money::{BasisPoints, Cents, Opportunities};
