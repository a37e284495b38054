//! Async entry points that load a company's inputs, run the cascade, and persist results.

use std::sync::Arc;

use cascata_core::domain::dimension::CompanyId;
use cascata_core::domain::forecast::ForecastRow;
use cascata_core::domain::scenario::{
    ImpactSummary, NewScenario, Scenario, ScenarioId, WhatIfAdjustment,
};
use cascata_core::errors::{ApplicationError, DomainError};
use cascata_core::forecast::what_if::DEFAULT_MAX_CONVERSION_MULTIPLIER;
use cascata_core::forecast::{
    compare_performance, summarize, CascadeForecastEngine, ForecastError, ForecastQuery,
    ForecastSnapshot, ForecastSummary, PerformanceRow, WhatIfEngine, WhatIfResult,
};
use thiserror::Error;

use crate::repositories::{
    ActualResultRepository, ConversionRepository, ForecastRepository, HistoricalSqlRepository,
    RepositoryError, ScenarioRepository, SqlActualResultRepository, SqlConversionRepository,
    SqlForecastRepository, SqlHistoricalSqlRepository, SqlScenarioRepository,
};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum ForecastServiceError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("scenario `{0}` was not found")]
    ScenarioNotFound(ScenarioId),
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

impl From<ForecastServiceError> for ApplicationError {
    fn from(value: ForecastServiceError) -> Self {
        match value {
            ForecastServiceError::Forecast(error) => Self::from(error),
            ForecastServiceError::Repository(error) => Self::Persistence(error.to_string()),
            ForecastServiceError::ScenarioNotFound(id) => Self::NotFound(format!("scenario {id}")),
            ForecastServiceError::InvalidScenario(message) => {
                Self::Domain(DomainError::InvariantViolation(message))
            }
        }
    }
}

#[derive(Clone)]
pub struct ForecastService {
    historical: Arc<dyn HistoricalSqlRepository>,
    conversion: Arc<dyn ConversionRepository>,
    forecasts: Arc<dyn ForecastRepository>,
    scenarios: Arc<dyn ScenarioRepository>,
    actuals: Arc<dyn ActualResultRepository>,
    engine: CascadeForecastEngine,
    max_conversion_multiplier: f64,
}

impl ForecastService {
    pub fn new(
        historical: Arc<dyn HistoricalSqlRepository>,
        conversion: Arc<dyn ConversionRepository>,
        forecasts: Arc<dyn ForecastRepository>,
        scenarios: Arc<dyn ScenarioRepository>,
        actuals: Arc<dyn ActualResultRepository>,
    ) -> Self {
        Self {
            historical,
            conversion,
            forecasts,
            scenarios,
            actuals,
            engine: CascadeForecastEngine,
            max_conversion_multiplier: DEFAULT_MAX_CONVERSION_MULTIPLIER,
        }
    }

    /// Service backed by the SQLite repositories. `conversion` decides the
    /// fallback time distribution for companies without one.
    pub fn sqlite(pool: DbPool, conversion: SqlConversionRepository) -> Self {
        Self::new(
            Arc::new(SqlHistoricalSqlRepository::new(pool.clone())),
            Arc::new(conversion),
            Arc::new(SqlForecastRepository::new(pool.clone())),
            Arc::new(SqlScenarioRepository::new(pool.clone())),
            Arc::new(SqlActualResultRepository::new(pool)),
        )
    }

    pub fn with_max_conversion_multiplier(mut self, max_conversion_multiplier: f64) -> Self {
        self.max_conversion_multiplier = max_conversion_multiplier;
        self
    }

    /// Fetches every input for one run. Each call reads fresh data.
    pub async fn load_snapshot(
        &self,
        company: &CompanyId,
    ) -> Result<ForecastSnapshot, ForecastServiceError> {
        Ok(ForecastSnapshot {
            historical: self.historical.list_historical_sqls(company).await?,
            conversion_rates: self.conversion.list_conversion_rates(company).await?,
            deal_economics: self.conversion.list_deal_economics(company).await?,
            time_distribution: self.conversion.get_time_distribution(company).await?,
        })
    }

    /// Recomputes the company's forecast and replaces the stored rows.
    pub async fn calculate_forecast(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<ForecastRow>, ForecastServiceError> {
        let snapshot = self.load_snapshot(company).await?;
        let rows = self.engine.forecast_snapshot(&snapshot).map_err(|error| {
            tracing::warn!(
                event_name = "forecast.service.calculation_rejected",
                company_id = %company,
                error_code = error.code(),
                error = %error,
                "forecast calculation rejected"
            );
            error
        })?;

        self.forecasts.replace_forecast(company, &rows).await?;
        tracing::info!(
            event_name = "forecast.service.calculated",
            company_id = %company,
            historical_records = snapshot.historical.len(),
            rows = rows.len(),
            "forecast recalculated and stored"
        );

        Ok(rows)
    }

    /// Runs the adjusted forecast next to the baseline. Nothing is persisted.
    pub async fn evaluate_what_if(
        &self,
        company: &CompanyId,
        adjustment: &WhatIfAdjustment,
    ) -> Result<WhatIfResult, ForecastServiceError> {
        let snapshot = self.load_snapshot(company).await?;
        let result = WhatIfEngine::new(self.engine)
            .with_max_conversion_multiplier(self.max_conversion_multiplier)
            .evaluate(&snapshot, adjustment)?;

        tracing::info!(
            event_name = "forecast.service.what_if_evaluated",
            company_id = %company,
            multiplier = adjustment.conversion_rate_multiplier,
            revenue_change_cents = result.impact.total_revenue_change.0,
            "what-if scenario evaluated"
        );

        Ok(result)
    }

    /// Stores the adjustment with the impact computed at evaluation time.
    pub async fn save_scenario(
        &self,
        company: &CompanyId,
        name: &str,
        description: Option<String>,
        adjustment: WhatIfAdjustment,
        impact: ImpactSummary,
    ) -> Result<ScenarioId, ForecastServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ForecastServiceError::InvalidScenario(
                "scenario name must not be empty".to_string(),
            ));
        }
        WhatIfEngine::new(self.engine)
            .with_max_conversion_multiplier(self.max_conversion_multiplier)
            .validate_multiplier(adjustment.conversion_rate_multiplier)?;

        let saved = self
            .scenarios
            .save(NewScenario {
                company_id: company.clone(),
                name: name.to_string(),
                description: description.filter(|text| !text.trim().is_empty()),
                adjustment,
                impact,
            })
            .await?;

        tracing::info!(
            event_name = "forecast.service.scenario_saved",
            company_id = %company,
            scenario_id = %saved.id,
            "what-if scenario saved"
        );

        Ok(saved.id)
    }

    pub async fn list_scenarios(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<Scenario>, ForecastServiceError> {
        Ok(self.scenarios.list_for_company(company).await?)
    }

    pub async fn get_scenario(&self, id: &ScenarioId) -> Result<Scenario, ForecastServiceError> {
        self.scenarios
            .get(id)
            .await?
            .ok_or_else(|| ForecastServiceError::ScenarioNotFound(id.clone()))
    }

    pub async fn delete_scenario(&self, id: &ScenarioId) -> Result<(), ForecastServiceError> {
        if !self.scenarios.delete(id).await? {
            return Err(ForecastServiceError::ScenarioNotFound(id.clone()));
        }
        tracing::info!(
            event_name = "forecast.service.scenario_deleted",
            scenario_id = %id,
            "what-if scenario deleted"
        );
        Ok(())
    }

    /// Rows from the last `calculate_forecast`, without recomputing.
    pub async fn list_forecast(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<ForecastRow>, ForecastServiceError> {
        Ok(self.forecasts.list_forecast(company).await?)
    }

    pub async fn compare_performance(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<PerformanceRow>, ForecastServiceError> {
        let forecast = self.forecasts.list_forecast(company).await?;
        let actuals = self.actuals.list_actuals(company).await?;
        Ok(compare_performance(&forecast, &actuals))
    }

    pub async fn summarize_forecast(
        &self,
        company: &CompanyId,
        query: &ForecastQuery,
    ) -> Result<ForecastSummary, ForecastServiceError> {
        let rows = self.forecasts.list_forecast(company).await?;
        Ok(summarize(&rows, query))
    }
}
