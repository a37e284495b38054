use async_trait::async_trait;
use thiserror::Error;

use cascata_core::domain::actuals::ActualResult;
use cascata_core::domain::conversion::{ConversionRate, DealEconomics, TimeDistribution};
use cascata_core::domain::dimension::CompanyId;
use cascata_core::domain::forecast::ForecastRow;
use cascata_core::domain::historical::HistoricalSqlRecord;
use cascata_core::domain::scenario::{NewScenario, Scenario, ScenarioId};

pub mod actuals;
pub mod conversion;
pub mod forecast;
pub mod historical;
pub mod memory;
pub mod scenario;

pub use actuals::SqlActualResultRepository;
pub use conversion::SqlConversionRepository;
pub use forecast::SqlForecastRepository;
pub use historical::SqlHistoricalSqlRepository;
pub use memory::{
    InMemoryActualResultRepository, InMemoryConversionRepository, InMemoryForecastRepository,
    InMemoryHistoricalSqlRepository, InMemoryScenarioRepository,
};
pub use scenario::SqlScenarioRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait HistoricalSqlRepository: Send + Sync {
    async fn list_historical_sqls(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<HistoricalSqlRecord>, RepositoryError>;

    /// Inserts or replaces the volume for the record's (region, SQL type, quarter).
    async fn upsert_historical_sql(
        &self,
        company: &CompanyId,
        record: HistoricalSqlRecord,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ConversionRepository: Send + Sync {
    async fn list_conversion_rates(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<ConversionRate>, RepositoryError>;

    async fn list_deal_economics(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<DealEconomics>, RepositoryError>;

    /// The company's stored distribution, or the repository default when none is stored.
    async fn get_time_distribution(
        &self,
        company: &CompanyId,
    ) -> Result<TimeDistribution, RepositoryError>;

    async fn upsert_conversion_rate(
        &self,
        company: &CompanyId,
        rate: ConversionRate,
    ) -> Result<(), RepositoryError>;

    async fn upsert_deal_economics(
        &self,
        company: &CompanyId,
        economics: DealEconomics,
    ) -> Result<(), RepositoryError>;

    async fn set_time_distribution(
        &self,
        company: &CompanyId,
        distribution: TimeDistribution,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ForecastRepository: Send + Sync {
    async fn list_forecast(&self, company: &CompanyId) -> Result<Vec<ForecastRow>, RepositoryError>;

    /// Swaps every stored row for the company with `rows`. All or nothing.
    async fn replace_forecast(
        &self,
        company: &CompanyId,
        rows: &[ForecastRow],
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ScenarioRepository: Send + Sync {
    async fn save(&self, scenario: NewScenario) -> Result<Scenario, RepositoryError>;

    async fn get(&self, id: &ScenarioId) -> Result<Option<Scenario>, RepositoryError>;

    /// Newest first.
    async fn list_for_company(&self, company: &CompanyId)
        -> Result<Vec<Scenario>, RepositoryError>;

    /// Returns whether a scenario was removed.
    async fn delete(&self, id: &ScenarioId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ActualResultRepository: Send + Sync {
    async fn list_actuals(&self, company: &CompanyId)
        -> Result<Vec<ActualResult>, RepositoryError>;

    async fn upsert_actual(
        &self,
        company: &CompanyId,
        actual: ActualResult,
    ) -> Result<(), RepositoryError>;
}

pub(crate) fn narrow<T: TryFrom<i64>>(field: &str, value: i64) -> Result<T, RepositoryError> {
    T::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{field} value {value} is out of range")))
}
