use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tokio::sync::RwLock;

use cascata_core::domain::actuals::ActualResult;
use cascata_core::domain::conversion::{ConversionRate, DealEconomics, TimeDistribution};
use cascata_core::domain::dimension::{CompanyId, Dimension};
use cascata_core::domain::forecast::ForecastRow;
use cascata_core::domain::historical::HistoricalSqlRecord;
use cascata_core::domain::period::Quarter;
use cascata_core::domain::scenario::{NewScenario, Scenario, ScenarioId};

use super::{
    ActualResultRepository, ConversionRepository, ForecastRepository, HistoricalSqlRepository,
    RepositoryError, ScenarioRepository,
};

type CellKey = (Dimension, i32, u8);

#[derive(Default)]
pub struct InMemoryHistoricalSqlRepository {
    records: RwLock<HashMap<String, BTreeMap<CellKey, HistoricalSqlRecord>>>,
}

#[async_trait::async_trait]
impl HistoricalSqlRepository for InMemoryHistoricalSqlRepository {
    async fn list_historical_sqls(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<HistoricalSqlRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&company.0).map(|cells| cells.values().cloned().collect()).unwrap_or_default())
    }

    async fn upsert_historical_sql(
        &self,
        company: &CompanyId,
        record: HistoricalSqlRecord,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        let key = (record.dimension(), record.year, record.quarter);
        records.entry(company.0.clone()).or_default().insert(key, record);
        Ok(())
    }
}

#[derive(Default)]
struct CompanyConversion {
    rates: BTreeMap<Dimension, ConversionRate>,
    economics: BTreeMap<String, DealEconomics>,
    distribution: Option<TimeDistribution>,
}

#[derive(Default)]
pub struct InMemoryConversionRepository {
    companies: RwLock<HashMap<String, CompanyConversion>>,
    default_distribution: TimeDistribution,
}

impl InMemoryConversionRepository {
    pub fn with_default_distribution(distribution: TimeDistribution) -> Self {
        Self { companies: RwLock::default(), default_distribution: distribution }
    }
}

#[async_trait::async_trait]
impl ConversionRepository for InMemoryConversionRepository {
    async fn list_conversion_rates(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<ConversionRate>, RepositoryError> {
        let companies = self.companies.read().await;
        Ok(companies
            .get(&company.0)
            .map(|entry| entry.rates.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_deal_economics(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<DealEconomics>, RepositoryError> {
        let companies = self.companies.read().await;
        Ok(companies
            .get(&company.0)
            .map(|entry| entry.economics.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_time_distribution(
        &self,
        company: &CompanyId,
    ) -> Result<TimeDistribution, RepositoryError> {
        let companies = self.companies.read().await;
        Ok(companies
            .get(&company.0)
            .and_then(|entry| entry.distribution)
            .unwrap_or(self.default_distribution))
    }

    async fn upsert_conversion_rate(
        &self,
        company: &CompanyId,
        rate: ConversionRate,
    ) -> Result<(), RepositoryError> {
        let mut companies = self.companies.write().await;
        let dimension = Dimension::new(rate.region.clone(), rate.sql_type.clone());
        companies.entry(company.0.clone()).or_default().rates.insert(dimension, rate);
        Ok(())
    }

    async fn upsert_deal_economics(
        &self,
        company: &CompanyId,
        economics: DealEconomics,
    ) -> Result<(), RepositoryError> {
        let mut companies = self.companies.write().await;
        companies
            .entry(company.0.clone())
            .or_default()
            .economics
            .insert(economics.region.clone(), economics);
        Ok(())
    }

    async fn set_time_distribution(
        &self,
        company: &CompanyId,
        distribution: TimeDistribution,
    ) -> Result<(), RepositoryError> {
        let mut companies = self.companies.write().await;
        companies.entry(company.0.clone()).or_default().distribution = Some(distribution);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryForecastRepository {
    rows: RwLock<HashMap<String, Vec<ForecastRow>>>,
}

#[async_trait::async_trait]
impl ForecastRepository for InMemoryForecastRepository {
    async fn list_forecast(&self, company: &CompanyId) -> Result<Vec<ForecastRow>, RepositoryError> {
        let rows = self.rows.read().await;
        let mut listed = rows.get(&company.0).cloned().unwrap_or_default();
        listed.sort_by_key(|row| (row.dimension(), row.period()));
        Ok(listed)
    }

    async fn replace_forecast(
        &self,
        company: &CompanyId,
        rows: &[ForecastRow],
    ) -> Result<(), RepositoryError> {
        let mut seen: Vec<(Dimension, Quarter)> =
            rows.iter().map(|row| (row.dimension(), row.period())).collect();
        seen.sort();
        if seen.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(RepositoryError::Decode(
                "forecast rows must be unique per region, SQL type and quarter".to_string(),
            ));
        }

        let mut stored = self.rows.write().await;
        stored.insert(company.0.clone(), rows.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryScenarioRepository {
    scenarios: RwLock<HashMap<String, Scenario>>,
}

#[async_trait::async_trait]
impl ScenarioRepository for InMemoryScenarioRepository {
    async fn save(&self, scenario: NewScenario) -> Result<Scenario, RepositoryError> {
        let saved = Scenario {
            id: ScenarioId::generate(),
            company_id: scenario.company_id,
            name: scenario.name,
            description: scenario.description,
            adjustment: scenario.adjustment,
            impact: scenario.impact,
            created_at: Utc::now(),
        };
        let mut scenarios = self.scenarios.write().await;
        scenarios.insert(saved.id.0.clone(), saved.clone());
        Ok(saved)
    }

    async fn get(&self, id: &ScenarioId) -> Result<Option<Scenario>, RepositoryError> {
        let scenarios = self.scenarios.read().await;
        Ok(scenarios.get(&id.0).cloned())
    }

    async fn list_for_company(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<Scenario>, RepositoryError> {
        let scenarios = self.scenarios.read().await;
        let mut listed: Vec<Scenario> =
            scenarios.values().filter(|scenario| scenario.company_id == *company).cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(listed)
    }

    async fn delete(&self, id: &ScenarioId) -> Result<bool, RepositoryError> {
        let mut scenarios = self.scenarios.write().await;
        Ok(scenarios.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryActualResultRepository {
    actuals: RwLock<HashMap<String, BTreeMap<CellKey, ActualResult>>>,
}

#[async_trait::async_trait]
impl ActualResultRepository for InMemoryActualResultRepository {
    async fn list_actuals(&self, company: &CompanyId) -> Result<Vec<ActualResult>, RepositoryError> {
        let actuals = self.actuals.read().await;
        Ok(actuals.get(&company.0).map(|cells| cells.values().cloned().collect()).unwrap_or_default())
    }

    async fn upsert_actual(
        &self,
        company: &CompanyId,
        actual: ActualResult,
    ) -> Result<(), RepositoryError> {
        let mut actuals = self.actuals.write().await;
        let key = (
            Dimension::new(actual.region.clone(), actual.sql_type.clone()),
            actual.year,
            actual.quarter,
        );
        actuals.entry(company.0.clone()).or_default().insert(key, actual);
        Ok(())
    }
}
