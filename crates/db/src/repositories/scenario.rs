use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cascata_core::domain::dimension::CompanyId;
use cascata_core::domain::scenario::{
    ImpactSummary, NewScenario, Scenario, ScenarioId, WhatIfAdjustment,
};
use cascata_core::money::{Cents, Opportunities};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use super::{RepositoryError, ScenarioRepository};
use crate::DbPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioRecord {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub description: Option<String>,
    pub adjustment_json: String,
    pub total_revenue_change_cents: i64,
    pub total_revenue_change_percent: String,
    pub total_opportunities_change: i64,
    pub total_opportunities_change_percent: String,
    pub created_at: String,
}

impl TryFrom<ScenarioRecord> for Scenario {
    type Error = RepositoryError;

    fn try_from(value: ScenarioRecord) -> Result<Self, Self::Error> {
        let adjustment: WhatIfAdjustment =
            serde_json::from_str(&value.adjustment_json).map_err(|error| {
                RepositoryError::Decode(format!("invalid scenario adjustment_json: {error}"))
            })?;

        Ok(Self {
            id: ScenarioId(value.id),
            company_id: CompanyId(value.company_id),
            name: value.name,
            description: value.description,
            adjustment,
            impact: ImpactSummary {
                total_revenue_change: Cents(value.total_revenue_change_cents),
                total_revenue_change_percent: parse_decimal(
                    "total_revenue_change_percent",
                    &value.total_revenue_change_percent,
                )?,
                total_opportunities_change: Opportunities(value.total_opportunities_change),
                total_opportunities_change_percent: parse_decimal(
                    "total_opportunities_change_percent",
                    &value.total_opportunities_change_percent,
                )?,
            },
            created_at: parse_rfc3339("scenario created_at", &value.created_at)?,
        })
    }
}

impl TryFrom<Scenario> for ScenarioRecord {
    type Error = RepositoryError;

    fn try_from(value: Scenario) -> Result<Self, Self::Error> {
        let multiplier = value.adjustment.conversion_rate_multiplier;
        if !multiplier.is_finite() {
            return Err(RepositoryError::Decode(format!(
                "scenario multiplier {multiplier} cannot be stored as JSON"
            )));
        }
        let adjustment_json = serde_json::to_string(&value.adjustment).map_err(|error| {
            RepositoryError::Decode(format!("could not encode scenario adjustment: {error}"))
        })?;

        Ok(Self {
            id: value.id.0,
            company_id: value.company_id.0,
            name: value.name,
            description: value.description,
            adjustment_json,
            total_revenue_change_cents: value.impact.total_revenue_change.0,
            total_revenue_change_percent: value.impact.total_revenue_change_percent.to_string(),
            total_opportunities_change: value.impact.total_opportunities_change.0,
            total_opportunities_change_percent: value
                .impact
                .total_opportunities_change_percent
                .to_string(),
            created_at: value.created_at.to_rfc3339(),
        })
    }
}

pub struct SqlScenarioRepository {
    pool: DbPool,
}

impl SqlScenarioRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScenarioRepository for SqlScenarioRepository {
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
        let record = ScenarioRecord::try_from(saved.clone())?;

        sqlx::query(
            r#"
            INSERT INTO scenario (
                id, company_id, name, description, adjustment_json,
                total_revenue_change_cents, total_revenue_change_percent,
                total_opportunities_change, total_opportunities_change_percent, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.company_id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.adjustment_json)
        .bind(record.total_revenue_change_cents)
        .bind(&record.total_revenue_change_percent)
        .bind(record.total_opportunities_change)
        .bind(&record.total_opportunities_change_percent)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn get(&self, id: &ScenarioId) -> Result<Option<Scenario>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, company_id, name, description, adjustment_json,
                total_revenue_change_cents, total_revenue_change_percent,
                total_opportunities_change, total_opportunities_change_percent, created_at
            FROM scenario
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| scenario_from_row(&r)).transpose()
    }

    async fn list_for_company(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<Scenario>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, company_id, name, description, adjustment_json,
                total_revenue_change_cents, total_revenue_change_percent,
                total_opportunities_change, total_opportunities_change_percent, created_at
            FROM scenario
            WHERE company_id = ?
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(&company.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scenario_from_row).collect()
    }

    async fn delete(&self, id: &ScenarioId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM scenario WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn scenario_record_from_row(row: &SqliteRow) -> Result<ScenarioRecord, RepositoryError> {
    Ok(ScenarioRecord {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        adjustment_json: row.try_get("adjustment_json")?,
        total_revenue_change_cents: row.try_get("total_revenue_change_cents")?,
        total_revenue_change_percent: row.try_get("total_revenue_change_percent")?,
        total_opportunities_change: row.try_get("total_opportunities_change")?,
        total_opportunities_change_percent: row.try_get("total_opportunities_change_percent")?,
        created_at: row.try_get("created_at")?,
    })
}

fn scenario_from_row(row: &SqliteRow) -> Result<Scenario, RepositoryError> {
    Scenario::try_from(scenario_record_from_row(row)?)
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|error| {
        RepositoryError::Decode(format!("invalid {field} decimal '{value}': {error}"))
    })
}

fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}
