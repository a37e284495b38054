use async_trait::async_trait;
use cascata_core::domain::actuals::ActualResult;
use cascata_core::domain::dimension::CompanyId;
use cascata_core::money::{Cents, Opportunities};
use sqlx::{sqlite::SqliteRow, Row};

use super::{narrow, ActualResultRepository, RepositoryError};
use crate::DbPool;

pub struct SqlActualResultRepository {
    pool: DbPool,
}

impl SqlActualResultRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActualResultRepository for SqlActualResultRepository {
    async fn list_actuals(&self, company: &CompanyId) -> Result<Vec<ActualResult>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                region, sql_type, year, quarter, actual_sqls, actual_opps,
                actual_revenue_new_cents, actual_revenue_upsell_cents
            FROM actual_result
            WHERE company_id = ?
            ORDER BY region, sql_type, year, quarter
            "#,
        )
        .bind(&company.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(actual_from_row).collect()
    }

    async fn upsert_actual(
        &self,
        company: &CompanyId,
        actual: ActualResult,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO actual_result (
                company_id, region, sql_type, year, quarter, actual_sqls, actual_opps,
                actual_revenue_new_cents, actual_revenue_upsell_cents
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (company_id, region, sql_type, year, quarter) DO UPDATE SET
                actual_sqls = excluded.actual_sqls,
                actual_opps = excluded.actual_opps,
                actual_revenue_new_cents = excluded.actual_revenue_new_cents,
                actual_revenue_upsell_cents = excluded.actual_revenue_upsell_cents
            "#,
        )
        .bind(&company.0)
        .bind(&actual.region)
        .bind(&actual.sql_type)
        .bind(actual.year)
        .bind(i64::from(actual.quarter))
        .bind(actual.actual_sqls)
        .bind(actual.actual_opps.0)
        .bind(actual.actual_revenue_new.0)
        .bind(actual.actual_revenue_upsell.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn actual_from_row(row: &SqliteRow) -> Result<ActualResult, RepositoryError> {
    Ok(ActualResult {
        region: row.try_get("region")?,
        sql_type: row.try_get("sql_type")?,
        year: narrow("actual_result.year", row.try_get("year")?)?,
        quarter: narrow("actual_result.quarter", row.try_get("quarter")?)?,
        actual_sqls: row.try_get("actual_sqls")?,
        actual_opps: Opportunities(row.try_get("actual_opps")?),
        actual_revenue_new: Cents(row.try_get("actual_revenue_new_cents")?),
        actual_revenue_upsell: Cents(row.try_get("actual_revenue_upsell_cents")?),
    })
}
