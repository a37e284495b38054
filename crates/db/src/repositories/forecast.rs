use async_trait::async_trait;
use chrono::Utc;
use cascata_core::domain::dimension::CompanyId;
use cascata_core::domain::forecast::ForecastRow;
use cascata_core::money::{Cents, Opportunities};
use sqlx::{sqlite::SqliteRow, Row};

use super::{narrow, ForecastRepository, RepositoryError};
use crate::DbPool;

pub struct SqlForecastRepository {
    pool: DbPool,
}

impl SqlForecastRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ForecastRepository for SqlForecastRepository {
    async fn list_forecast(&self, company: &CompanyId) -> Result<Vec<ForecastRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                region, sql_type, year, quarter, predicted_sqls, predicted_opps,
                predicted_revenue_new_cents, predicted_revenue_upsell_cents
            FROM forecast_row
            WHERE company_id = ?
            ORDER BY region, sql_type, year, quarter
            "#,
        )
        .bind(&company.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(forecast_row_from_row).collect()
    }

    async fn replace_forecast(
        &self,
        company: &CompanyId,
        rows: &[ForecastRow],
    ) -> Result<(), RepositoryError> {
        let calculated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM forecast_row WHERE company_id = ?")
            .bind(&company.0)
            .execute(&mut *tx)
            .await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO forecast_row (
                    company_id, region, sql_type, year, quarter, predicted_sqls, predicted_opps,
                    predicted_revenue_new_cents, predicted_revenue_upsell_cents, calculated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&company.0)
            .bind(&row.region)
            .bind(&row.sql_type)
            .bind(row.year)
            .bind(i64::from(row.quarter))
            .bind(row.predicted_sqls)
            .bind(row.predicted_opps.0)
            .bind(row.predicted_revenue_new.0)
            .bind(row.predicted_revenue_upsell.0)
            .bind(&calculated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn forecast_row_from_row(row: &SqliteRow) -> Result<ForecastRow, RepositoryError> {
    Ok(ForecastRow {
        region: row.try_get("region")?,
        sql_type: row.try_get("sql_type")?,
        year: narrow("forecast_row.year", row.try_get("year")?)?,
        quarter: narrow("forecast_row.quarter", row.try_get("quarter")?)?,
        predicted_sqls: row.try_get("predicted_sqls")?,
        predicted_opps: Opportunities(row.try_get("predicted_opps")?),
        predicted_revenue_new: Cents(row.try_get("predicted_revenue_new_cents")?),
        predicted_revenue_upsell: Cents(row.try_get("predicted_revenue_upsell_cents")?),
    })
}

#[cfg(test)]
mod tests {
    use cascata_core::domain::dimension::CompanyId;
    use cascata_core::domain::forecast::ForecastRow;
    use cascata_core::money::{Cents, Opportunities};

    use super::SqlForecastRepository;
    use crate::repositories::ForecastRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    type TestResult<T> = Result<T, String>;

    async fn setup_pool() -> TestResult<DbPool> {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .map_err(|error| format!("connect test pool: {error}"))?;
        migrations::run_pending(&pool).await.map_err(|error| format!("run migrations: {error}"))?;
        Ok(pool)
    }

    fn row(quarter: u8, opps: i64) -> ForecastRow {
        ForecastRow {
            region: "NORAM".to_string(),
            sql_type: "INBOUND".to_string(),
            year: 2024,
            quarter,
            predicted_sqls: 100,
            predicted_opps: Opportunities(opps),
            predicted_revenue_new: Cents(opps * 1_250),
            predicted_revenue_upsell: Cents(opps * 200),
        }
    }

    #[tokio::test]
    async fn replace_swaps_all_rows_for_the_company() -> TestResult<()> {
        let pool = setup_pool().await?;
        let repo = SqlForecastRepository::new(pool.clone());
        let acme = CompanyId("acme".to_string());
        let globex = CompanyId("globex".to_string());

        repo.replace_forecast(&acme, &[row(1, 516), row(2, 58), row(3, 6)])
            .await
            .map_err(|error| format!("first replace: {error}"))?;
        repo.replace_forecast(&globex, &[row(1, 10)])
            .await
            .map_err(|error| format!("globex replace: {error}"))?;
        repo.replace_forecast(&acme, &[row(1, 600)])
            .await
            .map_err(|error| format!("second replace: {error}"))?;

        let listed = repo.list_forecast(&acme).await.map_err(|error| format!("list: {error}"))?;
        if listed != vec![row(1, 600)] {
            return Err(format!("stale rows survived replace: {listed:?}"));
        }
        let untouched =
            repo.list_forecast(&globex).await.map_err(|error| format!("list globex: {error}"))?;
        if untouched != vec![row(1, 10)] {
            return Err(format!("other company rows changed: {untouched:?}"));
        }

        pool.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_rows() -> TestResult<()> {
        let pool = setup_pool().await?;
        let repo = SqlForecastRepository::new(pool.clone());
        let acme = CompanyId("acme".to_string());

        repo.replace_forecast(&acme, &[row(1, 516)])
            .await
            .map_err(|error| format!("seed replace: {error}"))?;

        // The second row collides on the primary key, so the whole batch must roll back.
        let outcome = repo.replace_forecast(&acme, &[row(2, 58), row(2, 59)]).await;
        if outcome.is_ok() {
            return Err("duplicate rows should fail the replacement".to_string());
        }

        let listed = repo.list_forecast(&acme).await.map_err(|error| format!("list: {error}"))?;
        if listed != vec![row(1, 516)] {
            return Err(format!("previous forecast should survive a failed replace: {listed:?}"));
        }

        pool.close().await;
        Ok(())
    }
}
