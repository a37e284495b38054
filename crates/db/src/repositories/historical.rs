use async_trait::async_trait;
use cascata_core::domain::dimension::CompanyId;
use cascata_core::domain::historical::HistoricalSqlRecord;
use sqlx::{sqlite::SqliteRow, Row};

use super::{narrow, HistoricalSqlRepository, RepositoryError};
use crate::DbPool;

pub struct SqlHistoricalSqlRepository {
    pool: DbPool,
}

impl SqlHistoricalSqlRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoricalSqlRepository for SqlHistoricalSqlRepository {
    async fn list_historical_sqls(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<HistoricalSqlRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT region, sql_type, year, quarter, volume
            FROM historical_sql
            WHERE company_id = ?
            ORDER BY region, sql_type, year, quarter
            "#,
        )
        .bind(&company.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(historical_from_row).collect()
    }

    async fn upsert_historical_sql(
        &self,
        company: &CompanyId,
        record: HistoricalSqlRecord,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO historical_sql (company_id, region, sql_type, year, quarter, volume)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (company_id, region, sql_type, year, quarter)
            DO UPDATE SET volume = excluded.volume
            "#,
        )
        .bind(&company.0)
        .bind(&record.region)
        .bind(&record.sql_type)
        .bind(record.year)
        .bind(i64::from(record.quarter))
        .bind(record.volume)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn historical_from_row(row: &SqliteRow) -> Result<HistoricalSqlRecord, RepositoryError> {
    Ok(HistoricalSqlRecord {
        region: row.try_get("region")?,
        sql_type: row.try_get("sql_type")?,
        year: narrow("historical_sql.year", row.try_get("year")?)?,
        quarter: narrow("historical_sql.quarter", row.try_get("quarter")?)?,
        volume: row.try_get("volume")?,
    })
}
