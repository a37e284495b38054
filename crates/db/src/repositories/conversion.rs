use async_trait::async_trait;
use cascata_core::domain::conversion::{ConversionRate, DealEconomics, TimeDistribution};
use cascata_core::domain::dimension::CompanyId;
use cascata_core::money::{BasisPoints, Cents};
use sqlx::{sqlite::SqliteRow, Row};

use super::{ConversionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversionRepository {
    pool: DbPool,
    default_distribution: TimeDistribution,
}

impl SqlConversionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, default_distribution: TimeDistribution::default() }
    }

    pub fn with_default_distribution(mut self, distribution: TimeDistribution) -> Self {
        self.default_distribution = distribution;
        self
    }
}

#[async_trait]
impl ConversionRepository for SqlConversionRepository {
    async fn list_conversion_rates(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<ConversionRate>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT region, sql_type, opp_coverage_bp, win_rate_new_bp, win_rate_upsell_bp
            FROM conversion_rate
            WHERE company_id = ?
            ORDER BY region, sql_type
            "#,
        )
        .bind(&company.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(conversion_rate_from_row).collect()
    }

    async fn list_deal_economics(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<DealEconomics>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT region, acv_new_cents, acv_upsell_cents
            FROM deal_economics
            WHERE company_id = ?
            ORDER BY region
            "#,
        )
        .bind(&company.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(deal_economics_from_row).collect()
    }

    async fn get_time_distribution(
        &self,
        company: &CompanyId,
    ) -> Result<TimeDistribution, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT same_quarter_bp, next_quarter_bp, two_quarter_bp
            FROM time_distribution
            WHERE company_id = ?
            "#,
        )
        .bind(&company.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => time_distribution_from_row(&row),
            None => Ok(self.default_distribution),
        }
    }

    async fn upsert_conversion_rate(
        &self,
        company: &CompanyId,
        rate: ConversionRate,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO conversion_rate (
                company_id, region, sql_type, opp_coverage_bp, win_rate_new_bp, win_rate_upsell_bp
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (company_id, region, sql_type) DO UPDATE SET
                opp_coverage_bp = excluded.opp_coverage_bp,
                win_rate_new_bp = excluded.win_rate_new_bp,
                win_rate_upsell_bp = excluded.win_rate_upsell_bp
            "#,
        )
        .bind(&company.0)
        .bind(&rate.region)
        .bind(&rate.sql_type)
        .bind(rate.opp_coverage_ratio.0)
        .bind(rate.win_rate_new.0)
        .bind(rate.win_rate_upsell.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_deal_economics(
        &self,
        company: &CompanyId,
        economics: DealEconomics,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO deal_economics (company_id, region, acv_new_cents, acv_upsell_cents)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (company_id, region) DO UPDATE SET
                acv_new_cents = excluded.acv_new_cents,
                acv_upsell_cents = excluded.acv_upsell_cents
            "#,
        )
        .bind(&company.0)
        .bind(&economics.region)
        .bind(economics.acv_new.0)
        .bind(economics.acv_upsell.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_time_distribution(
        &self,
        company: &CompanyId,
        distribution: TimeDistribution,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO time_distribution (company_id, same_quarter_bp, next_quarter_bp, two_quarter_bp)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (company_id) DO UPDATE SET
                same_quarter_bp = excluded.same_quarter_bp,
                next_quarter_bp = excluded.next_quarter_bp,
                two_quarter_bp = excluded.two_quarter_bp
            "#,
        )
        .bind(&company.0)
        .bind(distribution.same_quarter.0)
        .bind(distribution.next_quarter.0)
        .bind(distribution.two_quarter.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn conversion_rate_from_row(row: &SqliteRow) -> Result<ConversionRate, RepositoryError> {
    Ok(ConversionRate {
        region: row.try_get("region")?,
        sql_type: row.try_get("sql_type")?,
        opp_coverage_ratio: BasisPoints(row.try_get("opp_coverage_bp")?),
        win_rate_new: BasisPoints(row.try_get("win_rate_new_bp")?),
        win_rate_upsell: BasisPoints(row.try_get("win_rate_upsell_bp")?),
    })
}

fn deal_economics_from_row(row: &SqliteRow) -> Result<DealEconomics, RepositoryError> {
    Ok(DealEconomics {
        region: row.try_get("region")?,
        acv_new: Cents(row.try_get("acv_new_cents")?),
        acv_upsell: Cents(row.try_get("acv_upsell_cents")?),
    })
}

fn time_distribution_from_row(row: &SqliteRow) -> Result<TimeDistribution, RepositoryError> {
    Ok(TimeDistribution::new(
        row.try_get("same_quarter_bp")?,
        row.try_get("next_quarter_bp")?,
        row.try_get("two_quarter_bp")?,
    ))
}
