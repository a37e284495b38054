use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Tables the demo seed writes to, with the row count it leaves behind.
const SEED_TABLES: &[SeedTableContract] = &[
    SeedTableContract { table: "historical_sql", label: "historical-sql-rows", expected_rows: 16 },
    SeedTableContract { table: "conversion_rate", label: "conversion-rate-rows", expected_rows: 4 },
    SeedTableContract { table: "deal_economics", label: "deal-economics-rows", expected_rows: 2 },
    SeedTableContract {
        table: "time_distribution",
        label: "time-distribution-row",
        expected_rows: 1,
    },
    SeedTableContract { table: "actual_result", label: "actual-result-rows", expected_rows: 3 },
];

const SEED_REGIONS: &[&str] = &["EMEA", "NORAM"];
const SEED_SQL_TYPES: &[&str] = &["INBOUND", "OUTBOUND"];

/// Demo forecast inputs for one company.
///
/// Two regions, two SQL types, four quarters of 2024 history, one conversion
/// rate per dimension, deal economics per region, the standard 89/10/1 time
/// distribution, and a handful of actuals for performance comparison.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const COMPANY_ID: &'static str = "demo";

    /// SQL fixture content for the demo company.
    pub const SQL: &'static str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo dataset. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        tracing::info!(
            event_name = "db.fixtures.demo_seeded",
            company_id = Self::COMPANY_ID,
            "demo seed dataset loaded"
        );

        Ok(SeedResult {
            company_id: Self::COMPANY_ID,
            regions: SEED_REGIONS,
            sql_types: SEED_SQL_TYPES,
            historical_records: SEED_TABLES[0].expected_rows,
        })
    }

    /// Check that every seeded table holds exactly the rows the fixture writes.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_TABLES.len() + 1);

        for contract in SEED_TABLES {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM {} WHERE company_id = ?1",
                contract.table
            ))
            .bind(Self::COMPANY_ID)
            .fetch_one(pool)
            .await?;
            checks.push((contract.label, count == contract.expected_rows));
        }

        let uncovered: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(1)
            FROM (SELECT DISTINCT region, sql_type FROM historical_sql WHERE company_id = ?1) h
            LEFT JOIN conversion_rate c
                ON c.company_id = ?1 AND c.region = h.region AND c.sql_type = h.sql_type
            WHERE c.region IS NULL
            "#,
        )
        .bind(Self::COMPANY_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("every-dimension-has-a-rate", uncovered == 0));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove every row belonging to the demo company, derived data included.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let tables = SEED_TABLES.iter().map(|contract| contract.table);
        for table in tables.chain(["forecast_row", "scenario"]) {
            sqlx::query(&format!("DELETE FROM {table} WHERE company_id = ?1"))
                .bind(Self::COMPANY_ID)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTableContract {
    table: &'static str,
    label: &'static str,
    expected_rows: i64,
}

#[derive(Debug)]
pub struct SeedResult {
    pub company_id: &'static str,
    pub regions: &'static [&'static str],
    pub sql_types: &'static [&'static str],
    pub historical_records: i64,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
