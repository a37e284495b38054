use cascata_core::domain::dimension::CompanyId;
use cascata_core::domain::scenario::WhatIfAdjustment;
use cascata_core::forecast::ForecastQuery;
use cascata_core::money::{Cents, Opportunities};
use cascata_db::repositories::SqlConversionRepository;
use cascata_db::{connect_with_settings, migrations, DbPool, DemoSeedDataset, ForecastService};

type PipelineTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn open_seeded(path: &std::path::Path) -> PipelineTestResult<DbPool> {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = connect_with_settings(&url, 1, 30)
        .await
        .map_err(|error| format!("connect {url}: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("run migrations: {error}"))?;
    DemoSeedDataset::load(&pool).await.map_err(|error| format!("load demo seed: {error}"))?;
    Ok(pool)
}

fn service(pool: &DbPool) -> ForecastService {
    ForecastService::sqlite(pool.clone(), SqlConversionRepository::new(pool.clone()))
}

fn demo() -> CompanyId {
    CompanyId(DemoSeedDataset::COMPANY_ID.to_string())
}

#[tokio::test]
async fn demo_seed_forecast_is_stable_across_runs() -> PipelineTestResult {
    let dir = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let pool = open_seeded(&dir.path().join("cascata.db")).await?;
    let service = service(&pool);

    let first = service.calculate_forecast(&demo()).await.map_err(|error| error.to_string())?;
    let second = service.calculate_forecast(&demo()).await.map_err(|error| error.to_string())?;
    require_eq!(first, second);
    // Four dimensions, four history quarters each, spread over six quarters.
    require_eq!(first.len(), 24);

    let noram_inbound: Vec<_> = first
        .iter()
        .filter(|row| row.region == "NORAM" && row.sql_type == "INBOUND")
        .collect();
    require_eq!(noram_inbound[0].predicted_opps, Opportunities(516));
    require_eq!(noram_inbound[0].predicted_revenue_new, Cents(645_000));
    require_eq!(noram_inbound[1].predicted_opps, Opportunities(677));

    let stored = service.list_forecast(&demo()).await.map_err(|error| error.to_string())?;
    require_eq!(stored, first);

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn saved_scenario_survives_reconnect() -> PipelineTestResult {
    let dir = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let path = dir.path().join("cascata.db");

    let pool = open_seeded(&path).await?;
    let adjustment = WhatIfAdjustment {
        conversion_rate_multiplier: 1.1,
        acv_new_adjustment: Cents(50_000),
        ..WhatIfAdjustment::default()
    };
    let result = service(&pool)
        .evaluate_what_if(&demo(), &adjustment)
        .await
        .map_err(|error| error.to_string())?;
    require!(
        result.impact.total_revenue_change > Cents::ZERO,
        "a richer scenario should raise revenue, got {:?}",
        result.impact
    );
    let id = service(&pool)
        .save_scenario(
            &demo(),
            "Q3 push",
            Some("coverage +10%".to_string()),
            adjustment.clone(),
            result.impact.clone(),
        )
        .await
        .map_err(|error| error.to_string())?;
    pool.close().await;

    let reopened = open_seeded(&path).await?;
    let scenario = service(&reopened).get_scenario(&id).await.map_err(|error| error.to_string())?;
    require_eq!(scenario.adjustment, adjustment);
    require_eq!(scenario.impact, result.impact);
    require_eq!(scenario.description.as_deref(), Some("coverage +10%"));

    reopened.close().await;
    Ok(())
}

#[tokio::test]
async fn performance_and_summary_cover_seeded_actuals() -> PipelineTestResult {
    let dir = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let pool = open_seeded(&dir.path().join("cascata.db")).await?;
    let service = service(&pool);
    service.calculate_forecast(&demo()).await.map_err(|error| error.to_string())?;

    let performance =
        service.compare_performance(&demo()).await.map_err(|error| error.to_string())?;
    require_eq!(performance.len(), 24);
    require_eq!(performance.iter().filter(|row| row.has_actual).count(), 3);

    let query = ForecastQuery {
        regions: ["EMEA".to_string()].into_iter().collect(),
        ..ForecastQuery::default()
    };
    let summary =
        service.summarize_forecast(&demo(), &query).await.map_err(|error| error.to_string())?;
    require_eq!(summary.rows_matched, 12);
    require_eq!(summary.quarters.len(), 6);

    pool.close().await;
    Ok(())
}
