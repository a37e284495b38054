use crate::commands::{build_runtime, CommandFailure, CommandResult, GlobalArgs};
use cascata_db::{connect_from_config, migrations, DemoSeedDataset, SeedResult};

pub fn run(global: &GlobalArgs) -> CommandResult {
    let config = match global.load_config() {
        Ok(config) => config,
        Err(failure) => return failure.into_result("seed"),
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return failure.into_result("seed"),
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| CommandFailure::new("db_connectivity", error.to_string(), 4))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_execution", error.to_string(), 5))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_verification", error.to_string(), 6))?;

        let run_result = if verification.all_present {
            Ok(seed_result)
        } else {
            let message = failed_checks_message(&verification.checks);
            Err(CommandFailure::new("seed_verification", message, 6))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_message(&seeded)),
        Err(failure) => failure.into_result("seed"),
    }
}

fn seed_message(seeded: &SeedResult) -> String {
    format!(
        "demo seed dataset loaded for company `{}`: {} historical records across regions [{}] and SQL types [{}]",
        seeded.company_id,
        seeded.historical_records,
        seeded.regions.join(", "),
        seeded.sql_types.join(", ")
    )
}

fn failed_checks_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
