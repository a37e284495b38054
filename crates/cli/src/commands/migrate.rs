use crate::commands::{build_runtime, CommandFailure, CommandResult, GlobalArgs};
use cascata_db::{connect_from_config, migrations};

pub fn run(global: &GlobalArgs) -> CommandResult {
    let config = match global.load_config() {
        Ok(config) => config,
        Err(failure) => return failure.into_result("migrate"),
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return failure.into_result("migrate"),
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| CommandFailure::new("db_connectivity", error.to_string(), 4))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))?;
        pool.close().await;
        Ok::<(), CommandFailure>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => failure.into_result("migrate"),
    }
}
