use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use cascata_cli::commands::what_if::AdjustmentArgs;
use cascata_cli::commands::{
    config, doctor, forecast, migrate, performance, scenarios, seed, what_if, GlobalArgs,
};
use serde_json::Value;

fn database_args(dir: &Path) -> GlobalArgs {
    GlobalArgs {
        config: None,
        database_url: Some(format!("sqlite://{}?mode=rwc", dir.join("cascata.db").display())),
    }
}

fn identity_adjustment() -> AdjustmentArgs {
    AdjustmentArgs {
        multiplier: 1.0,
        acv_new_delta: 0,
        acv_upsell_delta: 0,
        same_quarter_delta: 0,
        next_quarter_delta: 0,
        two_quarter_delta: 0,
    }
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("CASCATA_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(&GlobalArgs::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_database_url() {
    with_env(&[("CASCATA_DATABASE_URL", "postgres://nope")], || {
        let result = migrate::run(&GlobalArgs::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = database_args(dir.path());

        let first = seed::run(&global);
        assert_eq!(first.exit_code, 0, "expected first seed invocation success: {}", first.output);
        let second = seed::run(&global);
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["message"], second_payload["message"]);
        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("company `demo`"), "{message}");
        assert!(message.contains("16 historical records"), "{message}");
    });
}

#[test]
fn forecast_calculate_then_show_returns_stored_rows() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = database_args(dir.path());
        assert_eq!(seed::run(&global).exit_code, 0);

        let calculated = forecast::calculate(&global, Some("demo".to_string()));
        assert_eq!(calculated.exit_code, 0, "{}", calculated.output);
        let calculated = parse_payload(&calculated.output);
        assert_eq!(calculated["command"], "forecast.calculate");
        assert_eq!(calculated["data"].as_array().map(Vec::len), Some(24));

        let shown = parse_payload(&forecast::show(&global, Some("demo".to_string())).output);
        assert_eq!(shown["data"], calculated["data"]);

        let summary = forecast::summary(
            &global,
            Some("demo".to_string()),
            vec!["NORAM".to_string()],
            vec!["INBOUND".to_string()],
            Some("2024-Q1".parse().expect("quarter")),
            Some("2024-Q1".parse().expect("quarter")),
        );
        let summary = parse_payload(&summary.output);
        assert_eq!(summary["data"]["rows_matched"], 1);
        assert_eq!(summary["data"]["totals"]["opportunities"], 516);
    });
}

#[test]
fn forecast_show_uses_default_company_from_env() {
    with_env(&[("CASCATA_FORECAST_DEFAULT_COMPANY", "demo")], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = database_args(dir.path());
        assert_eq!(seed::run(&global).exit_code, 0);
        assert_eq!(forecast::calculate(&global, None).exit_code, 0);

        let shown = parse_payload(&forecast::show(&global, None).output);
        let message = shown["message"].as_str().unwrap_or_default();
        assert!(message.contains("company `demo`"), "{message}");
    });
}

#[test]
fn what_if_save_then_list_show_and_delete_scenario() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = database_args(dir.path());
        assert_eq!(seed::run(&global).exit_code, 0);

        let adjustment = AdjustmentArgs { multiplier: 1.2, ..identity_adjustment() };
        let evaluated = what_if::run(
            &global,
            Some("demo".to_string()),
            &adjustment,
            Some("Coverage +20%".to_string()),
            Some("stress test".to_string()),
        );
        assert_eq!(evaluated.exit_code, 0, "{}", evaluated.output);
        let evaluated = parse_payload(&evaluated.output);
        let opportunities_change =
            evaluated["data"]["impact"]["total_opportunities_change"].as_i64().unwrap_or_default();
        assert!(opportunities_change > 0, "coverage boost should add opportunities");
        let scenario_id =
            evaluated["data"]["scenario_id"].as_str().expect("scenario id").to_string();
        assert!(scenario_id.starts_with("scn-"));

        let listed = parse_payload(&scenarios::list(&global, Some("demo".to_string())).output);
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

        let shown = parse_payload(&scenarios::show(&global, scenario_id.clone()).output);
        assert_eq!(shown["data"]["name"], "Coverage +20%");
        assert_eq!(shown["data"]["impact"], evaluated["data"]["impact"]);

        assert_eq!(scenarios::delete(&global, scenario_id.clone()).exit_code, 0);
        let missing = scenarios::show(&global, scenario_id);
        assert_eq!(missing.exit_code, 8);
        assert_eq!(parse_payload(&missing.output)["error_class"], "not_found");
    });
}

#[test]
fn what_if_rejects_invalid_multiplier() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = database_args(dir.path());
        assert_eq!(seed::run(&global).exit_code, 0);

        let adjustment = AdjustmentArgs { multiplier: -0.5, ..identity_adjustment() };
        let result = what_if::run(&global, Some("demo".to_string()), &adjustment, None, None);
        assert_eq!(result.exit_code, 7);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn what_if_rejects_overflowing_acv_delta() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = database_args(dir.path());
        assert_eq!(seed::run(&global).exit_code, 0);

        let adjustment = AdjustmentArgs { acv_new_delta: i64::MAX, ..identity_adjustment() };
        let result = what_if::run(&global, Some("demo".to_string()), &adjustment, None, None);
        assert_eq!(result.exit_code, 7, "{}", result.output);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn performance_reports_seeded_actuals() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = database_args(dir.path());
        assert_eq!(seed::run(&global).exit_code, 0);
        assert_eq!(forecast::calculate(&global, Some("demo".to_string())).exit_code, 0);

        let result = performance::run(&global, Some("demo".to_string()));
        assert_eq!(result.exit_code, 0, "{}", result.output);
        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("3 of 24 cells"), "{message}");
    });
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("CASCATA_LOG_LEVEL", "debug")], || {
        let result = config::run(&GlobalArgs::default());
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("- logging.level = debug (source: env (CASCATA_LOG_LEVEL))"));
        assert!(result.output.contains("- forecast.same_quarter_bp = 8900 (source: default)"));
    });
}

#[test]
fn doctor_json_passes_on_migrated_database() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = database_args(dir.path());
        assert_eq!(migrate::run(&global).exit_code, 0);

        let report: Value =
            serde_json::from_str(&doctor::run(&global, true)).expect("doctor JSON output");
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(report["checks"].as_array().map(Vec::len), Some(3));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CASCATA_DATABASE_URL",
        "CASCATA_DATABASE_MAX_CONNECTIONS",
        "CASCATA_DATABASE_TIMEOUT_SECS",
        "CASCATA_FORECAST_DEFAULT_COMPANY",
        "CASCATA_FORECAST_SAME_QUARTER_BP",
        "CASCATA_FORECAST_NEXT_QUARTER_BP",
        "CASCATA_FORECAST_TWO_QUARTER_BP",
        "CASCATA_FORECAST_MAX_CONVERSION_MULTIPLIER",
        "CASCATA_LOGGING_LEVEL",
        "CASCATA_LOGGING_FORMAT",
        "CASCATA_LOG_LEVEL",
        "CASCATA_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
