use cascata_core::config::AppConfig;
use cascata_db::{connect_from_config, migrations};
use serde::Serialize;

use crate::commands::{build_runtime, GlobalArgs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(global: &GlobalArgs, json_output: bool) -> String {
    let report = build_report(global);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(global: &GlobalArgs) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(global.load_options()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_default_distribution(&config));
            checks.push(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["default_distribution", "database_schema"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_default_distribution(config: &AppConfig) -> DoctorCheck {
    let distribution = &config.forecast.default_distribution;
    DoctorCheck {
        name: "default_distribution",
        status: CheckStatus::Pass,
        details: format!(
            "{}/{}/{} bp across same, next and two-quarter buckets",
            distribution.same_quarter.0, distribution.next_quarter.0, distribution.two_quarter.0
        ),
    }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => {
            return DoctorCheck {
                name: "database_schema",
                status: CheckStatus::Fail,
                details: failure.message,
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;
        let pending = migrations::pending_count(&pool)
            .await
            .map_err(|error| format!("failed to inspect migrations: {error}"))?;
        pool.close().await;
        Ok::<usize, String>(pending)
    });

    match result {
        Ok(0) => DoctorCheck {
            name: "database_schema",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`; schema is current", config.database.url),
        },
        Ok(pending) => DoctorCheck {
            name: "database_schema",
            status: CheckStatus::Warn,
            details: format!(
                "connected using `{}`; {pending} pending migrations, run `cascata migrate`",
                config.database.url
            ),
        },
        Err(error) => {
            DoctorCheck { name: "database_schema", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
