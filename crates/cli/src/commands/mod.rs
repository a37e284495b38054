pub mod config;
pub mod doctor;
pub mod forecast;
pub mod migrate;
pub mod performance;
pub mod scenarios;
pub mod seed;
pub mod what_if;

use std::future::Future;
use std::path::PathBuf;

use cascata_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use cascata_core::domain::dimension::CompanyId;
use cascata_core::errors::{ApplicationError, InterfaceError};
use cascata_db::repositories::SqlConversionRepository;
use cascata_db::{connect_from_config, migrations, ForecastService, ForecastServiceError};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => {
                let payload = CommandOutcome {
                    command: command.to_string(),
                    status: "ok".to_string(),
                    error_class: None,
                    message: message.into(),
                    data: Some(data),
                };
                Self { exit_code: 0, output: serialize_payload(payload) }
            }
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a cascata.toml config file")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured database URL")]
    pub database_url: Option<String>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                ..ConfigOverrides::default()
            },
        }
    }

    pub fn load_config(&self) -> Result<AppConfig, CommandFailure> {
        AppConfig::load(self.load_options()).map_err(|error| {
            CommandFailure::new("config_validation", format!("configuration issue: {error}"), 2)
        })
    }
}

#[derive(Debug)]
pub struct CommandFailure {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl CommandFailure {
    pub fn new(error_class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class, message: message.into(), exit_code }
    }

    pub fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure(command, self.error_class, self.message, self.exit_code)
    }
}

impl From<ForecastServiceError> for CommandFailure {
    fn from(error: ForecastServiceError) -> Self {
        let correlation_id = format!("cli-{}", std::process::id());
        match ApplicationError::from(error).into_interface(correlation_id) {
            InterfaceError::BadRequest { message, .. } => Self::new("invalid_input", message, 7),
            InterfaceError::NotFound { message, .. } => Self::new("not_found", message, 8),
            InterfaceError::ServiceUnavailable { message, .. }
            | InterfaceError::Internal { message, .. } => Self::new("persistence", message, 5),
        }
    }
}

/// Message plus JSON payload returned by a successful command.
pub struct Completed<T> {
    pub message: String,
    pub data: T,
}

impl<T> Completed<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self { message: message.into(), data }
    }
}

pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, CommandFailure> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandFailure::new("runtime_init", format!("failed to initialize async runtime: {error}"), 3)
    })
}

/// Loads config, opens and migrates the database, then hands a ready
/// [`ForecastService`] and the resolved company to `work`.
pub(crate) fn with_service<T, F, Fut>(
    command: &str,
    global: &GlobalArgs,
    company: Option<String>,
    work: F,
) -> CommandResult
where
    T: Serialize,
    F: FnOnce(ForecastService, CompanyId) -> Fut,
    Fut: Future<Output = Result<Completed<T>, CommandFailure>>,
{
    let config = match global.load_config() {
        Ok(config) => config,
        Err(failure) => return failure.into_result(command),
    };
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return failure.into_result(command),
    };

    let company = CompanyId(company.unwrap_or_else(|| config.forecast.default_company.clone()));
    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| CommandFailure::new("db_connectivity", error.to_string(), 4))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))?;

        let conversion = SqlConversionRepository::new(pool.clone())
            .with_default_distribution(config.forecast.default_distribution);
        let service = ForecastService::sqlite(pool.clone(), conversion)
            .with_max_conversion_multiplier(config.forecast.max_conversion_multiplier);

        let outcome = work(service, company).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(completed) => CommandResult::success_with_data(command, completed.message, &completed.data),
        Err(failure) => failure.into_result(command),
    }
}

#[cfg(test)]
mod tests {
    use cascata_core::domain::scenario::ScenarioId;
    use cascata_core::forecast::ForecastError;
    use cascata_db::ForecastServiceError;
    use serde_json::Value;

    use super::{CommandFailure, CommandResult};

    #[test]
    fn success_with_data_embeds_payload() {
        let result = CommandResult::success_with_data("forecast", "done", &vec![1, 2, 3]);
        let payload: Value = serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(payload["error_class"], Value::Null);
    }

    #[test]
    fn plain_success_omits_data_field() {
        let result = CommandResult::success("migrate", "applied");
        let payload: Value = serde_json::from_str(&result.output).expect("valid json");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn service_errors_map_to_exit_codes() {
        let invalid = CommandFailure::from(ForecastServiceError::Forecast(
            ForecastError::InvalidMultiplier { value: "NaN".to_string() },
        ));
        assert_eq!((invalid.error_class, invalid.exit_code), ("invalid_input", 7));
        assert!(invalid.message.contains("finite"), "{}", invalid.message);

        let missing = CommandFailure::from(ForecastServiceError::ScenarioNotFound(ScenarioId(
            "scn-x".to_string(),
        )));
        assert_eq!((missing.error_class, missing.exit_code), ("not_found", 8));
    }
}
