use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::conversion::TimeDistribution;
use crate::forecast::what_if::DEFAULT_MAX_CONVERSION_MULTIPLIER;
use crate::money::BasisPoints;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub forecast: ForecastConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ForecastConfig {
    /// Company used when a command does not name one.
    pub default_company: String,
    /// Used for companies with no stored time distribution.
    pub default_distribution: TimeDistribution,
    pub max_conversion_multiplier: f64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub default_company: Option<String>,
    pub max_conversion_multiplier: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://cascata.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            forecast: ForecastConfig {
                default_company: "default".to_string(),
                default_distribution: TimeDistribution::default(),
                max_conversion_multiplier: DEFAULT_MAX_CONVERSION_MULTIPLIER,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cascata.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(forecast) = patch.forecast {
            if let Some(default_company) = forecast.default_company {
                self.forecast.default_company = default_company;
            }
            if let Some(same_quarter_bp) = forecast.same_quarter_bp {
                self.forecast.default_distribution.same_quarter = BasisPoints(same_quarter_bp);
            }
            if let Some(next_quarter_bp) = forecast.next_quarter_bp {
                self.forecast.default_distribution.next_quarter = BasisPoints(next_quarter_bp);
            }
            if let Some(two_quarter_bp) = forecast.two_quarter_bp {
                self.forecast.default_distribution.two_quarter = BasisPoints(two_quarter_bp);
            }
            if let Some(max_conversion_multiplier) = forecast.max_conversion_multiplier {
                self.forecast.max_conversion_multiplier = max_conversion_multiplier;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CASCATA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CASCATA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("CASCATA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CASCATA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CASCATA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CASCATA_FORECAST_DEFAULT_COMPANY") {
            self.forecast.default_company = value;
        }
        if let Some(value) = read_env("CASCATA_FORECAST_SAME_QUARTER_BP") {
            self.forecast.default_distribution.same_quarter =
                BasisPoints(parse_i64("CASCATA_FORECAST_SAME_QUARTER_BP", &value)?);
        }
        if let Some(value) = read_env("CASCATA_FORECAST_NEXT_QUARTER_BP") {
            self.forecast.default_distribution.next_quarter =
                BasisPoints(parse_i64("CASCATA_FORECAST_NEXT_QUARTER_BP", &value)?);
        }
        if let Some(value) = read_env("CASCATA_FORECAST_TWO_QUARTER_BP") {
            self.forecast.default_distribution.two_quarter =
                BasisPoints(parse_i64("CASCATA_FORECAST_TWO_QUARTER_BP", &value)?);
        }
        if let Some(value) = read_env("CASCATA_FORECAST_MAX_CONVERSION_MULTIPLIER") {
            self.forecast.max_conversion_multiplier =
                parse_f64("CASCATA_FORECAST_MAX_CONVERSION_MULTIPLIER", &value)?;
        }

        let log_level =
            read_env("CASCATA_LOGGING_LEVEL").or_else(|| read_env("CASCATA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CASCATA_LOGGING_FORMAT").or_else(|| read_env("CASCATA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(default_company) = overrides.default_company {
            self.forecast.default_company = default_company;
        }
        if let Some(max_conversion_multiplier) = overrides.max_conversion_multiplier {
            self.forecast.max_conversion_multiplier = max_conversion_multiplier;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_forecast(&self.forecast)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cascata.toml"), PathBuf::from("config/cascata.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_forecast(forecast: &ForecastConfig) -> Result<(), ConfigError> {
    if forecast.default_company.trim().is_empty() {
        return Err(ConfigError::Validation(
            "forecast.default_company must not be empty".to_string(),
        ));
    }

    let distribution = &forecast.default_distribution;
    if distribution.weights().iter().any(|weight| weight.is_negative()) {
        return Err(ConfigError::Validation(
            "forecast distribution buckets must not be negative".to_string(),
        ));
    }
    if !distribution.is_normalized() {
        return Err(ConfigError::Validation(format!(
            "forecast distribution buckets must sum to 10000 bp (got {})",
            distribution.total().0
        )));
    }

    let max = forecast.max_conversion_multiplier;
    if !max.is_finite() || max <= 0.0 {
        return Err(ConfigError::Validation(
            "forecast.max_conversion_multiplier must be a finite number greater than zero"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    forecast: Option<ForecastPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastPatch {
    default_company: Option<String>,
    same_quarter_bp: Option<i64>,
    next_quarter_bp: Option<i64>,
    two_quarter_bp: Option<i64>,
    max_conversion_multiplier: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::conversion::TimeDistribution;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;
        ensure(
            config.forecast.default_distribution == TimeDistribution::new(8_900, 1_000, 100),
            "default distribution should be 89/10/1",
        )?;
        ensure(config.database.url == "sqlite://cascata.db", "default database url")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_CASCATA_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cascata.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_CASCATA_DB}"

[forecast]
same_quarter_bp = 8000
next_quarter_bp = 1500
two_quarter_bp = 500
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(
                config.forecast.default_distribution == TimeDistribution::new(8_000, 1_500, 500),
                "distribution should be read from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_CASCATA_DB"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CASCATA_LOG_LEVEL", "warn");
        env::set_var("CASCATA_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["CASCATA_LOG_LEVEL", "CASCATA_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CASCATA_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("CASCATA_FORECAST_MAX_CONVERSION_MULTIPLIER", "3.5");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cascata.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[forecast]
max_conversion_multiplier = 2.0
default_company = "acme"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                (config.forecast.max_conversion_multiplier - 3.5).abs() < f64::EPSILON,
                "env multiplier guardrail should win over file",
            )?;
            ensure(config.forecast.default_company == "acme", "file company should apply")?;
            Ok(())
        })();

        clear_vars(&["CASCATA_DATABASE_URL", "CASCATA_FORECAST_MAX_CONVERSION_MULTIPLIER"]);
        result
    }

    #[test]
    fn unnormalized_default_distribution_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CASCATA_FORECAST_TWO_QUARTER_BP", "500");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("10000 bp")
            );
            ensure(has_message, "validation failure should mention the expected total")
        })();

        clear_vars(&["CASCATA_FORECAST_TWO_QUARTER_BP"]);
        result
    }

    #[test]
    fn malformed_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CASCATA_DATABASE_MAX_CONNECTIONS", "many");

        let result = (|| -> Result<(), String> {
            let outcome = AppConfig::load(LoadOptions::default());
            ensure(
                matches!(
                    outcome,
                    Err(ConfigError::InvalidEnvOverride { ref key, .. })
                        if key == "CASCATA_DATABASE_MAX_CONNECTIONS"
                ),
                "invalid integer should surface as InvalidEnvOverride",
            )
        })();

        clear_vars(&["CASCATA_DATABASE_MAX_CONNECTIONS"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let outcome = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist/cascata.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });
        assert!(matches!(outcome, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn non_positive_multiplier_guardrail_is_rejected() {
        let mut config = AppConfig::default();
        config.forecast.max_conversion_multiplier = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
