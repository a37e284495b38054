use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use cascata_core::config::AppConfig;
use toml::Value;

use crate::commands::{CommandResult, GlobalArgs};

pub fn run(global: &GlobalArgs) -> CommandResult {
    let config = match global.load_config() {
        Ok(config) => config,
        Err(failure) => return failure.into_result("config"),
    };

    let config_file_path = detect_config_path(global.config.as_deref());
    let config_file_doc = match load_config_file_doc(config_file_path.as_deref()) {
        Ok(doc) => doc,
        Err(error) => {
            return CommandResult::failure("config", "config_file", format!("{error:#}"), 2);
        }
    };
    let source = |key_path: &str, env_keys: &[&str], overridden: bool| {
        if overridden {
            return "flag".to_string();
        }
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec![
        "effective config (source precedence: flag > env > file > default):".to_string(),
    ];
    for (key, value, env_keys, overridden) in entries(&config, global) {
        let origin = source(key, env_keys, overridden);
        lines.push(render_line(key, &value, origin));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

type Entry = (&'static str, String, &'static [&'static str], bool);

fn entries(config: &AppConfig, global: &GlobalArgs) -> Vec<Entry> {
    let distribution = &config.forecast.default_distribution;
    vec![
        (
            "database.url",
            config.database.url.clone(),
            &["CASCATA_DATABASE_URL"],
            global.database_url.is_some(),
        ),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["CASCATA_DATABASE_MAX_CONNECTIONS"],
            false,
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["CASCATA_DATABASE_TIMEOUT_SECS"],
            false,
        ),
        (
            "forecast.default_company",
            config.forecast.default_company.clone(),
            &["CASCATA_FORECAST_DEFAULT_COMPANY"],
            false,
        ),
        (
            "forecast.same_quarter_bp",
            distribution.same_quarter.0.to_string(),
            &["CASCATA_FORECAST_SAME_QUARTER_BP"],
            false,
        ),
        (
            "forecast.next_quarter_bp",
            distribution.next_quarter.0.to_string(),
            &["CASCATA_FORECAST_NEXT_QUARTER_BP"],
            false,
        ),
        (
            "forecast.two_quarter_bp",
            distribution.two_quarter.0.to_string(),
            &["CASCATA_FORECAST_TWO_QUARTER_BP"],
            false,
        ),
        (
            "forecast.max_conversion_multiplier",
            config.forecast.max_conversion_multiplier.to_string(),
            &["CASCATA_FORECAST_MAX_CONVERSION_MULTIPLIER"],
            false,
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["CASCATA_LOGGING_LEVEL", "CASCATA_LOG_LEVEL"],
            false,
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["CASCATA_LOGGING_FORMAT", "CASCATA_LOG_FORMAT"],
            false,
        ),
    ]
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("cascata.toml"), PathBuf::from("config/cascata.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> anyhow::Result<Option<Value>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file `{}`", path.display()))?;
    let doc = raw
        .parse::<Value>()
        .with_context(|| format!("parsing config file `{}`", path.display()))?;
    Ok(Some(doc))
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
