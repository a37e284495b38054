pub mod commands;

use std::process::ExitCode;

use cascata_core::config::{AppConfig, LogFormat};
use cascata_core::domain::period::Quarter;
use clap::{Parser, Subcommand};

use commands::what_if::AdjustmentArgs;
use commands::{CommandResult, GlobalArgs};

#[derive(Debug, Parser)]
#[command(
    name = "cascata",
    about = "Cascata revenue forecast CLI",
    long_about = "Project SQL volume into opportunities and revenue, explore what-if scenarios, and compare forecasts with actuals.",
    after_help = "Examples:\n  cascata seed\n  cascata forecast calculate --company demo\n  cascata what-if --company demo --multiplier 1.2 --save \"Coverage +20%\"\n  cascata doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo company into the database")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and database readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(subcommand, about = "Calculate and inspect the stored baseline forecast")]
    Forecast(ForecastCommand),
    #[command(about = "Compare an adjusted forecast with the baseline without storing it")]
    WhatIf {
        #[arg(long, help = "Company to forecast (defaults to forecast.default_company)")]
        company: Option<String>,
        #[command(flatten)]
        adjustment: AdjustmentArgs,
        #[arg(long, value_name = "NAME", help = "Save the evaluated adjustment as a scenario")]
        save: Option<String>,
        #[arg(long, requires = "save", help = "Description stored with the saved scenario")]
        description: Option<String>,
    },
    #[command(subcommand, about = "Manage saved what-if scenarios")]
    Scenarios(ScenarioCommand),
    #[command(about = "Compare the stored forecast with recorded actuals")]
    Performance {
        #[arg(long)]
        company: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ForecastCommand {
    #[command(about = "Recompute the forecast from current inputs and replace stored rows")]
    Calculate {
        #[arg(long)]
        company: Option<String>,
    },
    #[command(about = "Print the stored forecast rows")]
    Show {
        #[arg(long)]
        company: Option<String>,
    },
    #[command(about = "Roll stored forecast rows up per quarter")]
    Summary {
        #[arg(long)]
        company: Option<String>,
        #[arg(long = "region", help = "Restrict to a region (repeatable)")]
        regions: Vec<String>,
        #[arg(long = "sql-type", help = "Restrict to an SQL type (repeatable)")]
        sql_types: Vec<String>,
        #[arg(long, help = "First quarter to include, e.g. 2024-Q1")]
        from: Option<Quarter>,
        #[arg(long, help = "Last quarter to include, e.g. 2025-Q2")]
        to: Option<Quarter>,
    },
}

#[derive(Debug, Subcommand)]
enum ScenarioCommand {
    #[command(about = "List saved scenarios, newest first")]
    List {
        #[arg(long)]
        company: Option<String>,
    },
    #[command(about = "Show one saved scenario")]
    Show { id: String },
    #[command(about = "Delete one saved scenario")]
    Delete { id: String },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.global);

    let result = dispatch(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn dispatch(cli: Cli) -> CommandResult {
    let global = &cli.global;
    match cli.command {
        Command::Migrate => commands::migrate::run(global),
        Command::Seed => commands::seed::run(global),
        Command::Config => commands::config::run(global),
        Command::Doctor { json } => {
            CommandResult { exit_code: 0, output: commands::doctor::run(global, json) }
        }
        Command::Forecast(ForecastCommand::Calculate { company }) => {
            commands::forecast::calculate(global, company)
        }
        Command::Forecast(ForecastCommand::Show { company }) => {
            commands::forecast::show(global, company)
        }
        Command::Forecast(ForecastCommand::Summary { company, regions, sql_types, from, to }) => {
            commands::forecast::summary(global, company, regions, sql_types, from, to)
        }
        Command::WhatIf { company, adjustment, save, description } => {
            commands::what_if::run(global, company, &adjustment, save, description)
        }
        Command::Scenarios(ScenarioCommand::List { company }) => {
            commands::scenarios::list(global, company)
        }
        Command::Scenarios(ScenarioCommand::Show { id }) => commands::scenarios::show(global, id),
        Command::Scenarios(ScenarioCommand::Delete { id }) => {
            commands::scenarios::delete(global, id)
        }
        Command::Performance { company } => commands::performance::run(global, company),
    }
}

/// Logs go to stderr so stdout stays machine-readable. Commands report
/// config errors themselves, so a config that fails to load skips logging.
fn init_logging(global: &GlobalArgs) {
    use tracing::Level;

    let Ok(config) = AppConfig::load(global.load_options()) else {
        return;
    };
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .compact()
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .pretty()
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
    }
}
