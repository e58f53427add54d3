pub mod commands;
pub mod store;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use prosper_core::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "prosper",
    about = "Prosper household financial-health CLI",
    long_about = "Canonicalize and merge household profile updates, then report KPIs, gates, level and next actions.",
    after_help = "Examples:\n  prosper scenarios\n  prosper evaluate --profile household.json --json\n  prosper apply --profile household.json --update update.json --out household.json\n  prosper config"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a prosper.toml config file")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Pin the calendar year used for age arithmetic")]
    pub year: Option<i32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum UpdateMode {
    #[default]
    Absolute,
    Delta,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Evaluate a stored profile and print its health snapshot")]
    Evaluate {
        #[arg(long, help = "Profile JSON file")]
        profile: PathBuf,
        #[arg(long, help = "Emit the full snapshot as JSON")]
        json: bool,
    },
    #[command(about = "Merge an absolute or delta update into a profile")]
    Apply(commands::apply::ApplyArgs),
    #[command(about = "Evaluate the built-in reference households")]
    Scenarios {
        #[arg(long, help = "Only run one scenario (A, B or C)")]
        only: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let global = cli.global;

    if let Ok(config) = commands::load_config(&global) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Evaluate { profile, json } => commands::evaluate::run(&global, &profile, json),
        Command::Apply(args) => commands::apply::run(&global, &args),
        Command::Scenarios { only, json } => commands::scenarios::run(&global, only.as_deref(), json),
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(&global),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays parseable.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
