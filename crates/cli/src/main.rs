mod runner;
mod script;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use strike_ledger::AuditEntry;
use strike_relay::{ConfirmationChannel, FixedConfirmation, StdinConfirmation};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Arbiter relay for shared tabletop entities.
#[derive(Parser)]
#[command(
    name = "strike",
    version,
    about = "Arbiter relay for damage, healing, status and resource changes"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SessionArgs {
    /// Path to the session script (JSON)
    session: PathBuf,
    /// Relay configuration file (TOML); overrides the script's config block
    #[arg(long)]
    config: Option<PathBuf>,
    /// Confirm every self-target prompt
    #[arg(long, conflicts_with = "no")]
    yes: bool,
    /// Decline every self-target prompt
    #[arg(long)]
    no: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session script and print per-target outcomes and final entity states
    Run {
        #[command(flatten)]
        args: SessionArgs,
    },

    /// Run a session script and print its audit log
    History {
        #[command(flatten)]
        args: SessionArgs,
        /// Only entries targeting this entity
        #[arg(long)]
        target: Option<String>,
        /// Hide entries that have been undone
        #[arg(long)]
        active: bool,
    },
}

const LOG_ENV: &str = "STRIKE_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Run { args } => {
            cmd_run(&args, cli.output, cli.quiet);
        }
        Commands::History {
            args,
            target,
            active,
        } => {
            cmd_history(&args, target.as_deref(), active, cli.output, cli.quiet);
        }
    }
}

fn execute(args: &SessionArgs, output: OutputFormat, quiet: bool) -> runner::RunReport {
    let script = match script::load(&args.session) {
        Ok(s) => s,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let config = match args.config.as_deref().map(script::load_config) {
        Some(Ok(c)) => c,
        Some(Err(msg)) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
        None => script.config.clone().unwrap_or_default(),
    };
    let confirmation: Arc<dyn ConfirmationChannel> = if args.yes {
        Arc::new(FixedConfirmation(true))
    } else if args.no {
        Arc::new(FixedConfirmation(false))
    } else {
        Arc::new(StdinConfirmation)
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("error: failed to start runtime: {e}"), output, quiet);
            process::exit(1);
        }
    };
    match rt.block_on(runner::run_script(&script, config, confirmation)) {
        Ok(report) => report,
        Err(msg) => {
            report_error(&format!("error: {msg}"), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_run(args: &SessionArgs, output: OutputFormat, quiet: bool) {
    let report = execute(args, output, quiet);
    match output {
        OutputFormat::Text => {
            runner::print_steps(&report);
            if !quiet {
                runner::print_entities(&report.entities);
            }
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct RunOutput<'a> {
                steps: &'a [runner::StepReport],
                entities: &'a [strike_relay::Entity],
            }
            let out = RunOutput {
                steps: &report.steps,
                entities: &report.entities,
            };
            print_json(&out, output, quiet);
        }
    }
}

fn cmd_history(
    args: &SessionArgs,
    target: Option<&str>,
    active: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let report = execute(args, output, quiet);
    let history: Vec<&AuditEntry> = report
        .history
        .iter()
        .filter(|e| target.map_or(true, |t| e.target_entity_id == t))
        .filter(|e| !active || !e.is_undone())
        .collect();

    match output {
        OutputFormat::Text => {
            if history.is_empty() && !quiet {
                println!("no mutations recorded");
            }
            runner::print_history(history);
        }
        OutputFormat::Json => print_json(&history, output, quiet),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, output: OutputFormat, quiet: bool) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            report_error(&format!("error: serialization failed: {e}"), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
