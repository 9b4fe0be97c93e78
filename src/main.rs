use anyhow::{Context, Result};
use colored::*;
use emit_key::cli::{is_informational, Cli};
use emit_key::{catalog, trigger, Config, EmitKeyError, Outcome, PressSequencer, UinputBackend};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::parse_from_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) if is_informational(&e) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let err = EmitKeyError::from(e);
            eprint!("{err}");
            return ExitCode::from(err.exit_code());
        }
    };

    if cli.list_keys {
        print_keys();
        return ExitCode::SUCCESS;
    }

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => return report(anyhow::Error::new(e)),
    };

    init_tracing(config.verbose);

    match run(config).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => report(e),
    }
}

async fn run(config: Config) -> Result<Outcome> {
    debug!("Using configuration: {:?}", config);

    let sequence = config.sequence().context("Failed to parse key sequence")?;
    let notifications =
        trigger::listen_for_signals().context("Failed to install signal handlers")?;

    let mut sequencer = PressSequencer::new(sequence, config.mode())
        .with_timing(config.timing())
        .with_identity(config.identity());

    let outcome = sequencer
        .run(&mut UinputBackend::new(), notifications)
        .await
        .context("Failed to emit keys")?;

    match outcome {
        Outcome::Completed => println!("{} Done", "✅".green()),
        Outcome::Terminated(kind) => println!(
            "{} Stopped by {} request after {} round(s)",
            "🛑".yellow(),
            kind,
            sequencer.rounds()
        ),
    }

    Ok(outcome)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_keys() {
    println!("{}", "Supported keys:".bold());
    for entry in catalog::entries() {
        println!("  {:<10} {}", entry.name.cyan(), entry.code.code());
    }
}

fn report(err: anyhow::Error) -> ExitCode {
    eprintln!("{} {:#}", "Error:".red().bold(), err);
    let code = err
        .downcast_ref::<EmitKeyError>()
        .map(EmitKeyError::exit_code)
        .unwrap_or(1);
    ExitCode::from(code)
}
