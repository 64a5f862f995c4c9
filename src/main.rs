use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ocli::config::Config;
use ocli::hierarchy::SystemClock;
use ocli::interpreter::{DebugLevel, InterpreterContext, OcliError, ShellState};
use ocli::network::{ApiPort, HttpApi};

#[derive(Parser)]
#[command(name = "ocli")]
#[command(about = "Command shell for a data-center inventory API")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Inventory API base URL, overrides the configuration
    #[arg(long = "api-url")]
    api_url: Option<String>,

    /// Script file to execute
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Check the script without any effect
    #[arg(short = 'd', long = "dry-run")]
    dry_run: bool,

    /// Execute one command line
    #[arg(short = 'c', long = "command")]
    command: Option<String>,

    /// More logs on stderr, repeatable
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Log filter used when `RUST_LOG` is not set.
fn default_filter(debug_level: i64, verbose: u8) -> &'static str {
    match debug_level + i64::from(verbose) {
        i64::MIN..=0 => "off",
        1 => "error",
        2 => "warn",
        3 => "info",
        4 => "debug",
        _ => "trace",
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error : {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.debug_level, cli.verbose)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let mut options = config.api_options();
    if let Some(url) = cli.api_url.clone() {
        options.base_url = url;
    }
    let api = match HttpApi::new(options) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error : {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut state = ShellState::new();
    state.debug_level = DebugLevel::from_int(config.debug_level).unwrap_or_default();
    state.print_commands = config.print_commands;
    state.draw_threshold = config.draw_limit;

    match run(&cli, &mut state, &api) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, state: &mut ShellState, api: &dyn ApiPort) -> Result<(), OcliError> {
    let clock = SystemClock;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(command) = &cli.command {
        state.dry_run = cli.dry_run;
        return execute_line(state, api, &clock, &mut out, command);
    }

    if let Some(file) = &cli.file {
        let mut ctx = InterpreterContext::new(state, api, &clock, &mut out);
        return if cli.dry_run {
            ctx.dry_load_file(file)
        } else {
            ctx.load_file(file)
        };
    }

    state.dry_run = cli.dry_run;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if let Err(e) = execute_line(state, api, &clock, &mut out, &line) {
            writeln!(out, "{}", e.user_message())?;
        }
        if state.exit_requested {
            break;
        }
    }
    Ok(())
}

fn execute_line(
    state: &mut ShellState,
    api: &dyn ApiPort,
    clock: &SystemClock,
    out: &mut dyn Write,
    line: &str,
) -> Result<(), OcliError> {
    debug!(line, "executing");
    let node = ocli::parse(line)?;
    let mut ctx = InterpreterContext::new(state, api, clock, out);
    ctx.execute(&node)?;
    Ok(())
}
