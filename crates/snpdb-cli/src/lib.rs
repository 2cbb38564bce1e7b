// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod actions;
mod commands;
mod helpers;
mod prompt;

use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

use clap::{error::ErrorKind, ArgAction, Parser};
use snpdb_core::{ErrorCode, ExitCode, MachineError, SnpdbConfig};
use snpdb_ingest::{FormatError, ImportError};
use snpdb_query::QueryError;
use snpdb_store::StoreError;

use crate::commands::Commands;

pub const CRATE_NAME: &str = "snpdb-cli";

#[derive(Parser)]
#[command(name = "snpdb")]
#[command(about = "SNP genotype store")]
#[command(
    after_help = "Environment:\n  SNPDB_CONFIG      Config file path\n  SNPDB_DATABASE    Database path override\n  SNPDB_LOG_LEVEL   Log filter (default info)\n  SNPDB_LOG_JSON    Emit logs as JSON when 1"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy)]
struct LogFlags {
    quiet: bool,
    verbose: u8,
}

#[derive(Clone, Copy)]
struct OutputMode {
    json: bool,
    quiet: bool,
}

/// Resolved settings shared by every subcommand.
struct Context {
    config: SnpdbConfig,
    output: OutputMode,
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(code) => ProcessExitCode::from(code as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<ExitCode, CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(ExitCode::Success);
            }
            _ => {
                return Err(CliError {
                    exit_code: ExitCode::Usage,
                    machine: MachineError::from_code(
                        ErrorCode::UsageError,
                        "invalid command line arguments",
                    )
                    .with_detail("error", &err.to_string()),
                });
            }
        },
    };
    helpers::init_tracing(LogFlags {
        quiet: cli.quiet,
        verbose: cli.verbose,
    });
    let command = cli.command.ok_or_else(|| {
        CliError::coded(ErrorCode::UsageError, "missing command; see --help".to_string())
    })?;
    let ctx = Context {
        config: helpers::load_config(cli.config.as_deref(), cli.db.as_deref())?,
        output: OutputMode {
            json: cli.json,
            quiet: cli.quiet,
        },
    };
    actions::dispatch(&ctx, command)
}

#[derive(Debug)]
struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    fn coded(code: ErrorCode, message: String) -> Self {
        Self {
            exit_code: code.exit_code(),
            machine: MachineError::from_code(code, &message),
        }
    }

    fn internal(message: String) -> Self {
        Self::coded(ErrorCode::InternalError, message)
    }
}

impl From<ImportError> for CliError {
    fn from(value: ImportError) -> Self {
        Self::coded(value.error_code(), value.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        ImportError::from(value).into()
    }
}

impl From<FormatError> for CliError {
    fn from(value: FormatError) -> Self {
        Self::coded(ErrorCode::FormatError, value.to_string())
    }
}

impl From<QueryError> for CliError {
    fn from(value: QueryError) -> Self {
        Self::coded(value.error_code(), value.message)
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine);
    }
}
