// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use snpdb_core::{ErrorCode, SnpdbConfig, ENV_SNPDB_LOG_JSON, ENV_SNPDB_LOG_LEVEL};
use snpdb_model::MapName;
use snpdb_store::SqliteStore;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{CliError, LogFlags, OutputMode};

pub(crate) fn emit_ok(output_mode: OutputMode, payload: Value) -> Result<(), CliError> {
    if output_mode.json {
        println!(
            "{}",
            serde_json::to_string(&payload).map_err(|e| CliError::internal(e.to_string()))?
        );
    } else if !output_mode.quiet {
        println!(
            "{}",
            serde_json::to_string_pretty(&payload)
                .map_err(|e| CliError::internal(e.to_string()))?
        );
    }
    Ok(())
}

fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

/// Logs go to stderr so stdout stays machine-readable.
pub(crate) fn init_tracing(flags: LogFlags) {
    let filter = if flags.verbose > 0 {
        EnvFilter::new("debug")
    } else if flags.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_env(ENV_SNPDB_LOG_LEVEL).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if env_bool(ENV_SNPDB_LOG_JSON) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if installed.is_err() {
        debug!("tracing subscriber already installed");
    }
}

pub(crate) fn load_config(
    explicit: Option<&Path>,
    db_override: Option<&Path>,
) -> Result<SnpdbConfig, CliError> {
    let mut config = SnpdbConfig::load(explicit)
        .map_err(|e| CliError::coded(ErrorCode::ConfigError, e.to_string()))?;
    if let Some(db) = db_override {
        config.database = db.to_path_buf();
    }
    Ok(config)
}

pub(crate) fn open_store(config: &SnpdbConfig) -> Result<SqliteStore, CliError> {
    debug!(database = %config.database.display(), "opening store");
    Ok(SqliteStore::open(&config.database)?)
}

pub(crate) fn parse_map_name(raw: &str) -> Result<MapName, CliError> {
    MapName::parse(raw).map_err(|e| CliError::coded(ErrorCode::ValidationError, e.0))
}

/// Reads `sample tatoo` pairs, one per non-blank line.
pub(crate) fn read_idfile(path: &Path) -> Result<BTreeMap<String, String>, CliError> {
    let text = fs::read_to_string(path).map_err(|e| {
        CliError::coded(
            ErrorCode::FormatError,
            format!("failed to read {}: {e}", path.display()),
        )
    })?;
    let mut tatoos = BTreeMap::new();
    for (idx, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => {}
            [sample, tatoo] => {
                tatoos.insert((*sample).to_string(), (*tatoo).to_string());
            }
            _ => {
                return Err(CliError::coded(
                    ErrorCode::FormatError,
                    format!(
                        "{}:{}: expected `sample tatoo`, got {} field(s)",
                        path.display(),
                        idx + 1,
                        fields.len()
                    ),
                ))
            }
        }
    }
    Ok(tatoos)
}
