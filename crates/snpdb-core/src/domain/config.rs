// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigPathScope, Error, Result};

pub const DEFAULT_MARKER_CHUNK_SIZE: usize = 100_000;
pub const DEFAULT_GENOTYPE_BLOCK_SIZE: usize = 10_000;
pub const DEFAULT_DATABASE_FILE: &str = "snpdb.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SnpdbConfig {
    pub database: PathBuf,
    pub marker_chunk_size: usize,
    pub genotype_block_size: usize,
}

impl Default for SnpdbConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE_FILE),
            marker_chunk_size: DEFAULT_MARKER_CHUNK_SIZE,
            genotype_block_size: DEFAULT_GENOTYPE_BLOCK_SIZE,
        }
    }
}

impl SnpdbConfig {
    pub fn from_json_slice(raw: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_slice(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.marker_chunk_size == 0 {
            return Err(Error::InvalidConfig {
                key: "marker_chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.genotype_block_size == 0 {
            return Err(Error::InvalidConfig {
                key: "genotype_block_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.database.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                key: "database",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Resolves the effective configuration: explicit path, then `SNPDB_CONFIG`,
    /// then the workspace and user config files, then defaults. `SNPDB_DATABASE`
    /// always wins for the database path.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_source(explicit) {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        if let Some(database) = non_empty_env(crate::ENV_SNPDB_DATABASE) {
            config.database = PathBuf::from(database);
        }
        config.validate()?;
        Ok(config)
    }
}

fn resolve_config_source(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = non_empty_env(crate::ENV_SNPDB_CONFIG) {
        return Some(PathBuf::from(path));
    }
    [ConfigPathScope::Workspace, ConfigPathScope::User]
        .into_iter()
        .map(resolve_snpdb_config_path)
        .find(|path| path.is_file())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[must_use]
pub fn resolve_snpdb_config_path(scope: ConfigPathScope) -> PathBuf {
    match scope {
        ConfigPathScope::User => {
            if let Some(xdg_config_home) = non_empty_env("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg_config_home)
                    .join("snpdb")
                    .join("config.json");
            }
            if let Some(home) = non_empty_env("HOME") {
                return PathBuf::from(home)
                    .join(".config")
                    .join("snpdb")
                    .join("config.json");
            }
            PathBuf::from(".snpdb").join("config.json")
        }
        ConfigPathScope::Workspace => PathBuf::from(".snpdb").join("config.json"),
    }
}
