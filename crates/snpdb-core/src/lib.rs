// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod domain;
mod errors;

use sha2::{Digest, Sha256};

pub const CRATE_NAME: &str = "snpdb-core";

pub const ENV_SNPDB_LOG_LEVEL: &str = "SNPDB_LOG_LEVEL";
pub const ENV_SNPDB_LOG_JSON: &str = "SNPDB_LOG_JSON";
pub const ENV_SNPDB_CONFIG: &str = "SNPDB_CONFIG";
pub const ENV_SNPDB_DATABASE: &str = "SNPDB_DATABASE";

pub use domain::config::{
    resolve_snpdb_config_path, SnpdbConfig, DEFAULT_DATABASE_FILE, DEFAULT_GENOTYPE_BLOCK_SIZE,
    DEFAULT_MARKER_CHUNK_SIZE,
};
pub use errors::{ConfigPathScope, Error, ErrorCode, ExitCode, MachineError, Result, ERROR_CODES};

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
