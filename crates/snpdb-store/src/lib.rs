// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Storage adapters for snpdb: typed document collections plus a blob store.

mod contracts;
mod error;
mod memory;
mod sqlite;

pub use contracts::{BlobStore, DocumentStore, Store};
pub use error::{StoreError, StoreErrorCode};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, SQLITE_SCHEMA_VERSION};

pub const CRATE_NAME: &str = "snpdb-store";
