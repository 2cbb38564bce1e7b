// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Read side of snpdb: single-genotype lookup, filtered searches, format
//! export, file attachments and per-individual summaries.

mod attachments;
mod export;
mod lookup;
mod query_error;
mod search;
mod summary;

pub const CRATE_NAME: &str = "snpdb-query";

pub use attachments::{attach_file, download_files, fetch_file};
pub use export::{export_map, export_samples, map_records, sample_records};
pub use lookup::{lookup, sample_genotype};
pub use query_error::{QueryError, QueryErrorCode};
pub use search::{
    find_files, find_individuals, find_maps, find_markers, find_samples, validate_marker_filter,
};
pub use summary::{summarize, summarize_individual, IndividualSummary};
