// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Import pipeline: identity resolution, chunked marker lists, genotype
//! blocks and individual association, plus the file format adapters.

mod allocator;
mod association;
mod chunks;
mod codec;
mod decision;
mod error;
pub mod formats;
mod import;
mod logging;
mod resolver;

pub const CRATE_NAME: &str = "snpdb-ingest";

pub use allocator::IdAllocator;
pub use association::{associate_sample, delete_individual, Association, DeletionReport};
pub use chunks::{build_chunks, locate, read_chunks, write_chunks, MarkerLists};
pub use codec::{decode_sample, encode_sample, sort_order, validate_lengths};
pub use decision::{
    ConflictKind, ConflictPrompt, Decision, DecisionHandler, DecisionOptions, ResolutionStrategy,
};
pub use error::ImportError;
pub use formats::{FormatError, FormatErrorCode, FormatId};
pub use import::{
    import_map, import_samples, ImportOutcome, MapImportReport, SampleImportReport, StorageLayout,
};
pub use logging::{ImportEvent, ImportLog, ImportStage};
pub use resolver::{resolve_markers, MarkerPolicy, Resolution, ResolvedMarker};
