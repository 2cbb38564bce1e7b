// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Document, record and filter types shared by the snpdb store, ingest and query crates.

use std::fmt::{Display, Formatter};

mod filter;
mod genotype;
mod ids;
mod individual;
mod map;
mod marker;
pub mod serde_helpers;

pub use filter::{FileFilter, IndividualFilter, MapFilter, MarkerFilter, SampleFilter};
pub use genotype::{BlockField, FieldValues, GenotypeBlock, Sample, SampleRecord};
pub use ids::{
    validate_sample_id, FileId, IndividualId, MapName, MarkerId, SampleKey, MAP_NAME_MAX_LEN,
    SAMPLE_ID_MAX_LEN,
};
pub use individual::{FileMeta, Individual};
pub use map::{MapDoc, MapMarkerChunk};
pub use marker::{compare_chromosomes, Marker, MarkerRecord};
pub use serde_helpers::Attributes;

pub const CRATE_NAME: &str = "snpdb-model";

/// Counter domains provisioned in every store.
pub const COUNTER_MARKERS: &str = "markers";
pub const COUNTER_INDIVIDUALS: &str = "individuals";
pub const COUNTER_FILES: &str = "files";
pub const COUNTER_DOMAINS: [&str; 3] = [COUNTER_MARKERS, COUNTER_INDIVIDUALS, COUNTER_FILES];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}
