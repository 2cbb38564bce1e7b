// SPDX-License-Identifier: Apache-2.0

//! Filtered searches over each collection. Range bounds are checked before
//! the store is consulted.

use std::cmp::Ordering;

use snpdb_model::{
    compare_chromosomes, FileFilter, FileMeta, Individual, IndividualFilter, MapDoc, MapFilter,
    Marker, MarkerFilter, Sample, SampleFilter,
};
use snpdb_store::{BlobStore, DocumentStore};

use crate::{QueryError, QueryErrorCode};

fn inverted(what: &str, min: impl std::fmt::Display, max: impl std::fmt::Display) -> QueryError {
    QueryError::new(
        QueryErrorCode::Validation,
        format!("min {what} {min} is greater than max {what} {max}"),
    )
}

pub fn validate_marker_filter(filter: &MarkerFilter) -> Result<(), QueryError> {
    if let (Some(min), Some(max)) = (filter.min_position, filter.max_position) {
        if min > max {
            return Err(inverted("position", min, max));
        }
    }
    if let (Some(min), Some(max)) = (&filter.min_chromosome, &filter.max_chromosome) {
        if compare_chromosomes(min, max) == Ordering::Greater {
            return Err(inverted("chromosome", min, max));
        }
    }
    Ok(())
}

pub fn find_markers<S: DocumentStore + ?Sized>(
    store: &S,
    filter: &MarkerFilter,
) -> Result<Vec<Marker>, QueryError> {
    validate_marker_filter(filter)?;
    Ok(store.find_markers(filter)?)
}

pub fn find_maps<S: DocumentStore + ?Sized>(
    store: &S,
    filter: &MapFilter,
) -> Result<Vec<MapDoc>, QueryError> {
    if let (Some(min), Some(max)) = (filter.min_size, filter.max_size) {
        if min > max {
            return Err(inverted("size", min, max));
        }
    }
    Ok(store.find_maps(filter)?)
}

pub fn find_samples<S: DocumentStore + ?Sized>(
    store: &S,
    filter: &SampleFilter,
) -> Result<Vec<Sample>, QueryError> {
    Ok(store.find_samples(filter)?)
}

pub fn find_individuals<S: DocumentStore + ?Sized>(
    store: &S,
    filter: &IndividualFilter,
) -> Result<Vec<Individual>, QueryError> {
    Ok(store.find_individuals(filter)?)
}

pub fn find_files<S: BlobStore + ?Sized>(
    store: &S,
    filter: &FileFilter,
) -> Result<Vec<FileMeta>, QueryError> {
    Ok(store.list_files(filter)?)
}
