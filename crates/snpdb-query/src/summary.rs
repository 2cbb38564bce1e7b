// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use snpdb_model::{FileFilter, FileMeta, Individual, IndividualFilter, Sample};
use snpdb_store::{BlobStore, DocumentStore, Store};

use crate::QueryError;

/// Everything stored about one individual.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualSummary {
    pub individual: Individual,
    pub samples: Vec<Sample>,
    pub files: Vec<FileMeta>,
}

pub fn summarize_individual<S: Store + ?Sized>(
    store: &S,
    individual: Individual,
) -> Result<IndividualSummary, QueryError> {
    let mut samples = Vec::with_capacity(individual.samples.len());
    for key in &individual.samples {
        // a dangling key is reported by omission
        if let Some(sample) = store.get_sample(key)? {
            samples.push(sample);
        }
    }
    let files = store.list_files(&FileFilter {
        individual: Some(individual.id.to_string()),
        name: None,
    })?;
    Ok(IndividualSummary {
        individual,
        samples,
        files,
    })
}

/// Summaries of every individual matching `filter`.
pub fn summarize<S: Store + ?Sized>(
    store: &S,
    filter: &IndividualFilter,
) -> Result<Vec<IndividualSummary>, QueryError> {
    DocumentStore::find_individuals(store, filter)?
        .into_iter()
        .map(|individual| summarize_individual(store, individual))
        .collect()
}
