// SPDX-License-Identifier: Apache-2.0

//! Map and sample import orchestration.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use snpdb_core::{SnpdbConfig, DEFAULT_GENOTYPE_BLOCK_SIZE, DEFAULT_MARKER_CHUNK_SIZE};
use snpdb_model::{
    validate_sample_id, MapDoc, MapName, Marker, MarkerId, MarkerRecord, Sample, SampleKey,
};
use snpdb_store::DocumentStore;
use tracing::{debug, warn};

use crate::association::{associate_sample, Association};
use crate::chunks::{read_chunks, write_chunks};
use crate::codec::{encode_sample, validate_lengths};
use crate::decision::ResolutionStrategy;
use crate::formats::{MapReader, SampleReader};
use crate::logging::{fields, ImportEvent, ImportLog, ImportStage};
use crate::resolver::{resolve_markers, MarkerPolicy, Resolution};
use crate::ImportError;

/// Chunk and block capacities used when a map is created. Both are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageLayout {
    pub chunk_size: usize,
    pub block_size: usize,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_MARKER_CHUNK_SIZE,
            block_size: DEFAULT_GENOTYPE_BLOCK_SIZE,
        }
    }
}

impl StorageLayout {
    pub fn new(chunk_size: usize, block_size: usize) -> Result<Self, ImportError> {
        if chunk_size == 0 || block_size == 0 {
            return Err(ImportError::Configuration(format!(
                "chunk size ({chunk_size}) and block size ({block_size}) must be at least 1"
            )));
        }
        Ok(Self {
            chunk_size,
            block_size,
        })
    }

    pub fn from_config(config: &SnpdbConfig) -> Result<Self, ImportError> {
        Self::new(config.marker_chunk_size, config.genotype_block_size)
    }
}

/// Result of an operation that a decision handler may abort without error.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome<T> {
    Completed(T),
    /// Nothing but reserved ids was written.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapImportReport {
    pub map: MapName,
    pub format: String,
    pub marker_count: u64,
    pub new_markers: u64,
    pub reused_markers: u64,
    pub chunks: u64,
    pub events: Vec<ImportEvent>,
}

/// Imports every record of `reader` as a new map named `name`.
///
/// A taken name fails before anything is read. An abort during identity
/// resolution returns [`ImportOutcome::Aborted`] with no documents written.
pub fn import_map<S, R>(
    store: &S,
    layout: StorageLayout,
    reader: &mut R,
    name: &MapName,
    policy: MarkerPolicy,
    strategy: &mut ResolutionStrategy<'_>,
) -> Result<ImportOutcome<MapImportReport>, ImportError>
where
    S: DocumentStore + ?Sized,
    R: MapReader + ?Sized,
{
    let mut log = ImportLog::default();
    let format = reader.format();
    log.emit(
        ImportStage::Prepare,
        "import.map.begin",
        fields([
            ("map", name.to_string()),
            ("format", format.label().to_string()),
            ("policy", format!("{policy:?}")),
        ]),
    );
    if store.get_map(name)?.is_some() {
        return Err(ImportError::Uniqueness(format!("map `{name}` already exists")));
    }

    let records: Vec<MarkerRecord> = (&mut *reader).collect::<Result<_, _>>()?;
    if records.len() != reader.record_count() {
        warn!(
            map = %name,
            counted = reader.record_count(),
            read = records.len(),
            "reader count differs from records read"
        );
    }

    let resolved = match resolve_markers(store, &records, policy, strategy)? {
        Resolution::Resolved(resolved) => resolved,
        Resolution::Aborted => {
            log.emit(
                ImportStage::Resolve,
                "import.map.aborted",
                fields([("map", name.to_string())]),
            );
            return Ok(ImportOutcome::Aborted);
        }
    };
    let new_markers = resolved.iter().filter(|r| r.is_new).count() as u64;
    let reused_markers = resolved.len() as u64 - new_markers;
    log.emit(
        ImportStage::Resolve,
        "import.map.resolved",
        fields([
            ("new", new_markers.to_string()),
            ("reused", reused_markers.to_string()),
        ]),
    );

    let doc = MapDoc {
        name: name.clone(),
        marker_count: records.len() as u64,
        chunk_size: layout.chunk_size as u64,
        block_size: layout.block_size as u64,
        format: format.label().to_string(),
        metadata: reader.metadata().clone(),
    };
    store.insert_map(&doc)?;

    let original: Vec<MarkerId> = resolved.iter().map(|r| r.id).collect();
    let chunks = write_chunks(store, name, &original, layout.chunk_size)?;

    let fresh: Vec<Marker> = records
        .into_iter()
        .zip(&resolved)
        .filter(|(_, r)| r.is_new)
        .map(|(record, r)| Marker::from_record(r.id, record))
        .collect();
    if !fresh.is_empty() {
        store.insert_markers(&fresh)?;
    }
    let involved: Vec<MarkerId> = original
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let updated = store.append_marker_map(&involved, name)?;
    if updated != involved.len() as u64 {
        return Err(ImportError::Integrity(format!(
            "map `{name}` references {} markers but {updated} were found",
            involved.len()
        )));
    }
    log.emit(
        ImportStage::Persist,
        "import.map.persisted",
        fields([
            ("chunks", chunks.to_string()),
            ("markers_inserted", fresh.len().to_string()),
            ("markers_linked", updated.to_string()),
        ]),
    );
    log.emit(
        ImportStage::Finalize,
        "import.map.complete",
        fields([
            ("map", name.to_string()),
            ("marker_count", doc.marker_count.to_string()),
        ]),
    );

    Ok(ImportOutcome::Completed(MapImportReport {
        map: name.clone(),
        format: doc.format,
        marker_count: doc.marker_count,
        new_markers,
        reused_markers,
        chunks,
        events: log.into_events(),
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleImportReport {
    pub map: MapName,
    pub samples: u64,
    pub blocks: u64,
    pub individuals_created: u64,
    pub individuals_updated: u64,
    pub events: Vec<ImportEvent>,
}

/// Imports every sample of `reader` into the existing map `map`.
///
/// `tatoos` maps sample ids to individual tatoos. Each sample is checked
/// before its first write; a failure stops the batch and keeps the samples
/// already imported.
pub fn import_samples<S, R>(
    store: &S,
    reader: &mut R,
    map: &MapName,
    tatoos: &BTreeMap<String, String>,
    strategy: &mut ResolutionStrategy<'_>,
) -> Result<SampleImportReport, ImportError>
where
    S: DocumentStore + ?Sized,
    R: SampleReader + ?Sized,
{
    let mut log = ImportLog::default();
    let Some(doc) = store.get_map(map)? else {
        return Err(ImportError::NotFound(format!("map `{map}`")));
    };
    log.emit(
        ImportStage::Prepare,
        "import.samples.begin",
        fields([
            ("map", map.to_string()),
            ("format", reader.format().label().to_string()),
            ("samples", reader.sample_count().to_string()),
        ]),
    );
    let lists = read_chunks(store, &doc)?;

    let mut report = SampleImportReport {
        map: map.clone(),
        samples: 0,
        blocks: 0,
        individuals_created: 0,
        individuals_updated: 0,
        events: Vec::new(),
    };
    for record in &mut *reader {
        let record = record?;
        validate_sample_id(&record.sample_id)?;
        let key = SampleKey::new(map.clone(), record.sample_id.clone());
        if store.get_sample(&key)?.is_some() {
            return Err(ImportError::Uniqueness(format!("sample {key} already exists")));
        }
        validate_lengths(&record.sample_id, &record.fields, doc.marker_count)?;

        store.insert_sample(&Sample {
            map: map.clone(),
            sample_id: record.sample_id.clone(),
            attributes: record.attributes,
        })?;
        let blocks = encode_sample(&doc, &record.sample_id, &record.fields, &lists.original)?;
        if !blocks.is_empty() {
            store.insert_blocks(&blocks)?;
        }
        report.samples += 1;
        report.blocks += blocks.len() as u64;
        debug!(sample = %key, blocks = blocks.len(), "sample stored");

        let tatoo = tatoos.get(&record.sample_id).map(String::as_str);
        match associate_sample(store, &key, tatoo, strategy)? {
            Association::Unlinked => {}
            Association::Created(id) => {
                report.individuals_created += 1;
                log.emit(
                    ImportStage::Associate,
                    "import.samples.individual_created",
                    fields([("sample", key.to_string()), ("individual", id.to_string())]),
                );
            }
            Association::Updated(id) => {
                report.individuals_updated += 1;
                log.emit(
                    ImportStage::Associate,
                    "import.samples.individual_updated",
                    fields([("sample", key.to_string()), ("individual", id.to_string())]),
                );
            }
        }
    }
    log.emit(
        ImportStage::Finalize,
        "import.samples.complete",
        fields([
            ("map", map.to_string()),
            ("samples", report.samples.to_string()),
            ("blocks", report.blocks.to_string()),
        ]),
    );
    report.events = log.into_events();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_a_configuration_error() {
        assert!(matches!(
            StorageLayout::new(0, 5),
            Err(ImportError::Configuration(_))
        ));
        assert_eq!(
            StorageLayout::new(2, 3).expect("layout"),
            StorageLayout {
                chunk_size: 2,
                block_size: 3
            }
        );
    }

    #[test]
    fn layout_follows_config_sizes() {
        let config = SnpdbConfig {
            marker_chunk_size: 7,
            genotype_block_size: 9,
            ..SnpdbConfig::default()
        };
        let layout = StorageLayout::from_config(&config).expect("layout");
        assert_eq!((layout.chunk_size, layout.block_size), (7, 9));
    }
}
