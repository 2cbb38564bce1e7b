// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use snpdb_ingest::formats::{MapWriter, SampleWriter};
use snpdb_ingest::{decode_sample, read_chunks};
use snpdb_model::{
    MapName, MarkerFilter, MarkerId, MarkerRecord, SampleFilter, SampleKey, SampleRecord,
};
use snpdb_store::DocumentStore;
use tracing::info;

use crate::lookup::require_map;
use crate::{QueryError, QueryErrorCode};

/// The map's markers in import order, duplicates included.
pub fn map_records<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapName,
) -> Result<Vec<MarkerRecord>, QueryError> {
    let doc = require_map(store, map)?;
    let lists = read_chunks(store, &doc)?;
    let filter = MarkerFilter {
        map: Some(map.clone()),
        ..MarkerFilter::default()
    };
    let by_id: BTreeMap<MarkerId, MarkerRecord> = store
        .find_markers(&filter)?
        .into_iter()
        .map(|m| (m.id, m.to_record()))
        .collect();
    lists
        .original
        .iter()
        .map(|id| {
            by_id.get(id).cloned().ok_or_else(|| {
                QueryError::new(
                    QueryErrorCode::Integrity,
                    format!("map `{map}` lists marker {id} which is not a member"),
                )
            })
        })
        .collect()
}

/// Decoded samples of `map`. An empty `sample_ids` selects every sample of the map.
pub fn sample_records<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapName,
    sample_ids: &[String],
) -> Result<Vec<SampleRecord>, QueryError> {
    let doc = require_map(store, map)?;
    let lists = read_chunks(store, &doc)?;
    let selected: Vec<String> = if sample_ids.is_empty() {
        let filter = SampleFilter {
            sample_id: None,
            map: Some(map.clone()),
        };
        store
            .find_samples(&filter)?
            .into_iter()
            .map(|s| s.sample_id)
            .collect()
    } else {
        sample_ids.to_vec()
    };

    let mut out = Vec::with_capacity(selected.len());
    for sample_id in selected {
        let key = SampleKey::new(map.clone(), sample_id.clone());
        let Some(sample) = store.get_sample(&key)? else {
            return Err(QueryError::not_found(format!("sample {key}")));
        };
        let blocks = store.find_blocks(&key)?;
        let fields = decode_sample(&doc, &sample_id, &blocks, &lists.original)?;
        out.push(SampleRecord {
            sample_id,
            attributes: sample.attributes,
            fields,
        });
    }
    Ok(out)
}

/// Writes the map through `writer`; returns the number of markers written.
pub fn export_map<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapName,
    writer: &mut dyn MapWriter,
) -> Result<usize, QueryError> {
    let records = map_records(store, map)?;
    writer.write_map(&records)?;
    info!(%map, markers = records.len(), "map exported");
    Ok(records.len())
}

/// Writes the selected samples through `writer`; returns the number written.
pub fn export_samples<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapName,
    sample_ids: &[String],
    writer: &mut dyn SampleWriter,
) -> Result<usize, QueryError> {
    let samples = sample_records(store, map, sample_ids)?;
    writer.write_samples(&samples)?;
    info!(%map, samples = samples.len(), "samples exported");
    Ok(samples.len())
}
