// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use snpdb_ingest::{decode_sample, locate, read_chunks};
use snpdb_model::{FieldValues, MapDoc, MapName, MarkerId, SampleKey};
use snpdb_store::DocumentStore;
use tracing::debug;

use crate::{QueryError, QueryErrorCode};

/// Every stored field of one sample at one marker, or `None` when the map,
/// marker or block is absent.
pub fn lookup<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapName,
    sample_id: &str,
    marker: MarkerId,
) -> Result<Option<BTreeMap<String, String>>, QueryError> {
    let Some(doc) = store.get_map(map)? else {
        debug!(%map, "lookup on unknown map");
        return Ok(None);
    };
    let Some(position) = locate(store, &doc, marker)? else {
        return Ok(None);
    };
    let block_size = doc.block_size.max(1);
    let block_number = position / block_size;
    let offset = (position % block_size) as usize;
    let key = SampleKey::new(map.clone(), sample_id);
    let Some(block) = store.find_block(&key, block_number)? else {
        return Ok(None);
    };

    let mut out = BTreeMap::new();
    for (name, field) in &block.fields {
        let Some(value) = field.value_at(offset) else {
            return Err(QueryError::new(
                QueryErrorCode::Integrity,
                format!("block {block_number} of {key} has no `{name}` value at offset {offset}"),
            ));
        };
        out.insert(name.clone(), value);
    }
    Ok(Some(out))
}

pub(crate) fn require_map<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapName,
) -> Result<MapDoc, QueryError> {
    store
        .get_map(map)?
        .ok_or_else(|| QueryError::not_found(format!("map `{map}`")))
}

/// Full genotype of one sample, fields in map file order.
pub fn sample_genotype<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapName,
    sample_id: &str,
) -> Result<BTreeMap<String, FieldValues>, QueryError> {
    let doc = require_map(store, map)?;
    let key = SampleKey::new(map.clone(), sample_id);
    if store.get_sample(&key)?.is_none() {
        return Err(QueryError::not_found(format!("sample {key}")));
    }
    let lists = read_chunks(store, &doc)?;
    let blocks = store.find_blocks(&key)?;
    Ok(decode_sample(&doc, sample_id, &blocks, &lists.original)?)
}
