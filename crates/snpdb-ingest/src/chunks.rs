// SPDX-License-Identifier: Apache-2.0

//! Persists a map's marker id list in fixed-capacity chunks, in import order and sorted.

use snpdb_model::{MapDoc, MapMarkerChunk, MapName, MarkerId};
use snpdb_store::DocumentStore;

use crate::ImportError;

/// Splits `original` and its sorted twin into `chunk_size` slices.
#[must_use]
pub fn build_chunks(map: &MapName, original: &[MarkerId], chunk_size: usize) -> Vec<MapMarkerChunk> {
    let chunk_size = chunk_size.max(1);
    let mut sorted = original.to_vec();
    sorted.sort_unstable();
    original
        .chunks(chunk_size)
        .zip(sorted.chunks(chunk_size))
        .enumerate()
        .map(|(idx, (orig, sort))| MapMarkerChunk {
            map: map.clone(),
            chunk_index: idx as u64,
            original: orig.to_vec(),
            sorted: sort.to_vec(),
        })
        .collect()
}

/// Writes every chunk of the list; an empty list writes nothing.
pub fn write_chunks<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapName,
    original: &[MarkerId],
    chunk_size: usize,
) -> Result<u64, ImportError> {
    let chunks = build_chunks(map, original, chunk_size);
    if chunks.is_empty() {
        return Ok(0);
    }
    store.insert_chunks(&chunks)?;
    Ok(chunks.len() as u64)
}

/// Both orderings of a map's marker list, reassembled from its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkerLists {
    pub original: Vec<MarkerId>,
    pub sorted: Vec<MarkerId>,
}

pub fn read_chunks<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapDoc,
) -> Result<MarkerLists, ImportError> {
    let mut lists = MarkerLists::default();
    for (expected, chunk) in store.find_chunks(&map.name)?.into_iter().enumerate() {
        if chunk.chunk_index != expected as u64 {
            return Err(ImportError::Integrity(format!(
                "map `{}` is missing chunk {expected}",
                map.name
            )));
        }
        lists.original.extend(chunk.original);
        lists.sorted.extend(chunk.sorted);
    }
    let count = map.marker_count as usize;
    if lists.original.len() != count || lists.sorted.len() != count {
        return Err(ImportError::Integrity(format!(
            "map `{}` chunks hold {} markers but the map declares {count}",
            map.name,
            lists.original.len()
        )));
    }
    Ok(lists)
}

/// Global sorted position of the first occurrence of `id` in the map.
///
/// Scans chunks in index order, skipping any whose sorted range excludes `id`.
pub fn locate<S: DocumentStore + ?Sized>(
    store: &S,
    map: &MapDoc,
    id: MarkerId,
) -> Result<Option<u64>, ImportError> {
    for chunk_index in 0..map.chunk_count() {
        let Some(chunk) = store.find_chunk(&map.name, chunk_index)? else {
            return Err(ImportError::Integrity(format!(
                "map `{}` is missing chunk {chunk_index}",
                map.name
            )));
        };
        if !chunk.may_contain(id) {
            continue;
        }
        if let Some(offset) = chunk.sorted_offset(id) {
            return Ok(Some(chunk_index * map.chunk_size + offset as u64));
        }
    }
    Ok(None)
}
