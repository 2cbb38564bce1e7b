// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use snpdb_core::sha256_hex;
use snpdb_model::{
    Attributes, FileFilter, FileId, FileMeta, GenotypeBlock, Individual, IndividualFilter,
    IndividualId, MapDoc, MapFilter, MapMarkerChunk, MapName, Marker, MarkerFilter, MarkerId,
    Sample, SampleFilter, SampleKey, COUNTER_DOMAINS, COUNTER_FILES,
};

use crate::{BlobStore, DocumentStore, StoreError, StoreErrorCode};

#[derive(Default)]
struct MemoryState {
    counters: BTreeMap<String, u64>,
    markers: BTreeMap<MarkerId, Marker>,
    maps: BTreeMap<MapName, MapDoc>,
    chunks: BTreeMap<(MapName, u64), MapMarkerChunk>,
    samples: BTreeMap<SampleKey, Sample>,
    blocks: BTreeMap<(SampleKey, u64), GenotypeBlock>,
    individuals: BTreeMap<IndividualId, Individual>,
    files: BTreeMap<FileId, (FileMeta, Vec<u8>)>,
    mutations: u64,
}

/// In-process backend. Every call takes one mutex, so counter increments are atomic.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        for domain in COUNTER_DOMAINS {
            state.counters.insert(domain.to_string(), 0);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Number of successful mutating calls so far, counter increments included.
    pub fn mutation_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.mutations)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::new(StoreErrorCode::Internal, "memory store mutex poisoned"))
    }
}

impl DocumentStore for MemoryStore {
    fn increment_counter(&self, domain: &str, by: u64) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let slot = state
            .counters
            .get_mut(domain)
            .ok_or_else(|| StoreError::not_found(format!("counter `{domain}` is not provisioned")))?;
        let previous = *slot;
        *slot = previous.checked_add(by).ok_or_else(|| {
            StoreError::new(StoreErrorCode::Internal, format!("counter `{domain}` overflow"))
        })?;
        state.mutations += 1;
        Ok(previous)
    }

    fn insert_markers(&self, markers: &[Marker]) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(dup) = markers.iter().find(|m| state.markers.contains_key(&m.id)) {
            return Err(StoreError::conflict(format!("marker {} already exists", dup.id)));
        }
        for marker in markers {
            state.markers.insert(marker.id, marker.clone());
        }
        state.mutations += 1;
        Ok(())
    }

    fn find_markers(&self, filter: &MarkerFilter) -> Result<Vec<Marker>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .markers
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    fn append_marker_map(&self, ids: &[MarkerId], map: &MapName) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let mut matched = 0;
        for id in ids {
            if let Some(marker) = state.markers.get_mut(id) {
                marker.add_map(map);
                matched += 1;
            }
        }
        state.mutations += 1;
        Ok(matched)
    }

    fn insert_map(&self, map: &MapDoc) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.maps.contains_key(&map.name) {
            return Err(StoreError::conflict(format!("map `{}` already exists", map.name)));
        }
        state.maps.insert(map.name.clone(), map.clone());
        state.mutations += 1;
        Ok(())
    }

    fn find_maps(&self, filter: &MapFilter) -> Result<Vec<MapDoc>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .maps
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    fn insert_chunks(&self, chunks: &[MapMarkerChunk]) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        for chunk in chunks {
            let key = (chunk.map.clone(), chunk.chunk_index);
            if state.chunks.contains_key(&key) {
                return Err(StoreError::conflict(format!(
                    "chunk {} of map `{}` already exists",
                    chunk.chunk_index, chunk.map
                )));
            }
            state.chunks.insert(key, chunk.clone());
        }
        state.mutations += 1;
        Ok(())
    }

    fn find_chunk(
        &self,
        map: &MapName,
        chunk_index: u64,
    ) -> Result<Option<MapMarkerChunk>, StoreError> {
        let state = self.lock()?;
        Ok(state.chunks.get(&(map.clone(), chunk_index)).cloned())
    }

    fn find_chunks(&self, map: &MapName) -> Result<Vec<MapMarkerChunk>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .chunks
            .range((map.clone(), 0)..=(map.clone(), u64::MAX))
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }

    fn insert_sample(&self, sample: &Sample) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let key = sample.key();
        if state.samples.contains_key(&key) {
            return Err(StoreError::conflict(format!("sample `{key}` already exists")));
        }
        state.samples.insert(key, sample.clone());
        state.mutations += 1;
        Ok(())
    }

    fn find_samples(&self, filter: &SampleFilter) -> Result<Vec<Sample>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .samples
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    fn delete_samples(&self, keys: &[SampleKey]) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let deleted = keys
            .iter()
            .filter(|key| state.samples.remove(*key).is_some())
            .count() as u64;
        state.mutations += 1;
        Ok(deleted)
    }

    fn insert_blocks(&self, blocks: &[GenotypeBlock]) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        for block in blocks {
            let key = (
                SampleKey::new(block.map.clone(), block.sample_id.clone()),
                block.block_number,
            );
            if state.blocks.contains_key(&key) {
                return Err(StoreError::conflict(format!(
                    "block {} of sample `{}` already exists",
                    key.1, key.0
                )));
            }
            state.blocks.insert(key, block.clone());
        }
        state.mutations += 1;
        Ok(())
    }

    fn find_block(
        &self,
        key: &SampleKey,
        block_number: u64,
    ) -> Result<Option<GenotypeBlock>, StoreError> {
        let state = self.lock()?;
        Ok(state.blocks.get(&(key.clone(), block_number)).cloned())
    }

    fn find_blocks(&self, key: &SampleKey) -> Result<Vec<GenotypeBlock>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .blocks
            .range((key.clone(), 0)..=(key.clone(), u64::MAX))
            .map(|(_, block)| block.clone())
            .collect())
    }

    fn delete_blocks(&self, keys: &[SampleKey]) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let before = state.blocks.len();
        state.blocks.retain(|(key, _), _| !keys.contains(key));
        let deleted = (before - state.blocks.len()) as u64;
        state.mutations += 1;
        Ok(deleted)
    }

    fn insert_individual(&self, individual: &Individual) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.individuals.contains_key(&individual.id) {
            return Err(StoreError::conflict(format!(
                "individual {} already exists",
                individual.id
            )));
        }
        if let Some(key) = individual
            .samples
            .iter()
            .find(|key| state.individuals.values().any(|other| other.owns(key)))
        {
            return Err(StoreError::conflict(format!(
                "sample `{key}` already belongs to an individual"
            )));
        }
        state.individuals.insert(individual.id, individual.clone());
        state.mutations += 1;
        Ok(())
    }

    fn find_individuals(&self, filter: &IndividualFilter) -> Result<Vec<Individual>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .individuals
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    fn append_individual_sample(
        &self,
        id: IndividualId,
        key: &SampleKey,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(owner) = state.individuals.values().find(|i| i.owns(key)) {
            if owner.id == id {
                return Ok(());
            }
            return Err(StoreError::conflict(format!(
                "sample `{key}` already belongs to individual {}",
                owner.id
            )));
        }
        let individual = state
            .individuals
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("individual {id} not found")))?;
        individual.samples.push(key.clone());
        state.mutations += 1;
        Ok(())
    }

    fn delete_individual(&self, id: IndividualId) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let deleted = u64::from(state.individuals.remove(&id).is_some());
        state.mutations += 1;
        Ok(deleted)
    }
}

impl BlobStore for MemoryStore {
    fn put_file(
        &self,
        bytes: &[u8],
        filename: &str,
        individual: Option<&str>,
        attributes: Attributes,
    ) -> Result<FileId, StoreError> {
        let id = FileId(self.increment_counter(COUNTER_FILES, 1)?);
        let meta = FileMeta {
            id,
            filename: filename.to_string(),
            individual: individual.map(str::to_string),
            length: bytes.len() as u64,
            sha256: sha256_hex(bytes),
            attributes,
        };
        let mut state = self.lock()?;
        state.files.insert(id, (meta, bytes.to_vec()));
        state.mutations += 1;
        Ok(id)
    }

    fn get_file(&self, id: FileId) -> Result<(FileMeta, Vec<u8>), StoreError> {
        let state = self.lock()?;
        state
            .files
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("file {id} not found")))
    }

    fn list_files(&self, filter: &FileFilter) -> Result<Vec<FileMeta>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .files
            .values()
            .map(|(meta, _)| meta)
            .filter(|meta| filter.matches(meta))
            .cloned()
            .collect())
    }
}
