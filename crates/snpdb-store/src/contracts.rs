// SPDX-License-Identifier: Apache-2.0

use snpdb_model::{
    Attributes, FileFilter, FileId, FileMeta, GenotypeBlock, Individual, IndividualFilter,
    IndividualId, MapDoc, MapFilter, MapMarkerChunk, MapName, Marker, MarkerFilter, MarkerId,
    Sample, SampleFilter, SampleKey,
};

use crate::StoreError;

/// Typed per-collection operations over the marker/genotype documents.
///
/// Only `increment_counter` is atomic across callers. Batch operations are
/// applied in order and are not atomic as a group.
pub trait DocumentStore {
    /// Adds `by` to the named counter and returns its previous value.
    fn increment_counter(&self, domain: &str, by: u64) -> Result<u64, StoreError>;

    /// Fails with `Conflict` when any id already exists.
    fn insert_markers(&self, markers: &[Marker]) -> Result<(), StoreError>;
    fn find_markers(&self, filter: &MarkerFilter) -> Result<Vec<Marker>, StoreError>;
    /// Appends `map` to each listed marker's membership; returns how many markers matched.
    fn append_marker_map(&self, ids: &[MarkerId], map: &MapName) -> Result<u64, StoreError>;

    /// Fails with `Conflict` when the name is taken.
    fn insert_map(&self, map: &MapDoc) -> Result<(), StoreError>;
    fn find_maps(&self, filter: &MapFilter) -> Result<Vec<MapDoc>, StoreError>;

    fn insert_chunks(&self, chunks: &[MapMarkerChunk]) -> Result<(), StoreError>;
    fn find_chunk(
        &self,
        map: &MapName,
        chunk_index: u64,
    ) -> Result<Option<MapMarkerChunk>, StoreError>;
    /// All chunks of a map ordered by `chunk_index`.
    fn find_chunks(&self, map: &MapName) -> Result<Vec<MapMarkerChunk>, StoreError>;

    /// Fails with `Conflict` when the (map, sample_id) key exists.
    fn insert_sample(&self, sample: &Sample) -> Result<(), StoreError>;
    fn find_samples(&self, filter: &SampleFilter) -> Result<Vec<Sample>, StoreError>;
    fn delete_samples(&self, keys: &[SampleKey]) -> Result<u64, StoreError>;

    fn insert_blocks(&self, blocks: &[GenotypeBlock]) -> Result<(), StoreError>;
    fn find_block(
        &self,
        key: &SampleKey,
        block_number: u64,
    ) -> Result<Option<GenotypeBlock>, StoreError>;
    /// All blocks of a sample ordered by `block_number`.
    fn find_blocks(&self, key: &SampleKey) -> Result<Vec<GenotypeBlock>, StoreError>;
    fn delete_blocks(&self, keys: &[SampleKey]) -> Result<u64, StoreError>;

    fn insert_individual(&self, individual: &Individual) -> Result<(), StoreError>;
    fn find_individuals(&self, filter: &IndividualFilter) -> Result<Vec<Individual>, StoreError>;
    /// Fails with `NotFound` for an unknown id and `Conflict` when another
    /// individual already owns the key.
    fn append_individual_sample(
        &self,
        id: IndividualId,
        key: &SampleKey,
    ) -> Result<(), StoreError>;
    fn delete_individual(&self, id: IndividualId) -> Result<u64, StoreError>;

    fn get_map(&self, name: &MapName) -> Result<Option<MapDoc>, StoreError> {
        let filter = MapFilter {
            name: Some(name.clone()),
            ..MapFilter::default()
        };
        Ok(self.find_maps(&filter)?.into_iter().next())
    }

    fn get_sample(&self, key: &SampleKey) -> Result<Option<Sample>, StoreError> {
        let filter = SampleFilter {
            sample_id: Some(key.sample_id.clone()),
            map: Some(key.map.clone()),
        };
        Ok(self.find_samples(&filter)?.into_iter().next())
    }

    fn get_individual(&self, id: IndividualId) -> Result<Option<Individual>, StoreError> {
        let filter = IndividualFilter {
            id: Some(id),
            ..IndividualFilter::default()
        };
        Ok(self.find_individuals(&filter)?.into_iter().next())
    }
}

/// Raw attachments, orthogonal to the marker/genotype model.
pub trait BlobStore {
    fn put_file(
        &self,
        bytes: &[u8],
        filename: &str,
        individual: Option<&str>,
        attributes: Attributes,
    ) -> Result<FileId, StoreError>;
    /// Fails with `NotFound` for an unknown id.
    fn get_file(&self, id: FileId) -> Result<(FileMeta, Vec<u8>), StoreError>;
    fn list_files(&self, filter: &FileFilter) -> Result<Vec<FileMeta>, StoreError>;
}

/// Both halves of a backend.
pub trait Store: DocumentStore + BlobStore {}

impl<T: DocumentStore + BlobStore> Store for T {}
