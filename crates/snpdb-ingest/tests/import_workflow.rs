// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use snpdb_ingest::formats::{open_map_reader, open_sample_reader};
use snpdb_ingest::{
    delete_individual, import_map, import_samples, read_chunks, ConflictPrompt, Decision,
    FormatId, ImportError, ImportOutcome, MapImportReport, MarkerPolicy, ResolutionStrategy,
    StorageLayout,
};
use snpdb_model::{
    GenotypeBlock, IndividualFilter, MapName, MarkerFilter, MarkerId, SampleFilter, SampleKey,
};
use snpdb_store::{DocumentStore, MemoryStore, SqliteStore};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn map_name(raw: &str) -> MapName {
    MapName::parse(raw).expect("map name")
}

fn write_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write fixture");
    path
}

fn layout() -> StorageLayout {
    StorageLayout::new(2, 2).expect("layout")
}

fn import_0125_map<S: DocumentStore + ?Sized>(
    store: &S,
    path: &Path,
    name: &str,
    policy: MarkerPolicy,
) -> Result<ImportOutcome<MapImportReport>, ImportError> {
    let mut reader = open_map_reader(FormatId::Zero125, path).expect("open map");
    import_map(
        store,
        layout(),
        reader.as_mut(),
        &map_name(name),
        policy,
        &mut ResolutionStrategy::FailFast,
    )
}

fn completed(outcome: ImportOutcome<MapImportReport>) -> MapImportReport {
    match outcome {
        ImportOutcome::Completed(report) => report,
        ImportOutcome::Aborted => panic!("import aborted"),
    }
}

fn all_blocks<S: DocumentStore + ?Sized>(store: &S, map: &str, sample: &str) -> Vec<GenotypeBlock> {
    store
        .find_blocks(&SampleKey::new(map_name(map), sample))
        .expect("blocks")
}

#[test]
fn create_always_new_assigns_sequential_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let map = write_file(&dir, "m1.txt", "Name Chr Pos\nrs1 1 100\nrs2 1 200\nrs3 2 100\n");
    let store = MemoryStore::new();

    let report = completed(
        import_0125_map(&store, &map, "M1", MarkerPolicy::CreateAlwaysNew).expect("import"),
    );
    assert_eq!(report.marker_count, 3);
    assert_eq!((report.new_markers, report.reused_markers), (3, 0));
    assert_eq!(report.chunks, 2);
    assert_eq!(report.format, "0125");

    let doc = store.get_map(&map_name("M1")).expect("get").expect("map");
    let lists = read_chunks(&store, &doc).expect("chunks");
    assert_eq!(lists.original, vec![MarkerId(0), MarkerId(1), MarkerId(2)]);
    assert_eq!(lists.sorted, lists.original);
    assert!(report
        .events
        .iter()
        .any(|e| e.name == "import.map.complete"));
}

#[test]
fn use_existing_reuses_marker_across_maps() {
    let dir = tempfile::tempdir().expect("tempdir");
    let m1 = write_file(&dir, "m1.txt", "h\nrs1 1 100\nrs2 1 200\nrs3 2 100\n");
    let m2 = write_file(&dir, "m2.txt", "h\nother 1 100\nrs9 9 900\n");
    let store = SqliteStore::open_in_memory().expect("store");

    completed(import_0125_map(&store, &m1, "M1", MarkerPolicy::CreateAlwaysNew).expect("m1"));
    let report = completed(
        import_0125_map(&store, &m2, "M2", MarkerPolicy::UseExistingWhenAvailable).expect("m2"),
    );
    assert_eq!((report.new_markers, report.reused_markers), (1, 1));

    let reused = store
        .find_markers(&MarkerFilter {
            id: Some(MarkerId(0)),
            ..MarkerFilter::default()
        })
        .expect("find");
    assert_eq!(reused[0].maps, vec![map_name("M1"), map_name("M2")]);

    let doc = store.get_map(&map_name("M2")).expect("get").expect("map");
    // ids 3..5 were reserved for M2; the first record reused marker 0, so 4 stays unused
    assert_eq!(
        read_chunks(&store, &doc).expect("chunks").original,
        vec![MarkerId(0), MarkerId(3)]
    );
}

#[test]
fn duplicate_map_name_changes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let map = write_file(&dir, "m1.txt", "h\nrs1 1 100\n");
    let store = MemoryStore::new();
    completed(import_0125_map(&store, &map, "M1", MarkerPolicy::Ask).expect("first"));
    let before = store.mutation_count().expect("count");

    let err = import_0125_map(&store, &map, "M1", MarkerPolicy::Ask).expect_err("duplicate");
    assert!(matches!(err, ImportError::Uniqueness(_)));
    assert_eq!(store.mutation_count().expect("count"), before);
}

#[test]
fn abort_during_resolution_writes_no_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let m1 = write_file(&dir, "m1.txt", "h\nrs1 1 100\n");
    let m2 = write_file(&dir, "m2.txt", "h\nrs1b 1 100\n");
    let store = MemoryStore::new();
    completed(import_0125_map(&store, &m1, "M1", MarkerPolicy::Ask).expect("m1"));

    let mut handler = |_: &ConflictPrompt| Decision::Abort;
    let mut reader = open_map_reader(FormatId::Zero125, &m2).expect("open");
    let outcome = import_map(
        &store,
        layout(),
        reader.as_mut(),
        &map_name("M2"),
        MarkerPolicy::Ask,
        &mut ResolutionStrategy::Prompt(&mut handler),
    )
    .expect("import");
    assert_eq!(outcome, ImportOutcome::Aborted);
    assert!(store.get_map(&map_name("M2")).expect("get").is_none());
    assert_eq!(
        store.find_markers(&MarkerFilter::default()).expect("find").len(),
        1
    );
}

#[test]
fn fail_fast_conflict_maps_to_user_abort_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let m1 = write_file(&dir, "m1.txt", "h\nrs1 1 100\n");
    let store = MemoryStore::new();
    completed(import_0125_map(&store, &m1, "M1", MarkerPolicy::Ask).expect("m1"));
    let err = import_0125_map(&store, &m1, "M2", MarkerPolicy::Ask).expect_err("conflict");
    assert!(matches!(err, ImportError::DecisionRequired(_)));
    assert_eq!(err.error_code(), snpdb_core::ErrorCode::UserAborted);
}

#[test]
fn short_genotype_fails_before_any_block_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let map = write_file(&dir, "m1.txt", "h\nrs1 1 100\nrs2 1 200\nrs3 2 100\n");
    let samples = write_file(&dir, "s.txt", "ID Genotype\nS1 012\nS2 01\nS3 210\n");
    let store = MemoryStore::new();
    completed(import_0125_map(&store, &map, "M1", MarkerPolicy::CreateAlwaysNew).expect("map"));

    let mut reader = open_sample_reader(FormatId::Zero125, &samples).expect("open");
    let err = import_samples(
        &store,
        reader.as_mut(),
        &map_name("M1"),
        &BTreeMap::new(),
        &mut ResolutionStrategy::FailFast,
    )
    .expect_err("length mismatch");
    assert!(matches!(err, ImportError::Validation(_)));

    // S1 stays committed, S2 and S3 never reach the store
    assert_eq!(all_blocks(&store, "M1", "S1").len(), 2);
    assert!(all_blocks(&store, "M1", "S2").is_empty());
    let stored = store.find_samples(&SampleFilter::default()).expect("samples");
    assert_eq!(stored.len(), 1);
}

#[test]
fn unknown_map_and_duplicate_sample_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let map = write_file(&dir, "m1.txt", "h\nrs1 1 100\n");
    let samples = write_file(&dir, "s.txt", "h\nS1 0\n");
    let store = MemoryStore::new();

    let mut reader = open_sample_reader(FormatId::Zero125, &samples).expect("open");
    let err = import_samples(
        &store,
        reader.as_mut(),
        &map_name("NOPE"),
        &BTreeMap::new(),
        &mut ResolutionStrategy::FailFast,
    )
    .expect_err("missing map");
    assert!(matches!(err, ImportError::NotFound(_)));

    completed(import_0125_map(&store, &map, "M1", MarkerPolicy::Ask).expect("map"));
    for expect_ok in [true, false] {
        let mut reader = open_sample_reader(FormatId::Zero125, &samples).expect("open");
        let result = import_samples(
            &store,
            reader.as_mut(),
            &map_name("M1"),
            &BTreeMap::new(),
            &mut ResolutionStrategy::FailFast,
        );
        if expect_ok {
            assert_eq!(result.expect("first import").samples, 1);
        } else {
            assert!(matches!(result, Err(ImportError::Uniqueness(_))));
        }
    }
}

#[test]
fn plink_import_links_individuals_and_cascades_delete() {
    let store = SqliteStore::open_in_memory().expect("store");
    let mut map_reader = open_map_reader(FormatId::Plink, &fixture("panel.map")).expect("map");
    let report = completed(
        import_map(
            &store,
            layout(),
            map_reader.as_mut(),
            &map_name("PANEL"),
            MarkerPolicy::Ask,
            &mut ResolutionStrategy::FailFast,
        )
        .expect("import map"),
    );
    assert_eq!(report.format, "PLINK");
    let dist = store
        .find_markers(&MarkerFilter {
            name: Some("rs12".to_string()),
            ..MarkerFilter::default()
        })
        .expect("find");
    assert_eq!(dist[0].extra["dist"], serde_json::json!(5));

    let ids: BTreeMap<String, String> = fs::read_to_string(fixture("panel.ids"))
        .expect("ids")
        .lines()
        .filter_map(|l| l.split_once(' '))
        .map(|(s, t)| (s.to_string(), t.to_string()))
        .collect();
    let mut sample_reader =
        open_sample_reader(FormatId::Plink, &fixture("panel.ped")).expect("ped");
    let samples = import_samples(
        &store,
        sample_reader.as_mut(),
        &map_name("PANEL"),
        &ids,
        &mut ResolutionStrategy::FailFast,
    )
    .expect("import samples");
    assert_eq!(samples.samples, 2);
    assert_eq!(samples.blocks, 4);
    assert_eq!(samples.individuals_created, 2);

    let owner = store
        .find_individuals(&IndividualFilter::by_tatoo("T-100"))
        .expect("individuals");
    assert_eq!(owner.len(), 1);
    let report = delete_individual(&store, owner[0].id).expect("delete");
    assert_eq!(
        (report.genotype_blocks, report.samples, report.individuals),
        (2, 1, 1)
    );
    assert!(all_blocks(&store, "PANEL", "P1").is_empty());
    assert_eq!(all_blocks(&store, "PANEL", "P2").len(), 2);
}
