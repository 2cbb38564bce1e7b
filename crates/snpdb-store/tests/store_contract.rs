// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use snpdb_model::{
    Attributes, BlockField, FileFilter, GenotypeBlock, Individual, IndividualFilter,
    IndividualId, MapDoc, MapFilter, MapMarkerChunk, MapName, Marker, MarkerFilter, MarkerId,
    MarkerRecord, Sample, SampleFilter, SampleKey, COUNTER_MARKERS,
};
use snpdb_store::{BlobStore, DocumentStore, MemoryStore, SqliteStore, Store, StoreErrorCode};
use tempfile::tempdir;

fn map_name(raw: &str) -> MapName {
    MapName::parse(raw).expect("map name")
}

fn backends() -> Vec<(&'static str, Box<dyn Store>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        (
            "sqlite",
            Box::new(SqliteStore::open_in_memory().expect("sqlite in memory")),
        ),
    ]
}

fn map_doc(name: &str, count: u64) -> MapDoc {
    MapDoc {
        name: map_name(name),
        marker_count: count,
        chunk_size: 2,
        block_size: 2,
        format: "0125".to_string(),
        metadata: Attributes::new(),
    }
}

#[test]
fn duplicate_map_names_are_conflicts() {
    for (label, store) in backends() {
        store.insert_map(&map_doc("M1", 3)).expect("first insert");
        let err = store.insert_map(&map_doc("M1", 5)).expect_err(label);
        assert_eq!(err.code, StoreErrorCode::Conflict, "{label}");
        let maps = store.find_maps(&MapFilter::default()).expect("find");
        assert_eq!(maps.len(), 1, "{label}");
        assert_eq!(maps[0].marker_count, 3, "{label}");
    }
}

#[test]
fn map_filters_apply_size_and_format() {
    for (label, store) in backends() {
        store.insert_map(&map_doc("small", 2)).expect("insert");
        store.insert_map(&map_doc("large", 50)).expect("insert");
        let filter = MapFilter {
            min_size: Some(10),
            format: Some("0125".to_string()),
            ..MapFilter::default()
        };
        let found = store.find_maps(&filter).expect("find");
        assert_eq!(found.len(), 1, "{label}");
        assert_eq!(found[0].name.as_str(), "large", "{label}");
    }
}

#[test]
fn marker_locus_queries_match_exactly() {
    for (label, store) in backends() {
        let markers = vec![
            Marker::from_record(MarkerId(0), MarkerRecord::new(Some("a"), Some("1"), Some(100))),
            Marker::from_record(MarkerId(1), MarkerRecord::new(Some("b"), Some("1"), Some(200))),
            Marker::from_record(MarkerId(2), MarkerRecord::new(Some("c"), Some("2"), Some(100))),
            Marker::from_record(MarkerId(3), MarkerRecord::new(Some("d"), Some("10"), Some(5))),
        ];
        store.insert_markers(&markers).expect("insert");
        let hits = store
            .find_markers(&MarkerFilter::at_locus("2", 100))
            .expect("find");
        assert_eq!(hits.len(), 1, "{label}");
        assert_eq!(hits[0].id, MarkerId(2), "{label}");

        let range = MarkerFilter {
            min_chromosome: Some("2".to_string()),
            ..MarkerFilter::default()
        };
        let ids: Vec<MarkerId> = store
            .find_markers(&range)
            .expect("find")
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![MarkerId(2), MarkerId(3)], "{label}");

        let err = store.insert_markers(&markers[..1]).expect_err(label);
        assert_eq!(err.code, StoreErrorCode::Conflict, "{label}");
    }
}

#[test]
fn chunks_and_blocks_come_back_in_index_order() {
    for (label, store) in backends() {
        let map = map_name("M1");
        let chunks: Vec<MapMarkerChunk> = [1_u64, 0]
            .iter()
            .map(|idx| MapMarkerChunk {
                map: map.clone(),
                chunk_index: *idx,
                original: vec![MarkerId(*idx)],
                sorted: vec![MarkerId(*idx)],
            })
            .collect();
        store.insert_chunks(&chunks).expect("chunks");
        let indices: Vec<u64> = store
            .find_chunks(&map)
            .expect("find")
            .iter()
            .map(|c| c.chunk_index)
            .collect();
        assert_eq!(indices, vec![0, 1], "{label}");
        assert!(store.find_chunk(&map, 2).expect("find").is_none(), "{label}");

        let key = SampleKey::new(map.clone(), "S1");
        let blocks: Vec<GenotypeBlock> = [2_u64, 0, 1]
            .iter()
            .map(|n| {
                let mut fields = BTreeMap::new();
                fields.insert("genotype".to_string(), BlockField::Packed(n.to_string()));
                GenotypeBlock {
                    map: map.clone(),
                    sample_id: "S1".to_string(),
                    block_number: *n,
                    fields,
                }
            })
            .collect();
        store.insert_blocks(&blocks).expect("blocks");
        let numbers: Vec<u64> = store
            .find_blocks(&key)
            .expect("find")
            .iter()
            .map(|b| b.block_number)
            .collect();
        assert_eq!(numbers, vec![0, 1, 2], "{label}");
        assert_eq!(store.delete_blocks(&[key.clone()]).expect("delete"), 3, "{label}");
        assert!(store.find_block(&key, 0).expect("find").is_none(), "{label}");
    }
}

#[test]
fn sample_keys_are_unique_and_deletable() {
    for (label, store) in backends() {
        let sample = Sample {
            map: map_name("M1"),
            sample_id: "S1".to_string(),
            attributes: Attributes::new(),
        };
        store.insert_sample(&sample).expect("insert");
        let err = store.insert_sample(&sample).expect_err(label);
        assert_eq!(err.code, StoreErrorCode::Conflict, "{label}");
        let by_id = SampleFilter {
            sample_id: Some("S1".to_string()),
            map: None,
        };
        assert_eq!(store.find_samples(&by_id).expect("find").len(), 1, "{label}");
        assert_eq!(store.delete_samples(&[sample.key()]).expect("delete"), 1, "{label}");
        assert!(store.get_sample(&sample.key()).expect("get").is_none(), "{label}");
    }
}

#[test]
fn a_sample_belongs_to_at_most_one_individual() {
    for (label, store) in backends() {
        let key = SampleKey::new(map_name("M1"), "S1");
        store
            .insert_individual(&Individual {
                id: IndividualId(0),
                tatoos: vec!["T1".to_string()],
                samples: vec![key.clone()],
            })
            .expect("insert");
        store
            .insert_individual(&Individual {
                id: IndividualId(1),
                tatoos: vec!["T2".to_string()],
                samples: Vec::new(),
            })
            .expect("insert");
        let err = store
            .append_individual_sample(IndividualId(1), &key)
            .expect_err(label);
        assert_eq!(err.code, StoreErrorCode::Conflict, "{label}");
        let err = store
            .append_individual_sample(IndividualId(9), &SampleKey::new(map_name("M1"), "S2"))
            .expect_err(label);
        assert_eq!(err.code, StoreErrorCode::NotFound, "{label}");

        let found = store
            .find_individuals(&IndividualFilter::by_tatoo("T1"))
            .expect("find");
        assert_eq!(found.len(), 1, "{label}");
        assert_eq!(found[0].samples, vec![key], "{label}");

        assert_eq!(store.delete_individual(IndividualId(0)).expect("delete"), 1, "{label}");
        assert_eq!(store.delete_individual(IndividualId(0)).expect("delete"), 0, "{label}");
    }
}

#[test]
fn blobs_round_trip_with_checksums() {
    for (label, store) in backends() {
        let id = store
            .put_file(b"report", "report.txt", Some("T1"), Attributes::new())
            .expect("put");
        let (meta, bytes) = store.get_file(id).expect("get");
        assert_eq!(bytes, b"report", "{label}");
        assert_eq!(meta.length, 6, "{label}");
        assert_eq!(meta.sha256, snpdb_core::sha256_hex(b"report"), "{label}");
        let filter = FileFilter {
            individual: Some("T1".to_string()),
            name: None,
        };
        assert_eq!(store.list_files(&filter).expect("list").len(), 1, "{label}");
        let missing = store.get_file(snpdb_model::FileId(99)).expect_err(label);
        assert_eq!(missing.code, StoreErrorCode::NotFound, "{label}");
    }
}

#[test]
fn concurrent_counter_reservations_never_overlap() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("snpdb.sqlite");
    SqliteStore::open(&path).expect("provision");

    let memory = Arc::new(MemoryStore::new());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let path = path.clone();
        let memory = Arc::clone(&memory);
        handles.push(thread::spawn(move || {
            let sqlite = SqliteStore::open(&path).expect("open");
            let mut firsts = Vec::new();
            for _ in 0..25 {
                firsts.push((
                    sqlite.increment_counter(COUNTER_MARKERS, 10).expect("sqlite inc"),
                    memory.increment_counter(COUNTER_MARKERS, 10).expect("memory inc"),
                ));
            }
            firsts
        }));
    }
    let mut sqlite_firsts = Vec::new();
    let mut memory_firsts = Vec::new();
    for handle in handles {
        for (s, m) in handle.join().expect("join") {
            sqlite_firsts.push(s);
            memory_firsts.push(m);
        }
    }
    let expected: Vec<u64> = (0..100).map(|i| i * 10).collect();
    sqlite_firsts.sort_unstable();
    memory_firsts.sort_unstable();
    assert_eq!(sqlite_firsts, expected);
    assert_eq!(memory_firsts, expected);
}
