// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use snpdb_model::{
    BlockField, GenotypeBlock, MapDoc, MapName, Marker, MarkerFilter, MarkerId, MarkerRecord,
};

#[test]
fn marker_document_omits_unset_fields() {
    let mut marker = Marker::from_record(
        MarkerId(3),
        MarkerRecord::new(None, Some("X"), Some(1200)),
    );
    marker.add_map(&MapName::parse("M1").expect("name"));
    let raw = serde_json::to_string(&marker).expect("serialize");
    assert_eq!(raw, r#"{"id":3,"chromosome":"X","position":1200,"maps":["M1"]}"#);
}

#[test]
fn documents_reject_unknown_fields() {
    let raw = r#"{"name":"M1","marker_count":1,"chunk_size":1,"block_size":1,"format":"0125","extra":1}"#;
    assert!(serde_json::from_str::<MapDoc>(raw).is_err());
    assert!(serde_json::from_str::<MarkerFilter>(r#"{"position":1}"#).is_err());
}

#[test]
fn genotype_block_fields_are_tagged_by_packing() {
    let mut fields = BTreeMap::new();
    fields.insert("genotype".to_string(), BlockField::Packed("012".to_string()));
    fields.insert(
        "x".to_string(),
        BlockField::Tokens(vec!["0.1".to_string(), "0.2".to_string()]),
    );
    let block = GenotypeBlock {
        map: MapName::parse("M1").expect("name"),
        sample_id: "S1".to_string(),
        block_number: 0,
        fields,
    };
    let raw = serde_json::to_value(&block).expect("serialize");
    assert_eq!(raw["fields"]["genotype"]["kind"], "packed");
    assert_eq!(raw["fields"]["x"]["kind"], "tokens");
    let back: GenotypeBlock = serde_json::from_value(raw).expect("deserialize");
    assert_eq!(back, block);
}
