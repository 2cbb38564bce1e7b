// SPDX-License-Identifier: Apache-2.0

//! Reorders genotype fields from file order into marker id order, splits them
//! into fixed-size blocks, and reverses both steps on decode.

use std::collections::BTreeMap;

use snpdb_model::{BlockField, FieldValues, GenotypeBlock, MapDoc, MarkerId};

use crate::ImportError;

/// File positions listed in ascending marker id order. Stable for duplicate ids.
#[must_use]
pub fn sort_order(original: &[MarkerId]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..original.len()).collect();
    order.sort_by_key(|&idx| original[idx]);
    order
}

pub fn validate_lengths(
    sample_id: &str,
    fields: &BTreeMap<String, FieldValues>,
    marker_count: u64,
) -> Result<(), ImportError> {
    for (name, values) in fields {
        if values.len() as u64 != marker_count {
            return Err(ImportError::Validation(format!(
                "sample `{sample_id}` field `{name}` has {} values but the map has {marker_count} markers",
                values.len()
            )));
        }
    }
    Ok(())
}

fn block_field_runs(values: &FieldValues, order: &[usize], block_size: usize) -> Vec<BlockField> {
    match values {
        FieldValues::Chars(raw) => {
            let chars: Vec<char> = raw.chars().collect();
            let sorted: Vec<char> = order.iter().map(|&idx| chars[idx]).collect();
            sorted
                .chunks(block_size)
                .map(|run| BlockField::Packed(run.iter().collect()))
                .collect()
        }
        FieldValues::Values(tokens) => {
            let sorted: Vec<String> = order.iter().map(|&idx| tokens[idx].clone()).collect();
            sorted
                .chunks(block_size)
                .map(|run| BlockField::Tokens(run.to_vec()))
                .collect()
        }
    }
}

/// Builds the genotype blocks of one sample. `original` is the map's marker
/// list in file order.
pub fn encode_sample(
    map: &MapDoc,
    sample_id: &str,
    fields: &BTreeMap<String, FieldValues>,
    original: &[MarkerId],
) -> Result<Vec<GenotypeBlock>, ImportError> {
    validate_lengths(sample_id, fields, map.marker_count)?;
    if original.len() as u64 != map.marker_count {
        return Err(ImportError::Integrity(format!(
            "map `{}` lists {} markers but declares {}",
            map.name,
            original.len(),
            map.marker_count
        )));
    }
    let block_size = (map.block_size as usize).max(1);
    let order = sort_order(original);
    let block_count = original.len().div_ceil(block_size);

    let mut blocks: Vec<GenotypeBlock> = (0..block_count)
        .map(|number| GenotypeBlock {
            map: map.name.clone(),
            sample_id: sample_id.to_string(),
            block_number: number as u64,
            fields: BTreeMap::new(),
        })
        .collect();
    for (name, values) in fields {
        for (block, run) in blocks
            .iter_mut()
            .zip(block_field_runs(values, &order, block_size))
        {
            block.fields.insert(name.clone(), run);
        }
    }
    Ok(blocks)
}

enum Accumulator {
    Packed(String),
    Tokens(Vec<String>),
}

/// Reassembles a sample's fields in file order from its blocks.
pub fn decode_sample(
    map: &MapDoc,
    sample_id: &str,
    blocks: &[GenotypeBlock],
    original: &[MarkerId],
) -> Result<BTreeMap<String, FieldValues>, ImportError> {
    let integrity = |detail: String| {
        ImportError::Integrity(format!("sample `{sample_id}` of map `{}`: {detail}", map.name))
    };

    let mut acc: BTreeMap<String, Accumulator> = BTreeMap::new();
    for (expected, block) in blocks.iter().enumerate() {
        if block.block_number != expected as u64 {
            return Err(integrity(format!("missing block {expected}")));
        }
        if expected > 0 && block.fields.len() != acc.len() {
            return Err(integrity(format!("block {expected} has a different field set")));
        }
        for (name, field) in &block.fields {
            match (acc.get_mut(name), field) {
                (None, _) if expected > 0 => {
                    return Err(integrity(format!("field `{name}` first appears in block {expected}")))
                }
                (None, BlockField::Packed(s)) => {
                    acc.insert(name.clone(), Accumulator::Packed(s.clone()));
                }
                (None, BlockField::Tokens(t)) => {
                    acc.insert(name.clone(), Accumulator::Tokens(t.clone()));
                }
                (Some(Accumulator::Packed(all)), BlockField::Packed(s)) => all.push_str(s),
                (Some(Accumulator::Tokens(all)), BlockField::Tokens(t)) => all.extend(t.iter().cloned()),
                (Some(_), _) => {
                    return Err(integrity(format!("field `{name}` changes packing in block {expected}")))
                }
            }
        }
    }

    let count = map.marker_count as usize;
    if original.len() != count {
        return Err(integrity(format!(
            "marker list has {} entries, expected {count}",
            original.len()
        )));
    }
    let order = sort_order(original);
    let mut out = BTreeMap::new();
    for (name, values) in acc {
        let decoded = match values {
            Accumulator::Packed(sorted) => {
                let sorted: Vec<char> = sorted.chars().collect();
                if sorted.len() != count {
                    return Err(integrity(format!(
                        "field `{name}` has {} values, expected {count}",
                        sorted.len()
                    )));
                }
                let mut restored = vec!['\0'; count];
                for (pos, &idx) in order.iter().enumerate() {
                    restored[idx] = sorted[pos];
                }
                FieldValues::Chars(restored.into_iter().collect())
            }
            Accumulator::Tokens(sorted) => {
                if sorted.len() != count {
                    return Err(integrity(format!(
                        "field `{name}` has {} values, expected {count}",
                        sorted.len()
                    )));
                }
                let mut restored = vec![String::new(); count];
                for (pos, value) in sorted.into_iter().enumerate() {
                    restored[order[pos]] = value;
                }
                FieldValues::Values(restored)
            }
        };
        out.insert(name, decoded);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snpdb_model::{Attributes, MapName};

    fn map_doc(count: u64, block_size: u64) -> MapDoc {
        MapDoc {
            name: MapName::parse("M1").expect("name"),
            marker_count: count,
            chunk_size: 100,
            block_size,
            format: "0125".to_string(),
            metadata: Attributes::new(),
        }
    }

    fn ids(raw: &[u64]) -> Vec<MarkerId> {
        raw.iter().copied().map(MarkerId).collect()
    }

    #[test]
    fn blocks_hold_values_in_marker_id_order() {
        let map = map_doc(3, 2);
        let mut fields = BTreeMap::new();
        fields.insert("g".to_string(), FieldValues::Chars("abc".to_string()));
        let blocks = encode_sample(&map, "S1", &fields, &ids(&[30, 10, 20])).expect("encode");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].fields["g"], BlockField::Packed("bc".to_string()));
        assert_eq!(blocks[1].fields["g"], BlockField::Packed("a".to_string()));
    }

    #[test]
    fn length_mismatch_is_rejected_before_encoding() {
        let map = map_doc(3, 2);
        let mut fields = BTreeMap::new();
        fields.insert("g".to_string(), FieldValues::Chars("ab".to_string()));
        let err = encode_sample(&map, "S2", &fields, &ids(&[1, 2, 3])).expect_err("mismatch");
        assert!(matches!(err, ImportError::Validation(_)));
    }

    #[test]
    fn token_fields_round_trip_with_duplicate_ids() {
        let map = map_doc(4, 3);
        let original = ids(&[5, 1, 5, 0]);
        let mut fields = BTreeMap::new();
        fields.insert(
            "x".to_string(),
            FieldValues::Values(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
        );
        let blocks = encode_sample(&map, "S1", &fields, &original).expect("encode");
        let decoded = decode_sample(&map, "S1", &blocks, &original).expect("decode");
        assert_eq!(decoded, fields);
    }

    #[test]
    fn missing_block_is_an_integrity_error() {
        let map = map_doc(4, 2);
        let original = ids(&[0, 1, 2, 3]);
        let mut fields = BTreeMap::new();
        fields.insert("g".to_string(), FieldValues::Chars("0125".to_string()));
        let blocks = encode_sample(&map, "S1", &fields, &original).expect("encode");
        let err = decode_sample(&map, "S1", &blocks[1..], &original).expect_err("gap");
        assert!(matches!(err, ImportError::Integrity(_)));
    }
}
