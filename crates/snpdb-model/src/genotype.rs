// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::serde_helpers::{map_is_empty, Attributes};
use crate::{MapName, SampleKey};

/// A genotype field as produced by a sample reader, aligned to the map's file order.
///
/// `Chars` holds one value per character (e.g. `0125` strings, PLINK alleles);
/// `Values` holds arbitrary tokens (e.g. Final Report intensities).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValues {
    Chars(String),
    Values(Vec<String>),
}

impl FieldValues {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Chars(s) => s.chars().count(),
            Self::Values(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn to_values(&self) -> Vec<String> {
        match self {
            Self::Chars(s) => s.chars().map(String::from).collect(),
            Self::Values(v) => v.clone(),
        }
    }

    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<String> {
        match self {
            Self::Chars(s) => s.chars().nth(index).map(String::from),
            Self::Values(v) => v.get(index).cloned(),
        }
    }
}

/// One block's worth of a field, in ascending marker id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum BlockField {
    Packed(String),
    Tokens(Vec<String>),
}

impl BlockField {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Packed(s) if s.is_ascii() => s.len(),
            Self::Packed(s) => s.chars().count(),
            Self::Tokens(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at a block-local offset. Constant time for ASCII packed strings and tokens.
    #[must_use]
    pub fn value_at(&self, offset: usize) -> Option<String> {
        match self {
            Self::Packed(s) if s.is_ascii() => s.get(offset..offset + 1).map(str::to_string),
            Self::Packed(s) => s.chars().nth(offset).map(String::from),
            Self::Tokens(v) => v.get(offset).cloned(),
        }
    }
}

/// Sample metadata document. Never carries genotype payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sample {
    pub map: MapName,
    pub sample_id: String,
    #[serde(default, skip_serializing_if = "map_is_empty")]
    pub attributes: Attributes,
}

impl Sample {
    #[must_use]
    pub fn key(&self) -> SampleKey {
        SampleKey::new(self.map.clone(), self.sample_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenotypeBlock {
    pub map: MapName,
    pub sample_id: String,
    pub block_number: u64,
    pub fields: BTreeMap<String, BlockField>,
}

/// A sample as yielded by a sample reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleRecord {
    pub sample_id: String,
    #[serde(default, skip_serializing_if = "map_is_empty")]
    pub attributes: Attributes,
    pub fields: BTreeMap<String, FieldValues>,
}

impl SampleRecord {
    #[must_use]
    pub fn new(sample_id: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            attributes: Attributes::new(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, values: FieldValues) -> Self {
        self.fields.insert(name.into(), values);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_block_field_indexes_by_character() {
        let field = BlockField::Packed("0125".to_string());
        assert_eq!(field.len(), 4);
        assert_eq!(field.value_at(2).as_deref(), Some("2"));
        assert_eq!(field.value_at(4), None);
    }

    #[test]
    fn non_ascii_packed_field_falls_back_to_char_scan() {
        let field = BlockField::Packed("aé-".to_string());
        assert_eq!(field.len(), 3);
        assert_eq!(field.value_at(1).as_deref(), Some("é"));
    }

    #[test]
    fn field_values_serialize_untagged() {
        let chars = serde_json::to_string(&FieldValues::Chars("01".to_string())).expect("json");
        assert_eq!(chars, r#""01""#);
        let values: FieldValues = serde_json::from_str(r#"["0.5","0.25"]"#).expect("json");
        assert_eq!(values.len(), 2);
        assert_eq!(values.value_at(1).as_deref(), Some("0.25"));
    }
}
