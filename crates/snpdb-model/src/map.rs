// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::serde_helpers::{map_is_empty, Attributes};
use crate::{MapName, MarkerId};

/// Map (panel) document. Name, sizes and format are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapDoc {
    pub name: MapName,
    pub marker_count: u64,
    pub chunk_size: u64,
    pub block_size: u64,
    pub format: String,
    #[serde(default, skip_serializing_if = "map_is_empty")]
    pub metadata: Attributes,
}

impl MapDoc {
    /// Number of chunk records per ordering.
    #[must_use]
    pub fn chunk_count(&self) -> u64 {
        self.marker_count.div_ceil(self.chunk_size.max(1))
    }

    /// Number of genotype blocks every sample of this map carries.
    #[must_use]
    pub fn block_count(&self) -> u64 {
        self.marker_count.div_ceil(self.block_size.max(1))
    }
}

/// One slice of a map's marker id list, in both import order and sorted order.
///
/// Chunk `i` covers global positions `[i * chunk_size, (i + 1) * chunk_size)`
/// of each ordering; both slices always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapMarkerChunk {
    pub map: MapName,
    pub chunk_index: u64,
    pub original: Vec<MarkerId>,
    pub sorted: Vec<MarkerId>,
}

impl MapMarkerChunk {
    #[must_use]
    pub fn len(&self) -> usize {
        self.original.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// True when `id` falls within the sorted slice's `[first, last]` range.
    #[must_use]
    pub fn may_contain(&self, id: MarkerId) -> bool {
        match (self.sorted.first(), self.sorted.last()) {
            (Some(first), Some(last)) => *first <= id && id <= *last,
            _ => false,
        }
    }

    /// Local offset of the first occurrence of `id` in the sorted slice.
    #[must_use]
    pub fn sorted_offset(&self, id: MarkerId) -> Option<usize> {
        let idx = self.sorted.partition_point(|probe| *probe < id);
        (self.sorted.get(idx) == Some(&id)).then_some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(sorted: &[u64]) -> MapMarkerChunk {
        let ids: Vec<MarkerId> = sorted.iter().copied().map(MarkerId).collect();
        MapMarkerChunk {
            map: MapName::parse("M").expect("name"),
            chunk_index: 0,
            original: ids.clone(),
            sorted: ids,
        }
    }

    #[test]
    fn sorted_offset_reports_first_duplicate() {
        let c = chunk(&[1, 4, 4, 4, 9]);
        assert_eq!(c.sorted_offset(MarkerId(4)), Some(1));
        assert_eq!(c.sorted_offset(MarkerId(9)), Some(4));
        assert_eq!(c.sorted_offset(MarkerId(5)), None);
    }

    #[test]
    fn range_check_excludes_out_of_bounds_ids() {
        let c = chunk(&[3, 8]);
        assert!(!c.may_contain(MarkerId(2)));
        assert!(c.may_contain(MarkerId(5)));
        assert!(!c.may_contain(MarkerId(9)));
        assert!(!chunk(&[]).may_contain(MarkerId(0)));
    }

    #[test]
    fn block_and_chunk_counts_round_up() {
        let doc = MapDoc {
            name: MapName::parse("M").expect("name"),
            marker_count: 25,
            chunk_size: 10,
            block_size: 4,
            format: "0125".to_string(),
            metadata: Attributes::new(),
        };
        assert_eq!(doc.chunk_count(), 3);
        assert_eq!(doc.block_count(), 7);
    }
}
