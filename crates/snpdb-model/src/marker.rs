// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::serde_helpers::{map_is_empty, Attributes};
use crate::{MapName, MarkerId};

/// A marker as yielded by a map reader, before identity resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(default, skip_serializing_if = "map_is_empty")]
    pub extra: Attributes,
}

impl MarkerRecord {
    #[must_use]
    pub fn new(name: Option<&str>, chromosome: Option<&str>, position: Option<u64>) -> Self {
        Self {
            name: name.map(str::to_string),
            chromosome: chromosome.map(str::to_string),
            position,
            extra: Attributes::new(),
        }
    }

    /// The dedup key. Records missing either half never match anything.
    #[must_use]
    pub fn locus(&self) -> Option<(&str, u64)> {
        match (&self.chromosome, self.position) {
            (Some(chromosome), Some(position)) => Some((chromosome.as_str(), position)),
            _ => None,
        }
    }
}

/// Stored marker. Immutable apart from the append-only `maps` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Marker {
    pub id: MarkerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(default)]
    pub maps: Vec<MapName>,
    #[serde(default, skip_serializing_if = "map_is_empty")]
    pub extra: Attributes,
}

impl Marker {
    #[must_use]
    pub fn from_record(id: MarkerId, record: MarkerRecord) -> Self {
        Self {
            id,
            name: record.name,
            chromosome: record.chromosome,
            position: record.position,
            maps: Vec::new(),
            extra: record.extra,
        }
    }

    #[must_use]
    pub fn to_record(&self) -> MarkerRecord {
        MarkerRecord {
            name: self.name.clone(),
            chromosome: self.chromosome.clone(),
            position: self.position,
            extra: self.extra.clone(),
        }
    }

    pub fn add_map(&mut self, map: &MapName) {
        if !self.maps.contains(map) {
            self.maps.push(map.clone());
        }
    }
}

/// Orders chromosome labels numerically when both parse as integers and
/// lexicographically otherwise, so `2 < 10` and `10 < X`.
#[must_use]
pub fn compare_chromosomes(left: &str, right: &str) -> Ordering {
    match (left.parse::<u64>(), right.parse::<u64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        _ => left.cmp(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chromosome_order_is_numeric_for_integers() {
        assert_eq!(compare_chromosomes("2", "10"), Ordering::Less);
        assert_eq!(compare_chromosomes("10", "10"), Ordering::Equal);
        assert_eq!(compare_chromosomes("10", "X"), Ordering::Less);
        assert_eq!(compare_chromosomes("Y", "X"), Ordering::Greater);
    }

    #[test]
    fn locus_requires_both_halves() {
        assert_eq!(MarkerRecord::new(Some("rs1"), Some("1"), None).locus(), None);
        assert_eq!(MarkerRecord::new(None, None, Some(5)).locus(), None);
        assert_eq!(
            MarkerRecord::new(None, Some("1"), Some(5)).locus(),
            Some(("1", 5))
        );
    }

    #[test]
    fn map_membership_is_append_only_and_deduplicated() {
        let mut marker = Marker::from_record(MarkerId(7), MarkerRecord::default());
        let m1 = MapName::parse("M1").expect("name");
        let m2 = MapName::parse("M2").expect("name");
        marker.add_map(&m1);
        marker.add_map(&m2);
        marker.add_map(&m1);
        assert_eq!(marker.maps, vec![m1, m2]);
    }
}
