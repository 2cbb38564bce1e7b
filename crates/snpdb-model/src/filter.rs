// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::marker::compare_chromosomes;
use crate::{FileMeta, Individual, IndividualId, MapDoc, MapName, Marker, MarkerId, Sample};

/// Marker search criteria. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MarkerFilter {
    pub id: Option<MarkerId>,
    pub name: Option<String>,
    pub chromosome: Option<String>,
    pub min_chromosome: Option<String>,
    pub max_chromosome: Option<String>,
    pub min_position: Option<u64>,
    pub max_position: Option<u64>,
    pub map: Option<MapName>,
}

impl MarkerFilter {
    /// Exact (chromosome, position) match used for dedup.
    #[must_use]
    pub fn at_locus(chromosome: &str, position: u64) -> Self {
        Self {
            chromosome: Some(chromosome.to_string()),
            min_position: Some(position),
            max_position: Some(position),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, marker: &Marker) -> bool {
        if self.id.is_some_and(|id| id != marker.id) {
            return false;
        }
        if let Some(name) = &self.name {
            if marker.name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(chromosome) = &self.chromosome {
            if marker.chromosome.as_deref() != Some(chromosome.as_str()) {
                return false;
            }
        }
        if self.min_chromosome.is_some() || self.max_chromosome.is_some() {
            let Some(chromosome) = marker.chromosome.as_deref() else {
                return false;
            };
            if let Some(min) = &self.min_chromosome {
                if compare_chromosomes(chromosome, min) == Ordering::Less {
                    return false;
                }
            }
            if let Some(max) = &self.max_chromosome {
                if compare_chromosomes(chromosome, max) == Ordering::Greater {
                    return false;
                }
            }
        }
        if self.min_position.is_some() || self.max_position.is_some() {
            let Some(position) = marker.position else {
                return false;
            };
            if self.min_position.is_some_and(|min| position < min) {
                return false;
            }
            if self.max_position.is_some_and(|max| position > max) {
                return false;
            }
        }
        if let Some(map) = &self.map {
            if !marker.maps.contains(map) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MapFilter {
    pub name: Option<MapName>,
    pub format: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
}

impl MapFilter {
    #[must_use]
    pub fn matches(&self, map: &MapDoc) -> bool {
        self.name.as_ref().map_or(true, |n| *n == map.name)
            && self.format.as_ref().map_or(true, |f| *f == map.format)
            && self.min_size.map_or(true, |min| map.marker_count >= min)
            && self.max_size.map_or(true, |max| map.marker_count <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SampleFilter {
    pub sample_id: Option<String>,
    pub map: Option<MapName>,
}

impl SampleFilter {
    #[must_use]
    pub fn matches(&self, sample: &Sample) -> bool {
        self.sample_id.as_ref().map_or(true, |id| *id == sample.sample_id)
            && self.map.as_ref().map_or(true, |m| *m == sample.map)
    }
}

/// Individual search criteria. `sample_map` and `sample_id` are matched
/// independently against the sample list, like array-field queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IndividualFilter {
    pub id: Option<IndividualId>,
    pub tatoo: Option<String>,
    pub sample_map: Option<MapName>,
    pub sample_id: Option<String>,
}

impl IndividualFilter {
    #[must_use]
    pub fn by_tatoo(tatoo: &str) -> Self {
        Self {
            tatoo: Some(tatoo.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, individual: &Individual) -> bool {
        self.id.map_or(true, |id| id == individual.id)
            && self.tatoo.as_deref().map_or(true, |t| individual.has_tatoo(t))
            && self
                .sample_map
                .as_ref()
                .map_or(true, |m| individual.samples.iter().any(|s| s.map == *m))
            && self
                .sample_id
                .as_ref()
                .map_or(true, |id| individual.samples.iter().any(|s| s.sample_id == *id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileFilter {
    pub individual: Option<String>,
    pub name: Option<String>,
}

impl FileFilter {
    #[must_use]
    pub fn matches(&self, file: &FileMeta) -> bool {
        self.individual
            .as_ref()
            .map_or(true, |i| file.individual.as_ref() == Some(i))
            && self.name.as_ref().map_or(true, |n| *n == file.filename)
    }
}
