// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const MAP_NAME_MAX_LEN: usize = 128;
pub const SAMPLE_ID_MAX_LEN: usize = 256;

/// Global marker id. Allocated in batches from the `markers` counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndividualId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

macro_rules! impl_numeric_id {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|e| {
                    ValidationError(format!(
                        "{} must be a non-negative integer: {e}",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

impl_numeric_id!(MarkerId);
impl_numeric_id!(IndividualId);
impl_numeric_id!(FileId);

/// Unique, immutable map (panel) name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MapName(String);

impl MapName {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.is_empty() {
            return Err(ValidationError("map name must not be empty".to_string()));
        }
        if input.trim() != input {
            return Err(ValidationError(
                "map name must not have leading or trailing whitespace".to_string(),
            ));
        }
        if input.len() > MAP_NAME_MAX_LEN {
            return Err(ValidationError(format!(
                "map name exceeds max length {MAP_NAME_MAX_LEN}"
            )));
        }
        if input.chars().any(char::is_control) {
            return Err(ValidationError(
                "map name must not contain control characters".to_string(),
            ));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MapName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<MapName> for String {
    fn from(value: MapName) -> Self {
        value.0
    }
}

impl TryFrom<String> for MapName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl FromStr for MapName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn validate_sample_id(sample_id: &str) -> Result<(), ValidationError> {
    if sample_id.is_empty() {
        return Err(ValidationError("sample id must not be empty".to_string()));
    }
    if sample_id.len() > SAMPLE_ID_MAX_LEN {
        return Err(ValidationError(format!(
            "sample id exceeds max length {SAMPLE_ID_MAX_LEN}"
        )));
    }
    Ok(())
}

/// Identifies one sample within one map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleKey {
    pub map: MapName,
    pub sample_id: String,
}

impl SampleKey {
    #[must_use]
    pub fn new(map: MapName, sample_id: impl Into<String>) -> Self {
        Self {
            map,
            sample_id: sample_id.into(),
        }
    }
}

impl Display for SampleKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.map, self.sample_id)
    }
}
