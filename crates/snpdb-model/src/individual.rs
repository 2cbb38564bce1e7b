// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::serde_helpers::{map_is_empty, Attributes};
use crate::{FileId, IndividualId, SampleKey};

/// A biological individual. `tatoos` are external alternate identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Individual {
    pub id: IndividualId,
    #[serde(default)]
    pub tatoos: Vec<String>,
    #[serde(default)]
    pub samples: Vec<SampleKey>,
}

impl Individual {
    #[must_use]
    pub fn has_tatoo(&self, tatoo: &str) -> bool {
        self.tatoos.iter().any(|t| t == tatoo)
    }

    #[must_use]
    pub fn owns(&self, key: &SampleKey) -> bool {
        self.samples.contains(key)
    }
}

/// Metadata of a raw blob attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileMeta {
    pub id: FileId,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual: Option<String>,
    pub length: u64,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "map_is_empty")]
    pub attributes: Attributes,
}
