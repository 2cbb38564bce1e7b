// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Prepare,
    Resolve,
    Persist,
    Associate,
    Finalize,
}

impl ImportStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Resolve => "resolve",
            Self::Persist => "persist",
            Self::Associate => "associate",
            Self::Finalize => "finalize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportEvent {
    pub stage: ImportStage,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Structured record of an import run. Every event is also forwarded to `tracing`.
#[derive(Debug, Default, Clone)]
pub struct ImportLog {
    events: Vec<ImportEvent>,
}

impl ImportLog {
    pub fn emit(
        &mut self,
        stage: ImportStage,
        name: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) {
        let name = name.into();
        tracing::info!(stage = stage.as_str(), event = %name, ?fields, "import event");
        self.events.push(ImportEvent {
            stage,
            name,
            fields,
        });
    }

    #[must_use]
    pub fn into_events(self) -> Vec<ImportEvent> {
        self.events
    }
}

/// Builds an event field map from `(key, value)` pairs.
pub fn fields<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
