// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

/// Free-form attribute bag carried by markers, maps, samples and files.
pub type Attributes = BTreeMap<String, serde_json::Value>;

#[must_use]
pub fn map_is_empty<K, V>(value: &BTreeMap<K, V>) -> bool {
    value.is_empty()
}

/// Renders an attribute value the way line-oriented writers expect it.
#[must_use]
pub fn attribute_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
