//! Configuration document codec
//!
//! The persisted document is a two-level string map keyed by *names*:
//!
//! ```json
//! { "Size": { "Width": "10cm" }, "Material": { "Color": "Red" } }
//! ```
//!
//! `serialize` derives it from the editing state; `deserialize` reads raw text
//! back into editing state. The reverse direction only fails when the text is
//! not a JSON object at all. Anything that parses but cannot be resolved
//! (renamed groups, deleted attributes, non-string values) is dropped and
//! reported in [`ParsedState::dropped`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::Lookups;
use crate::error::ParseError;
use crate::types::{AttributeValues, GroupId};

/// Attribute name → value for one group
pub type GroupEntry = IndexMap<String, String>;

/// Group name → attribute entries, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument(IndexMap<String, GroupEntry>);

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, group_name: &str) -> Option<&GroupEntry> {
        self.0.get(group_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GroupEntry)> {
        self.0.iter()
    }

    /// Insert a group entry; empty entries are never stored
    pub fn insert(&mut self, group_name: impl Into<String>, entry: GroupEntry) {
        if !entry.is_empty() {
            self.0.insert(group_name.into(), entry);
        }
    }

    /// Two-space indented text shown in the raw editor
    pub fn to_pretty_string(&self) -> String {
        // String-keyed maps of strings always serialize
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Compact blob handed to the persistence call
    pub fn to_blob(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Something `deserialize` could not resolve and left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dropped {
    /// Group name with no matching group
    UnknownGroup(String),
    /// Group entry whose value is not an object
    MalformedGroup(String),
    /// Attribute name with no matching attribute
    UnknownAttribute { group: String, attribute: String },
    /// Attribute value that is not a string
    NonStringValue { group: String, attribute: String },
}

/// Editing state recovered from raw document text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedState {
    /// Groups with a non-empty entry, in document order
    pub selected_group_ids: Vec<GroupId>,
    pub attribute_values: AttributeValues,
    /// Known groups whose entry is `{}`: the operator is abandoning them
    pub empty_group_names: Vec<String>,
    pub dropped: Vec<Dropped>,
}

impl ParsedState {
    /// True when every entry in the text was resolved
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Derive the document from the current selection and values
///
/// Blank (whitespace-only) values are left out; a group left with no entries
/// is omitted entirely. Output order follows `selected`.
pub fn serialize<'a>(
    selected: impl IntoIterator<Item = &'a GroupId>,
    values: &AttributeValues,
    lookups: &Lookups,
) -> ConfigDocument {
    let mut document = ConfigDocument::new();

    for group_id in selected {
        let Some(group_name) = lookups.group_name(group_id) else {
            continue;
        };

        let entry: GroupEntry = lookups
            .attributes_of_group(group_id)
            .filter_map(|attr| {
                values
                    .get(&attr.id)
                    .filter(|value| !value.trim().is_empty())
                    .map(|value| (attr.name.clone(), value.clone()))
            })
            .collect();

        document.insert(group_name, entry);
    }

    document
}

/// Read raw document text back into editing state
///
/// Fails only when the text is not JSON or its root is not an object.
pub fn deserialize(raw: &str, lookups: &Lookups) -> Result<ParsedState, ParseError> {
    let root = match serde_json::from_str::<Value>(raw)? {
        Value::Object(root) => root,
        other => {
            return Err(ParseError::NotAnObject {
                found: json_kind(&other),
            });
        }
    };

    let mut parsed = ParsedState::default();

    for (group_name, entry) in root {
        let Some(group_id) = lookups.group_id(&group_name) else {
            parsed.dropped.push(Dropped::UnknownGroup(group_name));
            continue;
        };

        let Value::Object(attrs) = entry else {
            parsed.dropped.push(Dropped::MalformedGroup(group_name));
            continue;
        };

        if attrs.is_empty() {
            parsed.empty_group_names.push(group_name);
            continue;
        }

        if !parsed.selected_group_ids.contains(group_id) {
            parsed.selected_group_ids.push(group_id.clone());
        }

        for (attr_name, value) in attrs {
            let Some(attr_id) = lookups.attribute_id(&attr_name) else {
                parsed.dropped.push(Dropped::UnknownAttribute {
                    group: group_name.clone(),
                    attribute: attr_name,
                });
                continue;
            };

            match value {
                Value::String(value) => {
                    parsed.attribute_values.insert(attr_id.clone(), value);
                }
                _ => parsed.dropped.push(Dropped::NonStringValue {
                    group: group_name.clone(),
                    attribute: attr_name,
                }),
            }
        }
    }

    if !parsed.is_clean() {
        debug!(dropped = ?parsed.dropped, "Dropped unresolvable document entries");
    }

    Ok(parsed)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
