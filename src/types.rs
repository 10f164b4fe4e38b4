//! Core identifier and entity types shared by every layer

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Attribute id → value as typed by the operator (untrimmed)
pub type AttributeValues = HashMap<AttributeId, String>;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a Group record
    GroupId
);
string_id!(
    /// Identifier of an Attribute record
    AttributeId
);
string_id!(
    /// Identifier of a catalog item (the owner of the persisted document)
    ItemId
);
string_id!(
    /// Isolation scope under which Group and Attribute records are partitioned
    Tenant
);

/// Named bucket of attributes; the unit of selection while editing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub tenant: Tenant,
}

/// Reference to a group as carried on an attribute record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: GroupId,
    pub name: String,
}

impl From<&Group> for GroupRef {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.clone(),
            name: group.name.clone(),
        }
    }
}

/// Named field whose value is entered per catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    pub tenant: Tenant,
    #[serde(default)]
    pub groups: Vec<GroupRef>,
}

impl Attribute {
    pub fn belongs_to(&self, group_id: &GroupId) -> bool {
        self.groups.iter().any(|g| &g.id == group_id)
    }
}

/// Publication status of a catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Active,
    Draft,
    Archived,
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Active => "Active",
            ItemStatus::Draft => "Draft",
            ItemStatus::Archived => "Archived",
        }
    }
}

/// Catalog item as returned by the catalog lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub handle: String,
    pub title: String,
    pub status: ItemStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = GroupId::new("g1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"g1\"");
        assert_eq!(id.to_string(), "g1");
    }

    #[test]
    fn test_attribute_belongs_to() {
        let attr = Attribute {
            id: AttributeId::new("a1"),
            name: "Width".to_string(),
            tenant: Tenant::new("shop-1"),
            groups: vec![GroupRef { id: GroupId::new("g1"), name: "Size".to_string() }],
        };
        assert!(attr.belongs_to(&GroupId::new("g1")));
        assert!(!attr.belongs_to(&GroupId::new("g2")));
    }

    #[test]
    fn test_item_status_wire_format() {
        assert_eq!(serde_json::to_string(&ItemStatus::Archived).unwrap(), "\"ARCHIVED\"");
        let parsed: ItemStatus = serde_json::from_str("\"DRAFT\"").unwrap();
        assert_eq!(parsed, ItemStatus::Draft);
    }
}
