//! Name/id lookup tables over a tenant's groups and attributes
//!
//! Built once per editing session from the relational store's listing.
//! Every lookup answers `None` for unknown keys: persisted documents may
//! reference groups or attributes that have since been renamed or deleted.

use std::collections::HashMap;

use crate::types::{Attribute, AttributeId, Group, GroupId};

/// Read-only lookup tables for one tenant
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    groups: Vec<Group>,
    attributes: Vec<Attribute>,
    group_ids: HashMap<String, GroupId>,
    group_names: HashMap<GroupId, String>,
    attribute_ids: HashMap<String, AttributeId>,
    attribute_names: HashMap<AttributeId, String>,
}

impl Lookups {
    /// Build lookups from a tenant's full listing
    ///
    /// Duplicate names are not rejected; the last record with a given name wins.
    pub fn new(groups: Vec<Group>, attributes: Vec<Attribute>) -> Self {
        let mut group_ids = HashMap::with_capacity(groups.len());
        let mut group_names = HashMap::with_capacity(groups.len());
        for group in &groups {
            group_ids.insert(group.name.clone(), group.id.clone());
            group_names.insert(group.id.clone(), group.name.clone());
        }

        let mut attribute_ids = HashMap::with_capacity(attributes.len());
        let mut attribute_names = HashMap::with_capacity(attributes.len());
        for attr in &attributes {
            attribute_ids.insert(attr.name.clone(), attr.id.clone());
            attribute_names.insert(attr.id.clone(), attr.name.clone());
        }

        Self {
            groups,
            attributes,
            group_ids,
            group_names,
            attribute_ids,
            attribute_names,
        }
    }

    pub fn group_id(&self, name: &str) -> Option<&GroupId> {
        self.group_ids.get(name)
    }

    pub fn attribute_id(&self, name: &str) -> Option<&AttributeId> {
        self.attribute_ids.get(name)
    }

    pub fn group_name(&self, id: &GroupId) -> Option<&str> {
        self.group_names.get(id).map(String::as_str)
    }

    pub fn attribute_name(&self, id: &AttributeId) -> Option<&str> {
        self.attribute_names.get(id).map(String::as_str)
    }

    pub fn has_group(&self, id: &GroupId) -> bool {
        self.group_names.contains_key(id)
    }

    /// Attributes currently belonging to a group, in listing order
    ///
    /// Membership is read from the attribute records every call, never cached.
    pub fn attributes_of_group<'a>(
        &'a self,
        group_id: &'a GroupId,
    ) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.attributes
            .iter()
            .filter(move |attr| attr.belongs_to(group_id))
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Case-insensitive substring search over group names (group picker)
    pub fn search_groups(&self, query: &str) -> Vec<&Group> {
        if query.is_empty() {
            return self.groups.iter().collect();
        }
        let needle = query.to_lowercase();
        self.groups
            .iter()
            .filter(|g| g.name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{GroupRef, Tenant};

    pub(crate) fn group(id: &str, name: &str) -> Group {
        Group {
            id: GroupId::new(id),
            name: name.to_string(),
            tenant: Tenant::new("shop-1"),
        }
    }

    pub(crate) fn attribute(id: &str, name: &str, groups: &[&Group]) -> Attribute {
        Attribute {
            id: AttributeId::new(id),
            name: name.to_string(),
            tenant: Tenant::new("shop-1"),
            groups: groups.iter().map(|g| GroupRef::from(*g)).collect(),
        }
    }

    /// Material(g1): Color(a1), Finish(a3) / Size(g2): Width(a2), Finish(a3)
    pub(crate) fn sample_lookups() -> Lookups {
        let material = group("g1", "Material");
        let size = group("g2", "Size");
        let attrs = vec![
            attribute("a1", "Color", &[&material]),
            attribute("a2", "Width", &[&size]),
            attribute("a3", "Finish", &[&material, &size]),
        ];
        Lookups::new(vec![material, size], attrs)
    }

    #[test]
    fn test_name_and_id_lookups() {
        let lookups = sample_lookups();
        assert_eq!(lookups.group_id("Size"), Some(&GroupId::new("g2")));
        assert_eq!(lookups.group_name(&GroupId::new("g1")), Some("Material"));
        assert_eq!(lookups.attribute_id("Width"), Some(&AttributeId::new("a2")));
        assert_eq!(lookups.attribute_name(&AttributeId::new("a3")), Some("Finish"));
    }

    #[test]
    fn test_unknown_names_are_absent_not_errors() {
        let lookups = sample_lookups();
        assert_eq!(lookups.group_id("Retired"), None);
        assert_eq!(lookups.attribute_id("Weight"), None);
        assert_eq!(lookups.group_name(&GroupId::new("gone")), None);
        assert!(!lookups.has_group(&GroupId::new("gone")));
    }

    #[test]
    fn test_attributes_of_group_follows_membership() {
        let lookups = sample_lookups();
        let g1 = GroupId::new("g1");
        let names: Vec<&str> = lookups.attributes_of_group(&g1).map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Color", "Finish"]);

        let empty = GroupId::new("g-none");
        assert_eq!(lookups.attributes_of_group(&empty).count(), 0);
    }

    #[test]
    fn test_search_groups_case_insensitive() {
        let lookups = sample_lookups();
        let hits: Vec<&str> = lookups.search_groups("MAT").into_iter().map(|g| g.name.as_str()).collect();
        assert_eq!(hits, vec!["Material"]);
        assert_eq!(lookups.search_groups("").len(), 2);
        assert!(lookups.search_groups("zzz").is_empty());
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let lookups = Lookups::new(vec![group("g1", "Size"), group("g2", "Size")], Vec::new());
        assert_eq!(lookups.group_id("Size"), Some(&GroupId::new("g2")));
    }
}
