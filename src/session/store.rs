//! Selection & value store for one editing session
//!
//! Every edit path (group picker, field edits, raw-document edits) goes
//! through these operations, so the cascading clear on deselect happens in
//! exactly one place.

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::catalog::Lookups;
use crate::document::ParsedState;
use crate::types::{AttributeId, AttributeValues, GroupId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStore {
    selected: IndexSet<GroupId>,
    values: AttributeValues,
    /// Bumped on every effective mutation; observers redraw when it moves
    version: u64,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state recovered from the persisted document
    pub fn from_parsed(parsed: ParsedState) -> Self {
        Self {
            selected: parsed.selected_group_ids.into_iter().collect(),
            values: parsed.attribute_values,
            version: 0,
        }
    }

    pub fn selected(&self) -> &IndexSet<GroupId> {
        &self.selected
    }

    pub fn is_selected(&self, group_id: &GroupId) -> bool {
        self.selected.contains(group_id)
    }

    pub fn values(&self) -> &AttributeValues {
        &self.values
    }

    pub fn value(&self, attribute_id: &AttributeId) -> Option<&str> {
        self.values.get(attribute_id).map(String::as_str)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Add or remove a group; returns whether the group is selected afterwards
    ///
    /// Removing a group clears the values of attributes that belong to it and
    /// to no other still-selected group.
    pub fn toggle_group(&mut self, group_id: &GroupId, lookups: &Lookups) -> bool {
        if self.selected.shift_remove(group_id) {
            let cleared = self.clear_exclusive_values(group_id, lookups);
            self.version += 1;
            info!(group = %group_id, cleared, "Deselected group");
            return false;
        }

        if !lookups.has_group(group_id) {
            warn!(group = %group_id, "Ignoring toggle of unknown group");
            return false;
        }

        self.selected.insert(group_id.clone());
        self.version += 1;
        info!(group = %group_id, "Selected group");
        true
    }

    /// Overwrite one value as typed; trimming only happens at derivation time
    pub fn set_value(&mut self, attribute_id: AttributeId, value: impl Into<String>) {
        let value = value.into();
        if self.values.get(&attribute_id) == Some(&value) {
            return;
        }
        debug!(attribute = %attribute_id, "Set attribute value");
        self.values.insert(attribute_id, value);
        self.version += 1;
    }

    /// Adopt state parsed from the raw editor
    ///
    /// Groups with a non-empty entry join the selection; groups whose entry is
    /// `{}` leave it and get the same cascading clear as a toggle. Groups the
    /// text does not mention stay selected, since blank groups never appear in
    /// the derived text. Parsed values are merged over the existing ones.
    pub fn apply_parsed_state(&mut self, parsed: ParsedState, lookups: &Lookups) {
        let before: Vec<GroupId> = self.selected.iter().cloned().collect();

        for group_id in parsed.selected_group_ids {
            self.selected.insert(group_id);
        }

        let mut departed = 0;
        let mut cleared = 0;
        for name in &parsed.empty_group_names {
            let Some(group_id) = lookups.group_id(name) else {
                continue;
            };
            if self.selected.shift_remove(group_id) {
                departed += 1;
                cleared += self.clear_exclusive_values(group_id, lookups);
            }
        }

        let mut merged = 0;
        for (attribute_id, value) in parsed.attribute_values {
            if self.values.get(&attribute_id) != Some(&value) {
                self.values.insert(attribute_id, value);
                merged += 1;
            }
        }

        let reselected = !self.selected.iter().eq(before.iter());
        if !reselected && cleared == 0 && merged == 0 {
            debug!("Raw document edit changed nothing");
            return;
        }
        self.version += 1;

        info!(
            selected = self.selected.len(),
            departed,
            cleared,
            merged,
            "Applied raw document edit"
        );
    }

    /// Drop values only `group_id` (among selected groups) was holding on to
    fn clear_exclusive_values(&mut self, group_id: &GroupId, lookups: &Lookups) -> usize {
        let exclusive: Vec<AttributeId> = lookups
            .attributes_of_group(group_id)
            .filter(|attr| {
                !attr
                    .groups
                    .iter()
                    .any(|r| &r.id != group_id && self.selected.contains(&r.id))
            })
            .map(|attr| attr.id.clone())
            .collect();

        exclusive
            .iter()
            .filter(|id| self.values.remove(*id).is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_lookups;
    use crate::document::deserialize;

    fn g(id: &str) -> GroupId {
        GroupId::new(id)
    }

    fn a(id: &str) -> AttributeId {
        AttributeId::new(id)
    }

    #[test]
    fn test_toggle_is_symmetric() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();

        assert!(store.toggle_group(&g("g1"), &lookups));
        assert!(store.is_selected(&g("g1")));
        assert!(!store.toggle_group(&g("g1"), &lookups));
        assert!(store.selected().is_empty());
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_toggle_unknown_group_is_ignored() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();

        assert!(!store.toggle_group(&g("missing"), &lookups));
        assert!(store.selected().is_empty());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_deselect_clears_exclusive_but_keeps_shared_values() {
        // a1 only in g1; a3 in g1 and g2
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();
        store.toggle_group(&g("g1"), &lookups);
        store.toggle_group(&g("g2"), &lookups);
        store.set_value(a("a1"), "Red");
        store.set_value(a("a3"), "Matte");

        store.toggle_group(&g("g1"), &lookups);

        assert_eq!(store.value(&a("a1")), None);
        assert_eq!(store.value(&a("a3")), Some("Matte"));
    }

    #[test]
    fn test_deselect_last_holder_clears_shared_value() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();
        store.toggle_group(&g("g1"), &lookups);
        store.set_value(a("a3"), "Matte");

        store.toggle_group(&g("g1"), &lookups);
        assert_eq!(store.value(&a("a3")), None);
    }

    #[test]
    fn test_selection_keeps_insertion_order() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();
        store.toggle_group(&g("g2"), &lookups);
        store.toggle_group(&g("g1"), &lookups);

        let order: Vec<&GroupId> = store.selected().iter().collect();
        assert_eq!(order, vec![&g("g2"), &g("g1")]);
    }

    #[test]
    fn test_set_value_is_untrimmed_and_skips_noop() {
        let mut store = SelectionStore::new();
        store.set_value(a("a1"), "  Red ");
        assert_eq!(store.value(&a("a1")), Some("  Red "));

        let version = store.version();
        store.set_value(a("a1"), "  Red ");
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_apply_parsed_state_merges_values() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();
        store.toggle_group(&g("g1"), &lookups);
        store.set_value(a("a1"), "Red");
        store.set_value(a("a3"), "Matte");

        // Partial edit: Finish not mentioned, must survive
        let parsed = deserialize(r#"{"Material": {"Color": "Blue"}}"#, &lookups).unwrap();
        store.apply_parsed_state(parsed, &lookups);

        assert_eq!(store.value(&a("a1")), Some("Blue"));
        assert_eq!(store.value(&a("a3")), Some("Matte"));
    }

    #[test]
    fn test_apply_parsed_state_adds_groups_and_keeps_unmentioned() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();
        store.toggle_group(&g("g1"), &lookups);
        store.set_value(a("a1"), "Red");

        let parsed = deserialize(r#"{"Size": {"Width": "10cm"}}"#, &lookups).unwrap();
        store.apply_parsed_state(parsed, &lookups);

        let order: Vec<&GroupId> = store.selected().iter().collect();
        assert_eq!(order, vec![&g("g1"), &g("g2")]);
        assert_eq!(store.value(&a("a1")), Some("Red"));
        assert_eq!(store.value(&a("a2")), Some("10cm"));
    }

    #[test]
    fn test_unfilled_group_survives_raw_edit() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();
        store.toggle_group(&g("g2"), &lookups);
        store.set_value(a("a2"), "10cm");
        // Material picked but nothing typed yet, so it is absent from the text
        store.toggle_group(&g("g1"), &lookups);

        let parsed = deserialize(r#"{"Size": {"Width": "12cm"}}"#, &lookups).unwrap();
        store.apply_parsed_state(parsed, &lookups);

        assert!(store.is_selected(&g("g1")));
        assert!(store.is_selected(&g("g2")));
        assert_eq!(store.value(&a("a2")), Some("12cm"));
    }

    #[test]
    fn test_noop_raw_edit_keeps_version() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();
        store.toggle_group(&g("g2"), &lookups);
        store.set_value(a("a2"), "10cm");
        let version = store.version();

        let parsed = deserialize(r#"{"Size": {"Width": "10cm"}}"#, &lookups).unwrap();
        store.apply_parsed_state(parsed, &lookups);
        assert_eq!(store.version(), version);

        let parsed = deserialize(r#"{"Size": {"Width": "11cm"}}"#, &lookups).unwrap();
        store.apply_parsed_state(parsed, &lookups);
        assert_eq!(store.version(), version + 1);
    }

    #[test]
    fn test_apply_empty_group_entry_removes_group() {
        let lookups = sample_lookups();
        let mut store = SelectionStore::new();
        store.toggle_group(&g("g2"), &lookups);
        store.set_value(a("a2"), "10cm");

        let parsed = deserialize(r#"{"Size": {}}"#, &lookups).unwrap();
        assert_eq!(parsed.empty_group_names, vec!["Size".to_string()]);
        store.apply_parsed_state(parsed, &lookups);

        assert!(!store.is_selected(&g("g2")));
        assert_eq!(store.value(&a("a2")), None);
    }
}
