//! Group completeness check that gates saving

use tracing::warn;

use crate::catalog::Lookups;
use crate::constants::messages;
use crate::error::ValidationErrors;
use crate::types::{AttributeValues, GroupId};

/// True when at least one attribute of the group has a non-blank value
///
/// A group with no attributes is never filled.
pub fn group_is_filled(group_id: &GroupId, values: &AttributeValues, lookups: &Lookups) -> bool {
    lookups.attributes_of_group(group_id).any(|attr| {
        values
            .get(&attr.id)
            .is_some_and(|value| !value.trim().is_empty())
    })
}

/// Report every selected group that has nothing filled in
///
/// Keys are group names in selection order. Selected ids that no longer
/// resolve to a group are skipped: they cannot reach the document either.
pub fn validate<'a>(
    selected: impl IntoIterator<Item = &'a GroupId>,
    values: &AttributeValues,
    lookups: &Lookups,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for group_id in selected {
        let Some(name) = lookups.group_name(group_id) else {
            continue;
        };
        if !group_is_filled(group_id, values, lookups) {
            errors.insert(name.to_string(), messages::group_needs_value(name));
        }
    }

    if !errors.is_empty() {
        warn!(groups = ?errors.keys().collect::<Vec<_>>(), "Validation failed");
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{attribute, group, sample_lookups};
    use crate::types::AttributeId;

    fn values(pairs: &[(&str, &str)]) -> AttributeValues {
        pairs
            .iter()
            .map(|(id, v)| (AttributeId::new(*id), v.to_string()))
            .collect()
    }

    #[test]
    fn test_blank_group_reports_message() {
        let material = group("g1", "Material");
        let lookups = Lookups::new(
            vec![material.clone()],
            vec![attribute("a1", "Color", &[&material])],
        );
        let selected = vec![GroupId::new("g1")];

        let errors = validate(&selected, &values(&[("a1", "")]), &lookups);
        assert_eq!(
            errors.get("Material").map(String::as_str),
            Some("At least one attribute in \"Material\" must be filled.")
        );

        let errors = validate(&selected, &values(&[("a1", "Red")]), &lookups);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_whitespace_counts_as_blank() {
        let lookups = sample_lookups();
        let selected = vec![GroupId::new("g2")];
        let errors = validate(&selected, &values(&[("a2", " \t ")]), &lookups);
        assert!(errors.contains_key("Size"));
    }

    #[test]
    fn test_group_without_attributes_is_invalid() {
        let lookups = Lookups::new(vec![group("g9", "Empty")], Vec::new());
        let errors = validate(&[GroupId::new("g9")], &AttributeValues::new(), &lookups);
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("Empty"));
    }

    #[test]
    fn test_errors_follow_selection_order_and_skip_stale_ids() {
        let lookups = sample_lookups();
        let selected = vec![GroupId::new("g2"), GroupId::new("stale"), GroupId::new("g1")];

        let errors = validate(&selected, &AttributeValues::new(), &lookups);
        let keys: Vec<&String> = errors.keys().collect();
        assert_eq!(keys, vec!["Size", "Material"]);
    }

    #[test]
    fn test_shared_attribute_fills_both_groups() {
        let lookups = sample_lookups();
        let selected = vec![GroupId::new("g1"), GroupId::new("g2")];
        assert!(validate(&selected, &values(&[("a3", "Matte")]), &lookups).is_empty());
    }
}
