//! Change detection and the single-attempt save path

use tracing::{error, info};

use crate::catalog::Lookups;
use crate::document::{self, ConfigDocument};
use crate::error::SaveError;
use crate::storage::DocumentWriter;
use crate::types::{AttributeValues, ItemId};

use super::store::SelectionStore;
use super::validator;

/// True when any attribute differs between the two maps (absent reads as "")
pub fn has_changes(values: &AttributeValues, baseline: &AttributeValues) -> bool {
    let differs = |left: &AttributeValues, right: &AttributeValues| {
        left.iter()
            .any(|(id, value)| right.get(id).map_or("", String::as_str) != value)
    };
    differs(values, baseline) || differs(baseline, values)
}

/// Attribute values and document as last persisted
///
/// Only a confirmed save replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    values: AttributeValues,
    document: ConfigDocument,
}

impl Baseline {
    pub fn new(values: AttributeValues, document: ConfigDocument) -> Self {
        Self { values, document }
    }

    pub fn values(&self) -> &AttributeValues {
        &self.values
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// True when the values or the derived document moved away from the saved ones
    ///
    /// The document catches deselecting a group whose attributes are all
    /// shared: no value changes, but the group leaves the document.
    pub fn differs(&self, values: &AttributeValues, document: &ConfigDocument) -> bool {
        has_changes(values, &self.values) || document != &self.document
    }
}

/// What a successful save did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The document was written
    Written,
    /// Nothing changed since the baseline; no write issued
    Unchanged,
}

/// Validate, compare against the baseline, and write if needed
///
/// On failure the store is left exactly as edited and the baseline is not
/// advanced. No retry happens here.
pub async fn save<W>(
    writer: &W,
    item_id: &ItemId,
    store: &SelectionStore,
    lookups: &Lookups,
    baseline: &mut Baseline,
) -> Result<SaveOutcome, SaveError>
where
    W: DocumentWriter + ?Sized,
{
    let errors = validator::validate(store.selected(), store.values(), lookups);
    if !errors.is_empty() {
        return Err(SaveError::ValidationFailed(errors));
    }

    let snapshot = store.values().clone();
    let document = document::serialize(store.selected(), &snapshot, lookups);
    if !baseline.differs(&snapshot, &document) {
        info!(item = %item_id, "No changes since last save, skipping write");
        return Ok(SaveOutcome::Unchanged);
    }

    let blob = document.to_blob();

    if let Err(err) = writer.write_document(item_id, &blob).await {
        error!(item = %item_id, error = %err, "Document write failed");
        return Err(err.into());
    }

    *baseline = Baseline::new(snapshot, document);
    info!(item = %item_id, bytes = blob.len(), "Saved configuration document");
    Ok(SaveOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_lookups;
    use crate::error::WriteFailure;
    use crate::storage::MemoryStore;
    use crate::types::{AttributeId, CatalogItem, GroupId, ItemStatus, Tenant};

    fn values(pairs: &[(&str, &str)]) -> AttributeValues {
        pairs
            .iter()
            .map(|(id, v)| (AttributeId::new(*id), v.to_string()))
            .collect()
    }

    fn store_with_item() -> (MemoryStore, ItemId) {
        let store = MemoryStore::new();
        let id = ItemId::new("gid://item/1");
        store
            .add_item(
                &Tenant::new("shop-1"),
                CatalogItem {
                    id: id.clone(),
                    handle: "chair".into(),
                    title: "Chair".into(),
                    status: ItemStatus::Active,
                },
            )
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_has_changes_treats_absent_as_empty() {
        assert!(!has_changes(&values(&[("a1", "")]), &AttributeValues::new()));
        assert!(!has_changes(&AttributeValues::new(), &values(&[("a1", "")])));
        assert!(has_changes(&values(&[("a1", "x")]), &AttributeValues::new()));
        assert!(has_changes(&AttributeValues::new(), &values(&[("a1", "x")])));
        assert!(!has_changes(&values(&[("a1", "x")]), &values(&[("a1", "x")])));
    }

    #[tokio::test]
    async fn test_save_twice_writes_once() {
        let lookups = sample_lookups();
        let (writer, item) = store_with_item();
        let mut selection = SelectionStore::new();
        selection.toggle_group(&GroupId::new("g2"), &lookups);
        selection.set_value(AttributeId::new("a2"), "10cm");
        let mut baseline = Baseline::default();

        let first = save(&writer, &item, &selection, &lookups, &mut baseline).await.unwrap();
        let second = save(&writer, &item, &selection, &lookups, &mut baseline).await.unwrap();

        assert_eq!(first, SaveOutcome::Written);
        assert_eq!(second, SaveOutcome::Unchanged);
        assert_eq!(writer.write_count(), 1);
        assert_eq!(writer.document(&item).as_deref(), Some(r#"{"Size":{"Width":"10cm"}}"#));
    }

    #[tokio::test]
    async fn test_selection_change_alone_is_written() {
        let lookups = sample_lookups();
        let (writer, item) = store_with_item();
        let mut selection = SelectionStore::new();
        selection.toggle_group(&GroupId::new("g1"), &lookups);
        selection.toggle_group(&GroupId::new("g2"), &lookups);
        selection.set_value(AttributeId::new("a3"), "Matte");
        let mut baseline = Baseline::default();
        save(&writer, &item, &selection, &lookups, &mut baseline).await.unwrap();

        // Finish is shared, so no value changes when Material goes away
        selection.toggle_group(&GroupId::new("g1"), &lookups);
        assert!(!has_changes(selection.values(), baseline.values()));

        let outcome = save(&writer, &item, &selection, &lookups, &mut baseline).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Written);
        assert_eq!(writer.document(&item).as_deref(), Some(r#"{"Size":{"Finish":"Matte"}}"#));
    }

    #[tokio::test]
    async fn test_validation_failure_skips_write() {
        let lookups = sample_lookups();
        let (writer, item) = store_with_item();
        let mut selection = SelectionStore::new();
        selection.toggle_group(&GroupId::new("g1"), &lookups);
        selection.set_value(AttributeId::new("a1"), "   ");
        let mut baseline = Baseline::default();

        let err = save(&writer, &item, &selection, &lookups, &mut baseline).await.unwrap_err();
        match err {
            SaveError::ValidationFailed(errors) => assert!(errors.contains_key("Material")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(writer.write_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_baseline_and_edits() {
        let lookups = sample_lookups();
        let (writer, item) = store_with_item();
        let mut selection = SelectionStore::new();
        selection.toggle_group(&GroupId::new("g2"), &lookups);
        selection.set_value(AttributeId::new("a2"), "10cm");
        let before = selection.clone();
        let mut baseline = Baseline::default();

        writer.fail_next_write(WriteFailure::Transport("timeout".into()));
        let err = save(&writer, &item, &selection, &lookups, &mut baseline).await.unwrap_err();

        assert!(matches!(err, SaveError::ExternalWriteFailed(WriteFailure::Transport(_))));
        assert_eq!(baseline, Baseline::default());
        assert_eq!(selection, before);

        // Retry succeeds and advances the baseline
        let outcome = save(&writer, &item, &selection, &lookups, &mut baseline).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Written);
        assert_eq!(baseline.values(), selection.values());
    }
}
