//! In-memory store implementation
//!
//! All records live in an `Arc<RwLock<Records>>`, so clones share state and
//! the store can be handed to several sessions at once.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::records::Records;
use super::{CatalogClient, DocumentWriter, EntityStore, ItemFilter, ItemPage, ItemRecord};
use crate::error::{StoreError, WriteFailure};
use crate::types::{Attribute, AttributeId, CatalogItem, Group, GroupId, ItemId, Tenant};

/// In-memory implementation of every collaborator trait
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Records>>,
    /// Successful document writes since creation
    writes: Arc<AtomicUsize>,
    /// Failure to return from the next document write
    next_write_failure: Arc<Mutex<Option<WriteFailure>>>,
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let records = self.records.read();
        f.debug_struct("MemoryStore")
            .field("group_count", &records.groups.len())
            .field("attribute_count", &records.attributes.len())
            .field("item_count", &records.items.len())
            .field("writes", &self.writes.load(Ordering::Relaxed))
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Records) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            ..Self::default()
        }
    }

    /// Register a catalog item
    pub fn add_item(&self, tenant: &Tenant, item: CatalogItem) -> Result<(), StoreError> {
        self.records.write().add_item(tenant, item)
    }

    /// Seed an item's persisted document text as-is (no validation)
    pub fn set_raw_document(&self, item_id: &ItemId, raw: &str) {
        if let Some(stored) = self
            .records
            .write()
            .items
            .iter_mut()
            .find(|s| &s.item.id == item_id)
        {
            stored.attribute_config = Some(raw.to_string());
        }
    }

    /// Current persisted document text for an item
    pub fn document(&self, item_id: &ItemId) -> Option<String> {
        self.records
            .read()
            .items
            .iter()
            .find(|s| &s.item.id == item_id)
            .and_then(|s| s.attribute_config.clone())
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next document write fail with `failure`
    pub fn fail_next_write(&self, failure: WriteFailure) {
        *self.next_write_failure.lock() = Some(failure);
    }

    pub fn snapshot(&self) -> Records {
        self.records.read().clone()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn list_groups(&self, tenant: &Tenant) -> Result<Vec<Group>, StoreError> {
        Ok(self.records.read().list_groups(tenant))
    }

    async fn list_attributes(&self, tenant: &Tenant) -> Result<Vec<Attribute>, StoreError> {
        Ok(self.records.read().list_attributes(tenant))
    }

    async fn create_group(&self, tenant: &Tenant, name: &str) -> Result<Group, StoreError> {
        self.records.write().create_group(tenant, name)
    }

    async fn rename_group(
        &self,
        tenant: &Tenant,
        id: &GroupId,
        name: &str,
    ) -> Result<Group, StoreError> {
        self.records.write().rename_group(tenant, id, name)
    }

    async fn delete_group(&self, tenant: &Tenant, id: &GroupId) -> Result<(), StoreError> {
        self.records.write().delete_group(tenant, id)
    }

    async fn create_attribute(
        &self,
        tenant: &Tenant,
        name: &str,
        groups: &[GroupId],
    ) -> Result<Attribute, StoreError> {
        self.records.write().create_attribute(tenant, name, groups)
    }

    async fn update_attribute(
        &self,
        tenant: &Tenant,
        id: &AttributeId,
        name: &str,
        groups: &[GroupId],
    ) -> Result<Attribute, StoreError> {
        self.records.write().update_attribute(tenant, id, name, groups)
    }

    async fn delete_attribute(&self, tenant: &Tenant, id: &AttributeId) -> Result<(), StoreError> {
        self.records.write().delete_attribute(tenant, id)
    }
}

#[async_trait]
impl CatalogClient for MemoryStore {
    async fn item_by_handle(&self, tenant: &Tenant, handle: &str) -> Result<ItemRecord, StoreError> {
        self.records.read().item_by_handle(tenant, handle)
    }

    async fn list_items(&self, tenant: &Tenant, filter: &ItemFilter) -> Result<ItemPage, StoreError> {
        Ok(self.records.read().list_items(tenant, filter))
    }
}

#[async_trait]
impl DocumentWriter for MemoryStore {
    async fn write_document(&self, item_id: &ItemId, blob: &str) -> Result<(), WriteFailure> {
        if let Some(failure) = self.next_write_failure.lock().take() {
            return Err(failure);
        }
        self.records.write().write_document(item_id, blob)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemStatus;

    fn shirt() -> CatalogItem {
        CatalogItem {
            id: ItemId::new("gid://item/1"),
            handle: "blue-shirt".to_string(),
            title: "Blue Shirt".to_string(),
            status: ItemStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = MemoryStore::new();
        let tenant = Tenant::new("shop-1");
        let other = store.clone();

        store.create_group(&tenant, "Size").await.unwrap();
        assert_eq!(other.list_groups(&tenant).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_copy() {
        let store = MemoryStore::new();
        let tenant = Tenant::new("shop-1");
        store.create_group(&tenant, "Size").await.unwrap();

        let copy = MemoryStore::from_records(store.snapshot());
        assert_eq!(copy.list_groups(&tenant).await.unwrap(), store.list_groups(&tenant).await.unwrap());

        copy.create_group(&tenant, "Material").await.unwrap();
        assert_eq!(store.list_groups(&tenant).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_item_lookup_is_tenant_scoped() {
        let store = MemoryStore::new();
        store.add_item(&Tenant::new("shop-1"), shirt()).unwrap();

        let record = store.item_by_handle(&Tenant::new("shop-1"), "blue-shirt").await.unwrap();
        assert_eq!(record.item.title, "Blue Shirt");
        assert_eq!(record.document, None);

        let err = store
            .item_by_handle(&Tenant::new("shop-2"), "blue-shirt")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "Item", .. }));
    }

    #[tokio::test]
    async fn test_write_document_counts_and_injected_failure() {
        let store = MemoryStore::new();
        let item = shirt();
        store.add_item(&Tenant::new("shop-1"), item.clone()).unwrap();

        store.write_document(&item.id, r#"{"Size":{"Width":"1"}}"#).await.unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.document(&item.id).as_deref(), Some(r#"{"Size":{"Width":"1"}}"#));

        store.fail_next_write(WriteFailure::Transport("connection reset".into()));
        let err = store.write_document(&item.id, "{}").await.unwrap_err();
        assert_eq!(err, WriteFailure::Transport("connection reset".into()));
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.document(&item.id).as_deref(), Some(r#"{"Size":{"Width":"1"}}"#));
    }
}
