//! JSON-file store implementation
//!
//! Holds the records in memory and rewrites the whole file after every
//! successful mutation. Used by the CLI as a stand-in for the remote catalog
//! and relational store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::records::Records;
use super::{CatalogClient, DocumentWriter, EntityStore, ItemFilter, ItemPage, ItemRecord};
use crate::error::{StoreError, WriteFailure};
use crate::types::{Attribute, AttributeId, CatalogItem, Group, GroupId, ItemId, Tenant};

pub struct FileStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

impl FileStore {
    /// Open the store at `path`; a missing file starts empty and is created on first write
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let records = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let records: Records = serde_json::from_str(&contents)?;
            info!(
                path = %path.display(),
                groups = records.groups.len(),
                attributes = records.attributes.len(),
                items = records.items.len(),
                "Loaded record store"
            );
            records
        } else {
            info!(path = %path.display(), "Record store not found, starting empty");
            Records::default()
        };

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &Records) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Saved record store");
        Ok(())
    }

    /// Apply a mutation and persist; the in-memory copy is only replaced when the write succeeds
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut Records) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.records.lock();
        let mut next = guard.clone();
        let out = op(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    /// Register a catalog item
    pub fn add_item(&self, tenant: &Tenant, item: CatalogItem) -> Result<(), StoreError> {
        self.mutate(|records| records.add_item(tenant, item))
    }
}

#[async_trait]
impl EntityStore for FileStore {
    async fn list_groups(&self, tenant: &Tenant) -> Result<Vec<Group>, StoreError> {
        Ok(self.records.lock().list_groups(tenant))
    }

    async fn list_attributes(&self, tenant: &Tenant) -> Result<Vec<Attribute>, StoreError> {
        Ok(self.records.lock().list_attributes(tenant))
    }

    async fn create_group(&self, tenant: &Tenant, name: &str) -> Result<Group, StoreError> {
        self.mutate(|records| records.create_group(tenant, name))
    }

    async fn rename_group(
        &self,
        tenant: &Tenant,
        id: &GroupId,
        name: &str,
    ) -> Result<Group, StoreError> {
        self.mutate(|records| records.rename_group(tenant, id, name))
    }

    async fn delete_group(&self, tenant: &Tenant, id: &GroupId) -> Result<(), StoreError> {
        self.mutate(|records| records.delete_group(tenant, id))
    }

    async fn create_attribute(
        &self,
        tenant: &Tenant,
        name: &str,
        groups: &[GroupId],
    ) -> Result<Attribute, StoreError> {
        self.mutate(|records| records.create_attribute(tenant, name, groups))
    }

    async fn update_attribute(
        &self,
        tenant: &Tenant,
        id: &AttributeId,
        name: &str,
        groups: &[GroupId],
    ) -> Result<Attribute, StoreError> {
        self.mutate(|records| records.update_attribute(tenant, id, name, groups))
    }

    async fn delete_attribute(&self, tenant: &Tenant, id: &AttributeId) -> Result<(), StoreError> {
        self.mutate(|records| records.delete_attribute(tenant, id))
    }
}

#[async_trait]
impl CatalogClient for FileStore {
    async fn item_by_handle(&self, tenant: &Tenant, handle: &str) -> Result<ItemRecord, StoreError> {
        self.records.lock().item_by_handle(tenant, handle)
    }

    async fn list_items(&self, tenant: &Tenant, filter: &ItemFilter) -> Result<ItemPage, StoreError> {
        Ok(self.records.lock().list_items(tenant, filter))
    }
}

#[async_trait]
impl DocumentWriter for FileStore {
    async fn write_document(&self, item_id: &ItemId, blob: &str) -> Result<(), WriteFailure> {
        let mut guard = self.records.lock();
        let mut next = guard.clone();
        next.write_document(item_id, blob)?;
        if let Err(err) = self.persist(&next) {
            error!(path = %self.path.display(), error = %err, "Failed to persist document write");
            return Err(WriteFailure::Transport(err.to_string()));
        }
        *guard = next;
        Ok(())
    }
}
