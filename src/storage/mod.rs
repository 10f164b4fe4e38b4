//! External collaborator contracts
//!
//! The engine never talks to a database or a remote catalog directly; it goes
//! through these traits. Two implementations ship with the crate:
//! - **memory**: `MemoryStore`, everything behind an `RwLock` (tests, embedding)
//! - **file**: `FileStore`, the same records persisted to a JSON file (CLI)

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::{StoreError, WriteFailure};
use crate::types::{Attribute, AttributeId, CatalogItem, Group, GroupId, ItemId, ItemStatus, Tenant};

pub mod file;
pub mod memory;
mod records;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use records::{Records, StoredItem};

/// Tenant-scoped Group/Attribute records
///
/// Update and delete answer `StoreError::Unauthorized` when the id is not
/// visible under the caller's tenant, whether or not it exists elsewhere.
#[async_trait]
pub trait EntityStore: Debug + Send + Sync {
    async fn list_groups(&self, tenant: &Tenant) -> Result<Vec<Group>, StoreError>;

    /// Attributes with their group refs, restricted to the tenant's groups
    async fn list_attributes(&self, tenant: &Tenant) -> Result<Vec<Attribute>, StoreError>;

    async fn create_group(&self, tenant: &Tenant, name: &str) -> Result<Group, StoreError>;

    async fn rename_group(
        &self,
        tenant: &Tenant,
        id: &GroupId,
        name: &str,
    ) -> Result<Group, StoreError>;

    /// Delete a group and drop it from every attribute's membership
    async fn delete_group(&self, tenant: &Tenant, id: &GroupId) -> Result<(), StoreError>;

    async fn create_attribute(
        &self,
        tenant: &Tenant,
        name: &str,
        groups: &[GroupId],
    ) -> Result<Attribute, StoreError>;

    /// Rename an attribute and replace its group membership
    async fn update_attribute(
        &self,
        tenant: &Tenant,
        id: &AttributeId,
        name: &str,
        groups: &[GroupId],
    ) -> Result<Attribute, StoreError>;

    async fn delete_attribute(&self, tenant: &Tenant, id: &AttributeId) -> Result<(), StoreError>;
}

/// Catalog item together with its persisted configuration text, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub item: CatalogItem,
    pub document: Option<String>,
}

/// Catalog listing filter
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Case-insensitive substring of the title
    pub query: Option<String>,
    /// Empty means every status
    pub statuses: Vec<ItemStatus>,
    /// 1-based page number
    pub page: usize,
}

impl ItemFilter {
    pub fn matches(&self, item: &CatalogItem) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&item.status);
        let query_ok = match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(q) => item.title.to_lowercase().contains(&q.to_lowercase()),
        };
        status_ok && query_ok
    }
}

/// One page of catalog items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPage {
    pub items: Vec<CatalogItem>,
    pub page: usize,
    pub total: usize,
    pub has_next: bool,
}

/// Catalog item lookup
#[async_trait]
pub trait CatalogClient: Debug + Send + Sync {
    /// Item identity plus persisted document; `NotFound` when the handle is unknown
    async fn item_by_handle(&self, tenant: &Tenant, handle: &str) -> Result<ItemRecord, StoreError>;

    async fn list_items(&self, tenant: &Tenant, filter: &ItemFilter) -> Result<ItemPage, StoreError>;
}

/// Idempotent overwrite of an item's configuration document
#[async_trait]
pub trait DocumentWriter: Debug + Send + Sync {
    async fn write_document(&self, item_id: &ItemId, blob: &str) -> Result<(), WriteFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, status: ItemStatus) -> CatalogItem {
        CatalogItem {
            id: ItemId::new(format!("item/{title}")),
            handle: title.to_lowercase(),
            title: title.to_string(),
            status,
        }
    }

    #[test]
    fn test_item_filter_query_and_status() {
        let filter = ItemFilter {
            query: Some("SHIRT".to_string()),
            statuses: vec![ItemStatus::Active],
            page: 1,
        };
        assert!(filter.matches(&item("Blue Shirt", ItemStatus::Active)));
        assert!(!filter.matches(&item("Blue Shirt", ItemStatus::Draft)));
        assert!(!filter.matches(&item("Hat", ItemStatus::Active)));
    }

    #[test]
    fn test_item_filter_default_matches_everything() {
        let filter = ItemFilter::default();
        assert!(filter.matches(&item("Anything", ItemStatus::Archived)));
    }
}
