//! Record set shared by the memory and file stores
//!
//! All tenant checks and membership bookkeeping live here so both backends
//! behave identically; the backends only decide where the records are kept.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ItemFilter, ItemPage, ItemRecord};
use crate::constants::{listing, messages, metafield};
use crate::error::{FieldError, StoreError, WriteFailure};
use crate::types::{
    Attribute, AttributeId, CatalogItem, Group, GroupId, GroupRef, ItemId, Tenant,
};

/// Catalog item as stored, with its configuration metafield
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub tenant: Tenant,
    #[serde(flatten)]
    pub item: CatalogItem,
    /// Raw value of the `custom.attribute_config` metafield
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_config: Option<String>,
}

/// Every record the stores know about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Records {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub items: Vec<StoredItem>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn required_name(name: &str, message: &str) -> Result<String, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::invalid(message));
    }
    Ok(name.to_string())
}

impl Records {
    // ==========================================================================
    // Groups
    // ==========================================================================

    pub fn list_groups(&self, tenant: &Tenant) -> Vec<Group> {
        self.groups
            .iter()
            .filter(|g| &g.tenant == tenant)
            .cloned()
            .collect()
    }

    fn owned_group(&self, tenant: &Tenant, id: &GroupId) -> Result<usize, StoreError> {
        self.groups
            .iter()
            .position(|g| &g.id == id && &g.tenant == tenant)
            .ok_or_else(|| StoreError::unauthorized("Group", id))
    }

    pub fn create_group(&mut self, tenant: &Tenant, name: &str) -> Result<Group, StoreError> {
        let name = required_name(name, messages::GROUP_NAME_REQUIRED)?;
        let group = Group {
            id: GroupId::new(new_id()),
            name,
            tenant: tenant.clone(),
        };
        info!(tenant = %tenant, group = %group.name, id = %group.id, "Created group");
        self.groups.push(group.clone());
        Ok(group)
    }

    pub fn rename_group(
        &mut self,
        tenant: &Tenant,
        id: &GroupId,
        name: &str,
    ) -> Result<Group, StoreError> {
        let index = self.owned_group(tenant, id)?;
        let name = required_name(name, messages::GROUP_NAME_REQUIRED)?;

        self.groups[index].name = name.clone();
        for attr in self.attributes.iter_mut() {
            for group_ref in attr.groups.iter_mut().filter(|r| &r.id == id) {
                group_ref.name = name.clone();
            }
        }

        info!(tenant = %tenant, id = %id, group = %name, "Renamed group");
        Ok(self.groups[index].clone())
    }

    pub fn delete_group(&mut self, tenant: &Tenant, id: &GroupId) -> Result<(), StoreError> {
        let index = self.owned_group(tenant, id)?;
        let removed = self.groups.remove(index);

        let mut detached = 0;
        for attr in self.attributes.iter_mut() {
            let before = attr.groups.len();
            attr.groups.retain(|r| &r.id != id);
            detached += before - attr.groups.len();
        }

        info!(tenant = %tenant, id = %id, group = %removed.name, detached, "Deleted group");
        Ok(())
    }

    // ==========================================================================
    // Attributes
    // ==========================================================================

    pub fn list_attributes(&self, tenant: &Tenant) -> Vec<Attribute> {
        self.attributes
            .iter()
            .filter(|a| &a.tenant == tenant)
            .map(|a| {
                let mut attr = a.clone();
                attr.groups
                    .retain(|r| self.groups.iter().any(|g| g.id == r.id && &g.tenant == tenant));
                attr
            })
            .collect()
    }

    fn owned_attribute(&self, tenant: &Tenant, id: &AttributeId) -> Result<usize, StoreError> {
        self.attributes
            .iter()
            .position(|a| &a.id == id && &a.tenant == tenant)
            .ok_or_else(|| StoreError::unauthorized("Attribute", id))
    }

    /// Resolve group ids to refs, all of which must belong to the tenant
    fn group_refs(&self, tenant: &Tenant, ids: &[GroupId]) -> Result<Vec<GroupRef>, StoreError> {
        let mut refs: Vec<GroupRef> = Vec::with_capacity(ids.len());
        for id in ids {
            let index = self.owned_group(tenant, id)?;
            if !refs.iter().any(|r| &r.id == id) {
                refs.push(GroupRef::from(&self.groups[index]));
            }
        }
        Ok(refs)
    }

    pub fn create_attribute(
        &mut self,
        tenant: &Tenant,
        name: &str,
        groups: &[GroupId],
    ) -> Result<Attribute, StoreError> {
        let name = required_name(name, messages::ATTRIBUTE_NAME_REQUIRED)?;
        let groups = self.group_refs(tenant, groups)?;
        let attr = Attribute {
            id: AttributeId::new(new_id()),
            name,
            tenant: tenant.clone(),
            groups,
        };
        info!(tenant = %tenant, attribute = %attr.name, id = %attr.id, groups = attr.groups.len(), "Created attribute");
        self.attributes.push(attr.clone());
        Ok(attr)
    }

    pub fn update_attribute(
        &mut self,
        tenant: &Tenant,
        id: &AttributeId,
        name: &str,
        groups: &[GroupId],
    ) -> Result<Attribute, StoreError> {
        let index = self.owned_attribute(tenant, id)?;
        let name = required_name(name, messages::ATTRIBUTE_NAME_REQUIRED)?;
        let groups = self.group_refs(tenant, groups)?;

        let attr = &mut self.attributes[index];
        attr.name = name;
        attr.groups = groups;

        info!(tenant = %tenant, id = %id, attribute = %attr.name, groups = attr.groups.len(), "Updated attribute");
        Ok(attr.clone())
    }

    pub fn delete_attribute(&mut self, tenant: &Tenant, id: &AttributeId) -> Result<(), StoreError> {
        let index = self.owned_attribute(tenant, id)?;
        let removed = self.attributes.remove(index);
        info!(tenant = %tenant, id = %id, attribute = %removed.name, "Deleted attribute");
        Ok(())
    }

    // ==========================================================================
    // Catalog items
    // ==========================================================================

    /// Register a catalog item (bootstrap for the local stores)
    pub fn add_item(&mut self, tenant: &Tenant, item: CatalogItem) -> Result<(), StoreError> {
        if self
            .items
            .iter()
            .any(|s| &s.tenant == tenant && s.item.handle == item.handle)
        {
            return Err(StoreError::invalid(format!(
                "Item handle '{}' already exists",
                item.handle
            )));
        }
        self.items.push(StoredItem {
            tenant: tenant.clone(),
            item,
            attribute_config: None,
        });
        Ok(())
    }

    pub fn item_by_handle(&self, tenant: &Tenant, handle: &str) -> Result<ItemRecord, StoreError> {
        self.items
            .iter()
            .find(|s| &s.tenant == tenant && s.item.handle == handle)
            .map(|s| ItemRecord {
                item: s.item.clone(),
                document: s.attribute_config.clone(),
            })
            .ok_or_else(|| StoreError::not_found("Item", handle))
    }

    pub fn list_items(&self, tenant: &Tenant, filter: &ItemFilter) -> ItemPage {
        let matching: Vec<&CatalogItem> = self
            .items
            .iter()
            .filter(|s| &s.tenant == tenant)
            .map(|s| &s.item)
            .filter(|item| filter.matches(item))
            .collect();

        let page = filter.page.max(1);
        let start = (page - 1).saturating_mul(listing::PAGE_SIZE);
        let items: Vec<CatalogItem> = matching
            .iter()
            .skip(start)
            .take(listing::PAGE_SIZE)
            .map(|item| (*item).clone())
            .collect();

        ItemPage {
            has_next: start.saturating_add(items.len()) < matching.len(),
            items,
            page,
            total: matching.len(),
        }
    }

    /// Overwrite an item's configuration metafield
    ///
    /// Mirrors the remote `metafieldsSet` contract: unknown owners and values
    /// that are not JSON come back as field-level errors.
    pub fn write_document(&mut self, item_id: &ItemId, blob: &str) -> Result<(), WriteFailure> {
        if serde_json::from_str::<serde_json::Value>(blob).is_err() {
            return Err(WriteFailure::Rejected(vec![FieldError {
                field: Some(vec!["metafields".into(), "0".into(), "value".into()]),
                message: format!("Value must be valid {}", metafield::VALUE_TYPE),
            }]));
        }

        let Some(stored) = self.items.iter_mut().find(|s| &s.item.id == item_id) else {
            return Err(WriteFailure::Rejected(vec![FieldError {
                field: Some(vec!["metafields".into(), "0".into(), "ownerId".into()]),
                message: format!("Owner {item_id} does not exist"),
            }]));
        };

        stored.attribute_config = Some(blob.to_string());
        debug!(
            item = %item_id,
            namespace = metafield::NAMESPACE,
            key = metafield::KEY,
            bytes = blob.len(),
            "Wrote configuration metafield"
        );
        Ok(())
    }
}
