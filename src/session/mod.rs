//! Editing session for one catalog item
//!
//! Ties the lookups, the selection store and the baseline together and keeps
//! the derived document in sync with every mutation:
//! - **store**: selected groups and attribute values
//! - **validator**: per-group completeness errors
//! - **gate**: change detection and the save path

pub mod gate;
pub mod store;
pub mod validator;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::Lookups;
use crate::document::{self, ConfigDocument, ParsedState};
use crate::error::{ParseError, SaveError, SessionError, ValidationErrors};
use crate::storage::{CatalogClient, DocumentWriter, EntityStore};
use crate::types::{Attribute, AttributeId, CatalogItem, GroupId, Tenant};

pub use gate::{Baseline, SaveOutcome, has_changes};
pub use store::SelectionStore;
pub use validator::validate;

/// One selected group as shown in the editing form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView<'a> {
    pub id: &'a GroupId,
    pub name: &'a str,
    pub fields: Vec<FieldView<'a>>,
}

/// One attribute field inside a [`GroupView`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView<'a> {
    pub attribute: &'a Attribute,
    /// Current value, `""` when unset
    pub value: &'a str,
}

/// In-memory state of one item's configuration editor
#[derive(Debug, Clone)]
pub struct EditingSession {
    item: CatalogItem,
    lookups: Lookups,
    store: SelectionStore,
    baseline: Baseline,
}

impl EditingSession {
    /// Start a session from the persisted document text (`None` = nothing saved yet)
    pub fn new(
        item: CatalogItem,
        lookups: Lookups,
        persisted: Option<&str>,
    ) -> Result<Self, ParseError> {
        let parsed = match persisted.map(str::trim) {
            None | Some("") => ParsedState::default(),
            Some(raw) => document::deserialize(raw, &lookups)?,
        };

        let store = SelectionStore::from_parsed(parsed);
        let baseline = Baseline::new(
            store.values().clone(),
            document::serialize(store.selected(), store.values(), &lookups),
        );
        Ok(Self {
            item,
            lookups,
            store,
            baseline,
        })
    }

    pub fn item(&self) -> &CatalogItem {
        &self.item
    }

    pub fn lookups(&self) -> &Lookups {
        &self.lookups
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    // ==========================================================================
    // Mutations
    // ==========================================================================

    pub fn toggle_group(&mut self, group_id: &GroupId) -> bool {
        self.store.toggle_group(group_id, &self.lookups)
    }

    /// Toggle by group name; `None` when the name is unknown
    pub fn toggle_group_by_name(&mut self, name: &str) -> Option<bool> {
        let id = self.lookups.group_id(name)?.clone();
        Some(self.toggle_group(&id))
    }

    pub fn set_value(&mut self, attribute_id: AttributeId, value: impl Into<String>) {
        self.store.set_value(attribute_id, value);
    }

    /// Set by attribute name; returns false when the name is unknown
    pub fn set_value_by_name(&mut self, attribute_name: &str, value: impl Into<String>) -> bool {
        match self.lookups.attribute_id(attribute_name) {
            Some(id) => {
                let id = id.clone();
                self.store.set_value(id, value);
                true
            }
            None => false,
        }
    }

    /// Apply text from the raw editor
    ///
    /// Unparseable text leaves the session untouched and hands back the error
    /// so the caller can show it while the operator keeps typing.
    pub fn apply_raw_text(&mut self, raw: &str) -> Result<ParsedState, ParseError> {
        let parsed = match document::deserialize(raw, &self.lookups) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "Ignoring unparseable raw document edit");
                return Err(err);
            }
        };

        self.store.apply_parsed_state(parsed.clone(), &self.lookups);
        Ok(parsed)
    }

    // ==========================================================================
    // Derived views
    // ==========================================================================

    pub fn document(&self) -> ConfigDocument {
        document::serialize(self.store.selected(), self.store.values(), &self.lookups)
    }

    /// Pretty text for the raw editor
    pub fn raw_text(&self) -> String {
        self.document().to_pretty_string()
    }

    pub fn validate(&self) -> ValidationErrors {
        validator::validate(self.store.selected(), self.store.values(), &self.lookups)
    }

    pub fn has_changes(&self) -> bool {
        self.baseline.differs(self.store.values(), &self.document())
    }

    /// Whether the save action should be enabled right now
    pub fn can_save(&self) -> bool {
        self.has_changes() && self.validate().is_empty()
    }

    /// Selected groups with their current member attributes, in selection order
    pub fn grouped_attributes(&self) -> Vec<GroupView<'_>> {
        self.store
            .selected()
            .iter()
            .filter_map(|group_id| {
                let name = self.lookups.group_name(group_id)?;
                let fields = self
                    .lookups
                    .attributes_of_group(group_id)
                    .map(|attribute| FieldView {
                        attribute,
                        value: self.store.value(&attribute.id).unwrap_or(""),
                    })
                    .collect();
                Some(GroupView {
                    id: group_id,
                    name,
                    fields,
                })
            })
            .collect()
    }

    // ==========================================================================
    // Persistence
    // ==========================================================================

    pub async fn save<W>(&mut self, writer: &W) -> Result<SaveOutcome, SaveError>
    where
        W: DocumentWriter + ?Sized,
    {
        gate::save(
            writer,
            &self.item.id,
            &self.store,
            &self.lookups,
            &mut self.baseline,
        )
        .await
    }
}

/// Open an editing session for the item with `handle`
///
/// Loads the tenant's groups and attributes, looks the item up and parses its
/// persisted document into the initial editing state.
pub async fn load_session<E, C>(
    entities: &E,
    catalog: &C,
    tenant: &Tenant,
    handle: &str,
) -> Result<EditingSession, SessionError>
where
    E: EntityStore + ?Sized,
    C: CatalogClient + ?Sized,
{
    let record = catalog.item_by_handle(tenant, handle).await?;
    let groups = entities.list_groups(tenant).await?;
    let attributes = entities.list_attributes(tenant).await?;
    let lookups = Lookups::new(groups, attributes);

    let item_id = record.item.id.clone();
    let session = EditingSession::new(record.item, lookups, record.document.as_deref())
        .map_err(|source| SessionError::MalformedDocument {
            item: item_id.to_string(),
            source,
        })?;

    info!(
        tenant = %tenant,
        item = %item_id,
        selected = session.store().selected().len(),
        values = session.store().values().len(),
        "Opened editing session"
    );
    Ok(session)
}

/// Session shared between tasks with saves serialized
///
/// Edits wait for the lock; a save requested while another save is still in
/// flight is rejected with `SaveError::SaveInProgress` instead of queueing
/// behind it, so the baseline is never advanced from a stale snapshot.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<EditingSession>>,
    saving: Arc<AtomicBool>,
}

struct SavingFlag<'a>(&'a AtomicBool);

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SharedSession {
    pub fn new(session: EditingSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
            saving: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run an edit (or read) against the session
    pub async fn with<R>(&self, f: impl FnOnce(&mut EditingSession) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut *guard)
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    pub async fn save<W>(&self, writer: &W) -> Result<SaveOutcome, SaveError>
    where
        W: DocumentWriter + ?Sized,
    {
        if self
            .saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejecting save while another save is in flight");
            return Err(SaveError::SaveInProgress);
        }
        let _flag = SavingFlag(&self.saving);

        let mut guard = self.inner.lock().await;
        guard.save(writer).await
    }
}
