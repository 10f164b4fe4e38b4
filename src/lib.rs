//! Attribute-group configuration engine
//!
//! Keeps three views of a catalog item's attribute configuration in step:
//! the tenant's Group/Attribute records, the in-memory editing state, and the
//! persisted name-keyed JSON document.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod session;
pub mod storage;
pub mod types;

pub use catalog::Lookups;
pub use document::{ConfigDocument, ParsedState, deserialize, serialize};
pub use error::{ParseError, SaveError, SessionError, StoreError, ValidationErrors, WriteFailure};
pub use session::{EditingSession, SaveOutcome, SelectionStore, SharedSession, load_session};
pub use types::{Attribute, AttributeId, CatalogItem, Group, GroupId, ItemId, Tenant};
