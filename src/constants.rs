//! Application-wide constants
//!
//! This module contains the string literals and limits used throughout
//! the crate, providing a single source of truth for constant values.

/// Where the configuration document lives on the catalog item
pub mod metafield {
    /// Metafield namespace on the catalog item
    pub const NAMESPACE: &str = "custom";

    /// Metafield key holding the configuration document
    pub const KEY: &str = "attribute_config";

    /// Declared metafield value type
    pub const VALUE_TYPE: &str = "json";
}

/// Config and data file locations
pub mod config {
    /// Directory name under the platform config/data dirs
    pub const APP_DIR: &str = "attrcfg";

    /// Application config file name
    pub const FILENAME: &str = "config.json";

    /// Default record store file name
    pub const STORE_FILENAME: &str = "store.json";

    /// Tenant used when nothing else is configured
    pub const DEFAULT_TENANT: &str = "default";
}

/// Environment variable names
pub mod env {
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const TENANT: &str = "ATTRCFG_TENANT";
    pub const DATA: &str = "ATTRCFG_DATA";
}

/// Catalog listing constants
pub mod listing {
    /// Items per page when listing the catalog
    pub const PAGE_SIZE: usize = 20;
}

/// User-facing messages
pub mod messages {
    pub const GROUP_NAME_REQUIRED: &str = "Group name is required";
    pub const ATTRIBUTE_NAME_REQUIRED: &str = "Attribute name is required";

    /// Validation message for a selected group with no filled attribute
    pub fn group_needs_value(group_name: &str) -> String {
        format!("At least one attribute in \"{group_name}\" must be filled.")
    }
}
