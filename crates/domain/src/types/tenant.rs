//! Canonical in-process tenant representation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Open set of extra tenant attributes
pub type TenantItems = BTreeMap<String, serde_json::Value>;

/// A resolved tenant.
///
/// Fields are private so a record cannot change after construction; every
/// lookup hands the caller its own instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    id: String,
    identifier: String,
    name: String,
    connection_string: String,
    items: TenantItems,
}

impl TenantRecord {
    pub fn new(
        id: impl Into<String>,
        identifier: impl Into<String>,
        name: impl Into<String>,
        connection_string: impl Into<String>,
        items: TenantItems,
    ) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
            name: name.into(),
            connection_string: connection_string.into(),
            items,
        }
    }

    /// Internal id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Public, human-facing identifier (routing key)
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque connection string; may be empty
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    #[must_use]
    pub fn items(&self) -> &TenantItems {
        &self.items
    }

    /// Look up a single extra attribute
    #[must_use]
    pub fn item(&self, key: &str) -> Option<&serde_json::Value> {
        self.items.get(key)
    }
}
