//! Wire-side tenant payloads and their mapping to [`TenantRecord`]

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::tenant::{TenantItems, TenantRecord};

/// Capabilities a remote payload type must offer to be served by the store.
///
/// The payload is owned by the remote service's contract and may carry more
/// fields than these; only the five below are mapped.
pub trait RemoteTenantInfo: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Tag used to pick this type's lookup policy from a registry
    const TYPE_TAG: &'static str;

    fn id(&self) -> &str;
    fn identifier(&self) -> &str;
    fn name(&self) -> &str;
    fn connection_string(&self) -> &str;
    fn items(&self) -> &TenantItems;

    /// Build the canonical record from this payload
    fn to_record(&self) -> TenantRecord {
        TenantRecord::new(
            self.id(),
            self.identifier(),
            self.name(),
            self.connection_string(),
            self.items().clone(),
        )
    }
}

/// Map an optional payload to an optional record; absence stays absence.
pub fn to_tenant_record<P: RemoteTenantInfo>(payload: Option<&P>) -> Option<TenantRecord> {
    payload.map(P::to_record)
}

/// Default wire shape served by the tenant context endpoint
///
/// ```json
/// {"id":"t1","identifier":"acme","name":"Acme","connectionString":"","items":{}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTenantPayload {
    pub id: String,
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub connection_string: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: TenantItems,
}

impl RemoteTenantInfo for RemoteTenantPayload {
    const TYPE_TAG: &'static str = "TenantInfo";

    fn id(&self) -> &str {
        &self.id
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn connection_string(&self) -> &str {
        &self.connection_string
    }

    fn items(&self) -> &TenantItems {
        &self.items
    }
}

impl From<TenantRecord> for RemoteTenantPayload {
    fn from(record: TenantRecord) -> Self {
        Self {
            id: record.id().to_string(),
            identifier: record.identifier().to_string(),
            name: record.name().to_string(),
            connection_string: record.connection_string().to_string(),
            items: record.items().clone(),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TenantItems, D::Error> {
    Ok(Option::<TenantItems>::deserialize(deserializer)?.unwrap_or_default())
}
