//! Secret resource: write-only values referenced by functions.
//!
//! The API has no read verb for secrets, so the state record is the only
//! source of truth. Values are never stored, only their blake3 hash.

use crate::error::{ProviderError, Result};
use crate::state::SecretRecord;
use faaskit::{Client, SecretCreateRequest};

/// Desired state of one secret
#[derive(Clone, PartialEq, Eq)]
pub struct SecretSpec {
    pub name: String,
    pub value: String,
    /// Server default when unset
    pub namespace: Option<String>,
}

impl std::fmt::Debug for SecretSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSpec")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl SecretSpec {
    pub fn value_hash(&self) -> String {
        hash_value(&self.value)
    }
}

/// Hex blake3 digest of a secret value
pub fn hash_value(value: &str) -> String {
    blake3::hash(value.as_bytes()).to_hex().to_string()
}

/// Reasons a recorded secret must be recreated to match `spec`
pub fn replace_reasons(record: &SecretRecord, spec: &SecretSpec) -> Vec<String> {
    let mut reasons = Vec::new();
    if record.value_hash != spec.value_hash() {
        reasons.push("value".to_string());
    }
    if let Some(ns) = &spec.namespace
        && *ns != record.namespace
    {
        reasons.push("namespace".to_string());
    }
    reasons
}

/// Create the secret and build its state record
pub fn create(client: &Client, spec: &SecretSpec) -> Result<SecretRecord> {
    log::debug!("Creating secret {}", spec.name);
    let response = client
        .create_secret(&SecretCreateRequest {
            name: spec.name.clone(),
            value: spec.value.clone(),
            namespace: spec.namespace.clone(),
        })
        .map_err(ProviderError::transport("create secret"))?;

    Ok(SecretRecord {
        id: response.id,
        namespace: response.namespace,
        created_at: response.created_at,
        value_hash: spec.value_hash(),
    })
}

/// Delete the secret. Already gone counts as success.
pub fn delete(client: &Client, name: &str) -> Result<()> {
    log::debug!("Deleting secret {name}");
    client
        .delete_secret(name)
        .map_err(ProviderError::transport("delete secret"))
}
