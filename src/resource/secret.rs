//! Secret resource

use crate::secret::{self, SecretSpec};
use crate::state::{SecretRecord, StateStore};
use anyhow::{Context, Result};
use declarative::{Action, ApplyContext, ApplyResult, Resource};
use faaskit::Client;
use std::sync::Arc;

pub const RESOURCE_TYPE: &str = "secret";

pub struct SecretResource {
    name: String,
    desired: Option<SecretSpec>,
    client: Arc<Client>,
    store: Arc<StateStore>,
}

impl SecretResource {
    pub fn new(
        name: impl Into<String>,
        desired: Option<SecretSpec>,
        client: Arc<Client>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            name: name.into(),
            desired,
            client,
            store,
        }
    }

    fn create(&self) -> Result<()> {
        let spec = self
            .desired
            .as_ref()
            .with_context(|| format!("No desired state for secret {}", self.name))?;
        let record = secret::create(&self.client, spec)?;
        self.store.put_secret(&self.name, record)
    }

    fn destroy(&self) -> Result<()> {
        secret::delete(&self.client, &self.name)?;
        self.store.remove_secret(&self.name)?;
        Ok(())
    }
}

impl std::fmt::Debug for SecretResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResource")
            .field("name", &self.name)
            .field("desired", &self.desired)
            .finish_non_exhaustive()
    }
}

impl Resource for SecretResource {
    fn address(&self) -> String {
        format!("{RESOURCE_TYPE}.{}", self.name)
    }

    fn description(&self) -> String {
        let namespace = self
            .desired
            .as_ref()
            .and_then(|s| s.namespace.clone())
            .or_else(|| self.store.secret(&self.name).map(|r: SecretRecord| r.namespace))
            .filter(|ns| !ns.is_empty());
        match namespace {
            Some(ns) => format!("secret in namespace {ns}"),
            None => "secret".to_string(),
        }
    }

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn plan(&self) -> Result<Action> {
        let action = match (self.store.secret(&self.name), &self.desired) {
            (None, None) => Action::NoChange,
            (None, Some(_)) => Action::Create,
            (Some(_), None) => Action::Delete,
            (Some(record), Some(spec)) => {
                let reasons = secret::replace_reasons(&record, spec);
                if reasons.is_empty() {
                    Action::NoChange
                } else {
                    Action::Replace { reasons }
                }
            }
        };
        Ok(action)
    }

    fn apply(&self, action: &Action, ctx: &ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "dry run".to_string(),
            });
        }

        match action {
            Action::NoChange => Ok(ApplyResult::NoChange),
            Action::Create => {
                self.create()
                    .with_context(|| format!("Failed to create secret {}", self.name))?;
                Ok(ApplyResult::Created)
            }
            // Secrets have no update verb; any change recreates them.
            Action::Update { .. } | Action::Replace { .. } => {
                self.destroy()
                    .and_then(|()| self.create())
                    .with_context(|| format!("Failed to replace secret {}", self.name))?;
                Ok(ApplyResult::Replaced)
            }
            Action::Delete => {
                self.destroy()
                    .with_context(|| format!("Failed to delete secret {}", self.name))?;
                Ok(ApplyResult::Deleted)
            }
        }
    }

    fn details(&self, action: &Action) -> Vec<String> {
        match action {
            Action::Replace { reasons } if reasons.iter().any(|r| r == "value") => {
                vec!["value changed (hidden)".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faaskit::{MockBackend, Verb};

    fn setup() -> (MockBackend, Arc<Client>, Arc<StateStore>) {
        let mock = MockBackend::new();
        let client = Arc::new(Client::with_backend(Box::new(mock.clone())));
        (mock, client, Arc::new(StateStore::in_memory()))
    }

    fn spec(value: &str) -> SecretSpec {
        SecretSpec {
            name: "db-password".into(),
            value: value.into(),
            namespace: None,
        }
    }

    fn resource(client: &Arc<Client>, store: &Arc<StateStore>, desired: Option<SecretSpec>) -> SecretResource {
        SecretResource::new("db-password", desired, Arc::clone(client), Arc::clone(store))
    }

    #[test]
    fn test_secret_lifecycle() {
        let (mock, client, store) = setup();
        let ctx = ApplyContext::new(false, false);

        let r = resource(&client, &store, Some(spec("one")));
        assert_eq!(r.plan().unwrap(), Action::Create);
        assert_eq!(r.apply(&Action::Create, &ctx).unwrap(), ApplyResult::Created);
        assert_eq!(r.plan().unwrap(), Action::NoChange);
        assert_eq!(r.description(), "secret in namespace default");

        let r = resource(&client, &store, None);
        assert_eq!(r.plan().unwrap(), Action::Delete);
        assert_eq!(r.apply(&Action::Delete, &ctx).unwrap(), ApplyResult::Deleted);
        assert!(store.secret("db-password").is_none());
        assert!(mock.secret_names().is_empty());
    }

    #[test]
    fn test_value_change_replaces() {
        let (mock, client, store) = setup();
        let ctx = ApplyContext::new(false, false);
        resource(&client, &store, Some(spec("one")))
            .apply(&Action::Create, &ctx)
            .unwrap();

        let r = resource(&client, &store, Some(spec("two")));
        let action = r.plan().unwrap();
        assert_eq!(
            action,
            Action::Replace {
                reasons: vec!["value".into()]
            }
        );
        assert_eq!(r.details(&action), vec!["value changed (hidden)"]);
        assert_eq!(r.apply(&action, &ctx).unwrap(), ApplyResult::Replaced);

        assert_eq!(mock.count(Verb::DeleteSecret), 1);
        assert_eq!(mock.count(Verb::CreateSecret), 2);
        assert_eq!(
            store.secret("db-password").unwrap().value_hash,
            secret::hash_value("two")
        );
        assert_eq!(r.plan().unwrap(), Action::NoChange);
    }

    #[test]
    fn test_create_conflict_is_reported() {
        let (mock, client, store) = setup();
        let ctx = ApplyContext::new(false, false);
        resource(&client, &store, Some(spec("one")))
            .apply(&Action::Create, &ctx)
            .unwrap();
        store.remove_secret("db-password").unwrap();

        let err = resource(&client, &store, Some(spec("one")))
            .apply(&Action::Create, &ctx)
            .unwrap_err();
        assert!(format!("{err:#}").contains("status=409"));
        assert_eq!(mock.count(Verb::CreateSecret), 2);
    }
}
