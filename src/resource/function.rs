//! Function resource: plans against the state record, applies through the engine.

use crate::error::ProviderError;
use crate::function::changes::{ChangeSet, replace_reasons, unmanaged_changes};
use crate::function::{CodeSource, FunctionEngine, FunctionSpec, FunctionState};
use crate::state::{FunctionRecord, StateStore};
use anyhow::{Context, Result};
use declarative::{Action, ApplyContext, ApplyResult, Resource};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const RESOURCE_TYPE: &str = "function";

/// One function: its desired spec (absent when it should be destroyed) and
/// the shared engine and state store.
pub struct FunctionResource {
    name: String,
    desired: Option<FunctionSpec>,
    engine: FunctionEngine,
    store: Arc<StateStore>,
}

impl FunctionResource {
    pub fn new(
        name: impl Into<String>,
        desired: Option<FunctionSpec>,
        engine: FunctionEngine,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            name: name.into(),
            desired,
            engine,
            store,
        }
    }

    fn desired(&self) -> Result<&FunctionSpec> {
        self.desired
            .as_ref()
            .with_context(|| format!("No desired state for function {}", self.name))
    }

    fn record(&self) -> Result<FunctionRecord> {
        self.store
            .function(&self.name)
            .with_context(|| format!("No state recorded for function {}", self.name))
    }

    fn save(&self, spec: &FunctionSpec, observed: FunctionState, tainted: bool) -> Result<()> {
        self.store.put_function(
            &self.name,
            FunctionRecord {
                id: observed.id.clone(),
                spec: spec.clone(),
                observed: Some(observed),
                tainted,
            },
        )
    }

    fn create(&self, ctx: &ApplyContext) -> Result<()> {
        let spec = self.desired()?;
        // Recorded as tainted until the rollout is confirmed.
        let observed = self.engine.create(spec, &ctx.cancel, |created| {
            self.save(spec, created.clone(), true)
                .map_err(|e| ProviderError::State(format!("{e:#}")))
        })?;
        self.save(spec, observed, false)
    }

    fn destroy(&self, record: &FunctionRecord, ctx: &ApplyContext) -> Result<()> {
        self.engine.delete(&record.id, &ctx.cancel)?;
        self.store.remove_function(&self.name)?;
        Ok(())
    }

    fn update(&self, ctx: &ApplyContext) -> Result<()> {
        let spec = self.desired()?;
        let record = self.record()?;
        match self.engine.update(&record.id, &record.spec, spec, &ctx.cancel) {
            Ok(observed) => self.save(spec, observed, false),
            Err(e) if e.is_not_found() => {
                log::warn!(
                    "Function {} ({}) no longer exists; dropping it from state",
                    self.name,
                    record.id
                );
                self.store.remove_function(&self.name)?;
                Err(e.into())
            }
            // The record keeps the previous spec, so groups that did go
            // through are sent again on the next apply.
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for FunctionResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionResource")
            .field("name", &self.name)
            .field("desired", &self.desired)
            .finish_non_exhaustive()
    }
}

impl Resource for FunctionResource {
    fn address(&self) -> String {
        format!("{RESOURCE_TYPE}.{}", self.name)
    }

    fn description(&self) -> String {
        match &self.desired {
            Some(spec) => {
                let code = spec
                    .code
                    .as_ref()
                    .map_or_else(|| "no code".to_string(), CodeSource::label);
                format!("{} function, {code}", spec.runtime)
            }
            None => match self.store.function(&self.name) {
                Some(record) => format!("{} function {}", record.spec.runtime, record.id),
                None => "function".to_string(),
            },
        }
    }

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    /// Functions bind secrets, so they come after them.
    fn tier(&self) -> u8 {
        1
    }

    fn plan(&self) -> Result<Action> {
        let record = self.store.function(&self.name);
        let action = match (record, &self.desired) {
            (None, None) => Action::NoChange,
            (None, Some(_)) => Action::Create,
            (Some(_), None) => Action::Delete,
            (Some(record), Some(_)) if record.tainted => Action::Replace {
                reasons: vec!["tainted".to_string()],
            },
            (Some(record), Some(spec)) => {
                let reasons = replace_reasons(&record.spec, spec);
                if !reasons.is_empty() {
                    Action::Replace { reasons }
                } else {
                    for field in unmanaged_changes(&record.spec, spec) {
                        log::warn!(
                            "function.{}: {field} cannot be changed on an existing function; the change is not sent",
                            self.name
                        );
                    }
                    let changes = ChangeSet::between(&record.spec, spec);
                    if changes.is_empty() {
                        Action::NoChange
                    } else {
                        Action::Update {
                            changes: changes.names(),
                        }
                    }
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
                self.create(ctx)
                    .with_context(|| format!("Failed to create function {}", self.name))?;
                Ok(ApplyResult::Created)
            }
            Action::Update { .. } => {
                self.update(ctx)
                    .with_context(|| format!("Failed to update function {}", self.name))?;
                Ok(ApplyResult::Updated)
            }
            Action::Replace { .. } => {
                let record = self.record()?;
                self.destroy(&record, ctx)
                    .with_context(|| format!("Failed to delete function {} for replacement", self.name))?;
                self.create(ctx)
                    .with_context(|| format!("Failed to recreate function {}", self.name))?;
                Ok(ApplyResult::Replaced)
            }
            Action::Delete => {
                let record = self.record()?;
                self.destroy(&record, ctx)
                    .with_context(|| format!("Failed to delete function {}", self.name))?;
                Ok(ApplyResult::Deleted)
            }
        }
    }

    fn details(&self, action: &Action) -> Vec<String> {
        let (Some(record), Some(spec)) = (self.store.function(&self.name), &self.desired) else {
            return Vec::new();
        };
        let previous = &record.spec;
        let mut lines = Vec::new();

        match action {
            Action::Replace { reasons } => {
                if reasons.iter().any(|r| r == "name") {
                    lines.push(format!("name: {} -> {}", previous.name, spec.name));
                }
                if reasons.iter().any(|r| r == "runtime") {
                    lines.push(format!("runtime: {} -> {}", previous.runtime, spec.runtime));
                }
            }
            Action::Update { .. } => {
                lines.extend(code_lines(previous, spec));
                lines.extend(config_lines(previous, spec));
                lines.extend(map_lines("environment", &previous.environment, &spec.environment));
                if previous.secrets != spec.secrets {
                    lines.push(format!(
                        "secrets: [{}] -> [{}]",
                        previous.secrets.join(", "),
                        spec.secrets.join(", ")
                    ));
                }
                lines.extend(map_lines("labels", &previous.labels, &spec.labels));
                lines.extend(map_lines("annotations", &previous.annotations, &spec.annotations));
            }
            _ => {}
        }

        for field in unmanaged_changes(previous, spec) {
            lines.push(format!("! {field} changed but cannot be applied in place"));
        }
        lines
    }
}

fn code_lines(previous: &FunctionSpec, next: &FunctionSpec) -> Vec<String> {
    let mut lines = Vec::new();
    if previous.handler != next.handler {
        lines.push(format!("handler: {} -> {}", previous.handler, next.handler));
    }
    if previous.requirements != next.requirements {
        lines.push("requirements changed".to_string());
    }
    match (&previous.code, &next.code) {
        (a, b) if a == b => {}
        (Some(CodeSource::Inline(old)), Some(CodeSource::Inline(new))) => {
            let diff = similar::TextDiff::from_lines(old.as_str(), new.as_str());
            for change in diff.iter_all_changes() {
                let sign = match change.tag() {
                    similar::ChangeTag::Delete => "-",
                    similar::ChangeTag::Insert => "+",
                    similar::ChangeTag::Equal => continue,
                };
                lines.push(format!("{sign} {}", change.value().trim_end_matches('\n')));
            }
        }
        (a, b) => {
            let label = |c: &Option<CodeSource>| c.as_ref().map_or_else(|| "none".to_string(), CodeSource::label);
            lines.push(format!("code: {} -> {}", label(a), label(b)));
        }
    }
    lines
}

fn config_lines(previous: &FunctionSpec, next: &FunctionSpec) -> Vec<String> {
    let (Some(a), Some(b)) = (previous.config, next.config) else {
        return if previous.config == next.config {
            Vec::new()
        } else {
            vec![format!(
                "config: {} -> {}",
                if previous.config.is_some() { "set" } else { "unset" },
                if next.config.is_some() { "set" } else { "unset (defaults)" }
            )]
        };
    };
    let mut lines = Vec::new();
    for (field, old, new) in [
        ("memory_mb", a.memory_mb, b.memory_mb),
        ("timeout_seconds", a.timeout_seconds, b.timeout_seconds),
        ("replicas", a.replicas, b.replicas),
    ] {
        if old != new {
            lines.push(format!("config.{field}: {old} -> {new}"));
        }
    }
    lines
}

fn map_lines(
    what: &str,
    previous: &BTreeMap<String, String>,
    next: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (key, value) in next {
        match previous.get(key) {
            None => lines.push(format!("+ {what}.{key} = {value}")),
            Some(old) if old != value => lines.push(format!("~ {what}.{key}: {old} -> {value}")),
            Some(_) => {}
        }
    }
    for key in previous.keys().filter(|k| !next.contains_key(*k)) {
        lines.push(format!("- {what}.{key}"));
    }
    lines
}
