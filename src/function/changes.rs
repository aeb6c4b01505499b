//! Change detection between two function specs.
//!
//! Fields are grouped the way the API updates them: one call per group.

use super::FunctionSpec;
use std::collections::BTreeSet;
use std::fmt;

/// A set of fields updated together by one API call.
///
/// The declaration order is the order updates are sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeGroup {
    /// Code source, requirements, handler.
    Code,
    /// Memory, timeout, replicas (and hardware type, which is not sent).
    Config,
    /// Environment variables and secret bindings.
    Environment,
    /// Labels and annotations.
    Metadata,
}

impl ChangeGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Config => "config",
            Self::Environment => "environment",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for ChangeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changed groups between two snapshots of a spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    groups: BTreeSet<ChangeGroup>,
}

impl ChangeSet {
    /// Compare a previous spec with a new one.
    ///
    /// Only in-place updatable fields count; see [`replace_reasons`] for the
    /// fields that force a replacement.
    pub fn between(previous: &FunctionSpec, next: &FunctionSpec) -> Self {
        let mut groups = BTreeSet::new();

        if previous.code != next.code
            || previous.requirements != next.requirements
            || previous.handler != next.handler
        {
            groups.insert(ChangeGroup::Code);
        }
        if previous.config != next.config {
            groups.insert(ChangeGroup::Config);
        }
        if previous.environment != next.environment || previous.secrets != next.secrets {
            groups.insert(ChangeGroup::Environment);
        }
        if previous.labels != next.labels || previous.annotations != next.annotations {
            groups.insert(ChangeGroup::Metadata);
        }

        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, group: ChangeGroup) -> bool {
        self.groups.contains(&group)
    }

    /// Groups in update order.
    pub fn iter(&self) -> impl Iterator<Item = ChangeGroup> + '_ {
        self.groups.iter().copied()
    }

    /// Group names in update order, for plan output.
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|g| g.as_str().to_string()).collect()
    }
}

/// Fields whose change forces delete-then-create.
pub fn replace_reasons(previous: &FunctionSpec, next: &FunctionSpec) -> Vec<String> {
    let mut reasons = Vec::new();
    if previous.name != next.name {
        reasons.push("name".to_string());
    }
    if previous.runtime != next.runtime {
        reasons.push("runtime".to_string());
    }
    reasons
}

/// Fields that changed but cannot be applied in place by the API.
///
/// The caller should warn: the change is not sent until the function is
/// recreated.
pub fn unmanaged_changes(previous: &FunctionSpec, next: &FunctionSpec) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if previous.template != next.template {
        fields.push("template");
    }
    let hardware = |s: &FunctionSpec| s.config.map(|c| c.hardware_type);
    if hardware(previous) != hardware(next) {
        fields.push("config.hardware_type");
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{CodeSource, FunctionConfig, HardwareType, RuntimeKind, Template};

    fn base() -> FunctionSpec {
        let mut spec = FunctionSpec::new("fn-basic", RuntimeKind::Python311);
        spec.code = Some(CodeSource::Inline("v1".into()));
        spec.config = Some(FunctionConfig::default());
        spec
    }

    #[test]
    fn test_identical_specs_have_no_changes() {
        let a = base();
        let set = ChangeSet::between(&a, &a.clone());
        assert!(set.is_empty());
        assert!(replace_reasons(&a, &a).is_empty());
    }

    #[test]
    fn test_environment_only() {
        let a = base();
        let mut b = a.clone();
        b.environment.insert("MODE".into(), "prod".into());

        let set = ChangeSet::between(&a, &b);
        assert_eq!(set.names(), vec!["environment"]);
    }

    #[test]
    fn test_secret_order_matters() {
        let mut a = base();
        a.secrets = vec!["one".into(), "two".into()];
        let mut b = a.clone();
        b.secrets.reverse();
        assert!(ChangeSet::between(&a, &b).contains(ChangeGroup::Environment));
    }

    #[test]
    fn test_groups_come_out_in_update_order() {
        let a = base();
        let mut b = a.clone();
        b.labels.insert("team".into(), "x".into());
        b.handler = "main".into();
        b.config = Some(FunctionConfig {
            memory_mb: 256,
            ..FunctionConfig::default()
        });

        let set = ChangeSet::between(&a, &b);
        assert_eq!(set.names(), vec!["code", "config", "metadata"]);
        assert_eq!(set.names().len(), 3);
    }

    #[test]
    fn test_switching_code_source_kind_is_a_code_change() {
        let a = base();
        let mut b = a.clone();
        b.code = Some(CodeSource::Directory("./src".into()));
        assert!(ChangeSet::between(&a, &b).contains(ChangeGroup::Code));

        let mut c = a.clone();
        c.requirements = Some("flask".into());
        assert!(ChangeSet::between(&a, &c).contains(ChangeGroup::Code));
    }

    #[test]
    fn test_runtime_and_name_force_replace() {
        let a = base();
        let mut b = a.clone();
        b.runtime = RuntimeKind::Node20;
        b.name = "fn-other".into();
        assert_eq!(replace_reasons(&a, &b), vec!["name", "runtime"]);
    }

    #[test]
    fn test_unmanaged_changes() {
        let a = base();
        let mut b = a.clone();
        b.template = Template::Flask;
        b.config = Some(FunctionConfig {
            hardware_type: HardwareType::Gpu,
            ..FunctionConfig::default()
        });

        assert_eq!(unmanaged_changes(&a, &b), vec!["template", "config.hardware_type"]);
        // Hardware still marks the config block as changed.
        assert!(ChangeSet::between(&a, &b).contains(ChangeGroup::Config));
    }
}
