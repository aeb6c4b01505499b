//! Execution planner - pairs resources with their planned actions

use crate::resource::{BoxedResource, Resource};
use crate::types::Action;
use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// A resource together with the action planned for it
#[derive(Debug)]
pub struct PlannedStep {
    pub resource: BoxedResource,
    pub action: Action,
}

impl PlannedStep {
    /// Address of the planned resource
    pub fn address(&self) -> String {
        self.resource.address()
    }
}

/// An execution plan: every resource with its planned action
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub steps: Vec<PlannedStep>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan every resource
    ///
    /// Fails on the first resource that cannot be planned; planning never
    /// changes anything remotely, so nothing is left half-done.
    pub fn build(resources: Vec<BoxedResource>) -> Result<Self> {
        let mut plan = Self::new();
        for resource in resources {
            plan.add_resource(resource)?;
        }
        Ok(plan)
    }

    /// Plan one resource and add it
    pub fn add_resource(&mut self, resource: BoxedResource) -> Result<()> {
        let action = resource
            .plan()
            .with_context(|| format!("Failed to plan {}", resource.address()))?;
        self.steps.push(PlannedStep { resource, action });
        Ok(())
    }

    /// Add a resource with an already decided action
    pub fn add_step(&mut self, resource: BoxedResource, action: Action) {
        self.steps.push(PlannedStep { resource, action });
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            steps: self
                .steps
                .into_iter()
                .filter(|s| predicate(s.resource.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type", "name" or "type.name". A bare word matches
    /// resources of that type as well as resources with that name.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target.map(parse_target) {
            None => self,
            Some((Some(word), None)) => self.filter(|r| {
                matches_filter(r, Some(&word), None) || matches_filter(r, None, Some(&word))
            }),
            Some((resource_type, name)) => {
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Steps that change something
    pub fn changes(&self) -> impl Iterator<Item = &PlannedStep> {
        self.steps.iter().filter(|s| s.action.is_change())
    }

    /// Number of steps that change something
    pub fn change_count(&self) -> usize {
        self.changes().count()
    }

    /// Check if the plan changes nothing
    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.steps.len()
    }

    /// Split changing steps into ordered batches
    ///
    /// Creates, updates and replacements run first by ascending tier, then
    /// deletions by descending tier. Unchanged steps are dropped.
    pub fn into_batches(self) -> Vec<(u8, Vec<PlannedStep>)> {
        let mut upserts: BTreeMap<u8, Vec<PlannedStep>> = BTreeMap::new();
        let mut deletes: BTreeMap<u8, Vec<PlannedStep>> = BTreeMap::new();

        for step in self.steps {
            if !step.action.is_change() {
                continue;
            }
            let tier = step.resource.tier();
            let bucket = if step.action.is_delete() {
                &mut deletes
            } else {
                &mut upserts
            };
            bucket.entry(tier).or_default().push(step);
        }

        upserts
            .into_iter()
            .chain(deletes.into_iter().rev())
            .collect()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((rt, name)) if !name.contains('.') => (Some(rt.to_string()), Some(name.to_string())),
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow plural aliases ("functions", "secrets")
        let rt = rt.strip_suffix('s').unwrap_or(rt);
        if resource.resource_type() != rt {
            return false;
        }
    }

    if let Some(n) = name {
        let address = resource.address();
        let own_name = address.split_once('.').map_or(address.as_str(), |(_, n)| n);
        if own_name != n {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::types::ApplyResult;

    #[derive(Debug)]
    struct Stub {
        kind: &'static str,
        name: &'static str,
        tier: u8,
        action: Action,
    }

    impl Resource for Stub {
        fn address(&self) -> String {
            format!("{}.{}", self.kind, self.name)
        }

        fn description(&self) -> String {
            self.address()
        }

        fn resource_type(&self) -> &'static str {
            self.kind
        }

        fn tier(&self) -> u8 {
            self.tier
        }

        fn plan(&self) -> Result<Action> {
            Ok(self.action.clone())
        }

        fn apply(&self, _action: &Action, _ctx: &ApplyContext) -> Result<ApplyResult> {
            Ok(ApplyResult::NoChange)
        }
    }

    fn stub(kind: &'static str, name: &'static str, tier: u8, action: Action) -> BoxedResource {
        Box::new(Stub {
            kind,
            name,
            tier,
            action,
        })
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("function"), (Some("function".to_string()), None));
        assert_eq!(
            parse_target("function.fn-basic"),
            (Some("function".to_string()), Some("fn-basic".to_string()))
        );
        assert_eq!(parse_target("a.b.c"), (None, Some("a.b.c".to_string())));
    }

    #[test]
    fn test_filter_by_target() {
        let plan = ExecutionPlan::build(vec![
            stub("function", "api", 1, Action::Create),
            stub("function", "api-v2", 1, Action::Create),
            stub("secret", "db", 0, Action::Create),
        ])
        .unwrap();

        let only_api = plan.filter_by_target(Some("function.api"));
        assert_eq!(only_api.total_resources(), 1);
        assert_eq!(only_api.steps[0].address(), "function.api");

        let plan = ExecutionPlan::build(vec![
            stub("function", "api", 1, Action::Create),
            stub("secret", "db", 0, Action::Create),
        ])
        .unwrap();
        let secrets = plan.filter_by_target(Some("secrets"));
        assert_eq!(secrets.total_resources(), 1);
        assert_eq!(secrets.steps[0].address(), "secret.db");

        let plan = ExecutionPlan::build(vec![
            stub("function", "api", 1, Action::Create),
            stub("secret", "db", 0, Action::Create),
        ])
        .unwrap();
        let by_name = plan.filter_by_target(Some("api"));
        assert_eq!(by_name.total_resources(), 1);
        assert_eq!(by_name.steps[0].address(), "function.api");
    }

    #[test]
    fn test_batches_order_upserts_then_deletes() {
        let plan = ExecutionPlan::build(vec![
            stub("function", "old", 1, Action::Delete),
            stub("function", "new", 1, Action::Create),
            stub("secret", "stale", 0, Action::Delete),
            stub("secret", "fresh", 0, Action::Create),
            stub("function", "same", 1, Action::NoChange),
        ])
        .unwrap();
        assert_eq!(plan.change_count(), 4);

        let order: Vec<Vec<String>> = plan
            .into_batches()
            .into_iter()
            .map(|(_, steps)| steps.iter().map(PlannedStep::address).collect())
            .collect();

        assert_eq!(
            order,
            vec![
                vec!["secret.fresh".to_string()],
                vec!["function.new".to_string()],
                vec!["function.old".to_string()],
                vec!["secret.stale".to_string()],
            ]
        );
    }

    #[test]
    fn test_empty_plan() {
        let plan = ExecutionPlan::build(vec![stub("secret", "db", 0, Action::NoChange)]).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_resources(), 1);
        assert!(plan.into_batches().is_empty());
    }
}
