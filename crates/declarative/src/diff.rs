//! Diff reporting for planned steps

use crate::planner::ExecutionPlan;
use crate::types::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A planned change of one resource, detached from the resource itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Address of the resource
    pub address: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Planned action
    pub action: Action,
    /// Extra lines describing the change, e.g. a code diff
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ResourceDiff {
    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(self.action, Action::Create)
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(self.action, Action::Delete)
    }

    /// Check if this diff represents a replacement
    pub fn is_replacement(&self) -> bool {
        matches!(self.action, Action::Replace { .. })
    }
}

/// Compute diffs for a plan
///
/// Returns only steps that change something.
pub fn compute_diffs(plan: &ExecutionPlan) -> Vec<ResourceDiff> {
    plan.changes()
        .map(|step| ResourceDiff {
            address: step.address(),
            resource_type: step.resource.resource_type().to_string(),
            description: step.resource.description(),
            action: step.action.clone(),
            details: step.resource.details(&step.action),
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to change in place
    pub modifications: usize,
    /// Number of resources to replace
    pub replacements: usize,
    /// Number of resources to remove
    pub removals: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Update { .. } => summary.modifications += 1,
                Action::Replace { .. } => summary.replacements += 1,
                Action::Delete => summary.removals += 1,
                Action::NoChange => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.modifications + self.replacements + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
