//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;

/// What reconciliation has to do for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Remote state already matches
    NoChange,
    /// Resource does not exist yet
    Create,
    /// Change in place; `changes` names what differs
    Update { changes: Vec<String> },
    /// Delete then create; `reasons` names what forces it
    Replace { reasons: Vec<String> },
    /// Resource is no longer declared
    Delete,
}

impl Action {
    /// Check if the action changes anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Check if the action removes the resource without recreating it
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete)
    }

    /// Plan symbol, in the style of other IaC tools
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoChange => " ",
            Self::Create => "+",
            Self::Update { .. } => "~",
            Self::Replace { .. } => "-/+",
            Self::Delete => "-",
        }
    }

    /// Short verb for messages
    pub fn verb(&self) -> &'static str {
        match self {
            Self::NoChange => "unchanged",
            Self::Create => "create",
            Self::Update { .. } => "update",
            Self::Replace { .. } => "replace",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update { changes } => write!(f, "update ({})", changes.join(", ")),
            Self::Replace { reasons } => write!(f, "replace ({})", reasons.join(", ")),
            other => f.write_str(other.verb()),
        }
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was changed in place
    Updated,
    /// Resource was deleted and created again
    Replaced,
    /// Resource was removed
    Deleted,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Replaced | Self::Deleted
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
    /// Address and error message of every failed resource
    #[serde(default)]
    pub failures: Vec<(String, String)>,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.replaced += other.replaced;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
        self.failures.extend(other.failures.iter().cloned());
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, address: &str, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Updated => self.updated += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Deleted => self.deleted += 1,
            ApplyResult::Failed { error } => {
                self.failed += 1;
                self.failures.push((address.to_string(), error.clone()));
            }
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of resources reconciled at once within a tier
    pub jobs: usize,
    /// Verbose output
    pub verbose: bool,
    /// Cancel in-flight waits and skip remaining tiers after the first failure
    pub fail_fast: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            verbose: false,
            fail_fast: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Create.to_string(), "create");
        assert_eq!(
            Action::Update {
                changes: vec!["config".into(), "environment".into()]
            }
            .to_string(),
            "update (config, environment)"
        );
        assert_eq!(
            Action::Replace {
                reasons: vec!["runtime".into()]
            }
            .symbol(),
            "-/+"
        );
        assert!(!Action::NoChange.is_change());
        assert!(Action::Delete.is_delete());
    }

    #[test]
    fn test_summary_records_failures() {
        let mut summary = ExecuteSummary::default();
        summary.add_result("function.a", &ApplyResult::Created);
        summary.add_result("function.b", &ApplyResult::Failed { error: "boom".into() });
        summary.add_result("secret.c", &ApplyResult::NoChange);

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.total_changes(), 1);
        assert!(!summary.is_success());
        assert_eq!(summary.failures, vec![("function.b".to_string(), "boom".to_string())]);
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ExecuteSummary {
            created: 1,
            ..Default::default()
        };
        let mut b = ExecuteSummary::default();
        b.add_result("function.x", &ApplyResult::Failed { error: "e".into() });
        a.merge(&b);
        assert_eq!(a.created, 1);
        assert_eq!(a.failed, 1);
        assert_eq!(a.failures.len(), 1);
    }
}
