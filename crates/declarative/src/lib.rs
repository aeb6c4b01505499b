//! # Declarative
//!
//! A framework for declarative resource reconciliation.
//!
//! This crate provides the core abstractions for comparing desired state
//! with recorded state, planning the actions that close the gap, and
//! applying them in dependency order.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (a function, a secret)
//! - **Action**: What a resource needs: create, update, replace, delete or nothing
//! - **ExecutionPlan**: Every resource paired with its planned action
//! - **Executor**: Applies the plan in tiers with parallelism inside a tier
//! - **wait_until**: Polls a probe with backoff until ready, failed or timed out
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     Action, ApplyContext, ApplyResult, ExecuteOptions, ExecutionPlan, Resource,
//!     execute_simple,
//! };
//!
//! #[derive(Debug)]
//! struct Marker(&'static str);
//!
//! impl Resource for Marker {
//!     fn address(&self) -> String { format!("marker.{}", self.0) }
//!     fn description(&self) -> String { format!("Marker {}", self.0) }
//!     fn resource_type(&self) -> &'static str { "marker" }
//!
//!     fn plan(&self) -> anyhow::Result<Action> {
//!         Ok(Action::Create)
//!     }
//!
//!     fn apply(&self, _action: &Action, ctx: &ApplyContext) -> anyhow::Result<ApplyResult> {
//!         if ctx.dry_run {
//!             return Ok(ApplyResult::Skipped { reason: "Dry run".into() });
//!         }
//!         Ok(ApplyResult::Created)
//!     }
//! }
//!
//! let plan = ExecutionPlan::build(vec![Box::new(Marker("a")), Box::new(Marker("b"))])?;
//! let summary = execute_simple(plan, &ExecuteOptions::default())?;
//! assert_eq!(summary.created, 2);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;
pub mod wait;

// Re-export main types at crate root
pub use context::{ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{execute, execute_simple};
pub use planner::{ExecutionPlan, PlannedStep};
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use types::{Action, ApplyResult, ExecuteOptions, ExecuteSummary};
pub use wait::{Cancellation, Poll, WaitError, WaitPolicy, wait_until};
