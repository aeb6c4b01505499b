//! Resource trait for declarative state management
//!
//! A Resource pairs a desired state with the last recorded one and knows
//! how to plan and apply the difference.

use crate::context::ApplyContext;
use crate::types::{Action, ApplyResult};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (address, description, type)
/// - Ordering (tier)
/// - Planning (which [`Action`] is needed)
/// - Convergence (apply a planned action)
///
/// # Example
///
/// ```
/// use declarative::{Action, ApplyContext, ApplyResult, Resource};
///
/// #[derive(Debug)]
/// struct Marker {
///     name: String,
///     exists: bool,
/// }
///
/// impl Resource for Marker {
///     fn address(&self) -> String {
///         format!("marker.{}", self.name)
///     }
///
///     fn description(&self) -> String {
///         format!("Marker {}", self.name)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "marker"
///     }
///
///     fn plan(&self) -> anyhow::Result<Action> {
///         Ok(if self.exists { Action::NoChange } else { Action::Create })
///     }
///
///     fn apply(&self, action: &Action, _ctx: &ApplyContext) -> anyhow::Result<ApplyResult> {
///         match action {
///             Action::Create => Ok(ApplyResult::Created),
///             _ => Ok(ApplyResult::NoChange),
///         }
///     }
/// }
///
/// let marker = Marker { name: "a".into(), exists: false };
/// assert_eq!(marker.plan().unwrap(), Action::Create);
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique address, `<type>.<name>`
    ///
    /// Stable across runs; used for targeting and reporting.
    fn address(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, e.g. "function" or "secret"
    fn resource_type(&self) -> &'static str;

    /// Ordering tier
    ///
    /// Lower tiers are created and updated first and deleted last, so a
    /// resource may depend on anything in a lower tier.
    fn tier(&self) -> u8 {
        0
    }

    /// Decide what needs to happen to reach the desired state
    ///
    /// Must not change anything remotely.
    fn plan(&self) -> Result<Action>;

    /// Carry out a previously planned action
    ///
    /// Implementations should:
    /// 1. Respect `ctx.dry_run` (return Skipped if true)
    /// 2. Make the necessary changes and record them
    /// 3. Return the appropriate ApplyResult
    fn apply(&self, action: &Action, ctx: &ApplyContext) -> Result<ApplyResult>;

    /// Lines explaining a planned action beyond its one-line summary
    ///
    /// Shown under the resource in plan output. Must not change anything.
    fn details(&self, _action: &Action) -> Vec<String> {
        Vec::new()
    }

    /// Whether this resource can be applied in parallel with others
    ///
    /// Override to return false for resources that have ordering
    /// dependencies or shared state concerns.
    fn can_parallelize(&self) -> bool {
        true
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension helpers for resources
pub trait ResourceExt {
    /// Name part of the address (everything after the first `.`)
    fn name(&self) -> String;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn name(&self) -> String {
        let address = self.address();
        match address.split_once('.') {
            Some((_, name)) => name.to_string(),
            None => address,
        }
    }
}
