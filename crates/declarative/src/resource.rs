//! The unit of convergence
//!
//! A resource knows where it stands now, where it should end up, and how
//! to get there. The executor only ever talks to this trait.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState};
use anyhow::Result;
use std::fmt;

/// Something with observable state that can be driven to a desired state
///
/// Plans run resources in insertion order, and nothing is shared across
/// threads, so a resource may hold `Rc` handles to a common client and
/// may rely on resources earlier in the plan having been applied.
pub trait Resource: fmt::Debug {
    /// Stable id, unique within [`Resource::resource_type`]
    ///
    /// Matched by the `type.name` part of a target filter.
    fn id(&self) -> String;

    /// One-line summary shown next to the id
    fn description(&self) -> String;

    /// Kind used for grouping in diffs and for target filters
    fn resource_type(&self) -> &'static str;

    /// Observe the managed system
    ///
    /// Return [`ResourceState::Unknown`] when the state cannot be decided
    /// yet, e.g. because it hinges on an earlier resource in the plan.
    fn current_state(&self) -> Result<ResourceState>;

    /// The state `apply` converges to
    fn desired_state(&self) -> ResourceState;

    /// Whether current and desired state disagree
    fn needs_apply(&self) -> Result<bool> {
        Ok(self.current_state()? != self.desired_state())
    }

    /// Converge, reporting what happened
    ///
    /// Must be idempotent: applying an up-to-date resource returns
    /// [`ApplyResult::NoChange`]. Under `ctx.dry_run` nothing is written and
    /// [`ApplyResult::Skipped`] is returned.
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

pub type BoxedResource = Box<dyn Resource>;
