//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging systems to match the desired state.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed
//! - **ResourceState**: The current or desired state of a resource
//! - **Change**: A primitive create/replace/delete computed by [`diff`]
//! - **ExecutionPlan**: An ordered list of resources
//! - **Executor**: Applies resources sequentially, in plan order
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{diff, Change, DiffOptions, Diffable};
//!
//! #[derive(Clone)]
//! struct Setting { key: String, value: String }
//!
//! impl Diffable for Setting {
//!     fn id(&self) -> String { self.key.clone() }
//!     fn same_as(&self, other: &Self) -> bool { self.value == other.value }
//! }
//!
//! let desired = Setting { key: "a".into(), value: "1".into() };
//! let changes = diff(&desired, None, DiffOptions::default());
//! assert!(matches!(changes[..], [Change::Create(_)]));
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

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{
    Change, DiffOptions, DiffSummary, Diffable, ResourceDiff, compute_diffs, diff, group_by_type,
};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, Intent, ResourceState};
