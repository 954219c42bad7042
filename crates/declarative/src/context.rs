//! Hooks between the executor and whatever drives it
//!
//! The executor never prints or prompts itself; a terminal front end plugs
//! in through these traits, tests use the fixed implementations below.

use crate::types::ApplyResult;
use anyhow::Result;

/// Receives one event per resource as the plan runs
pub trait ProgressCallback {
    /// `count` resources are about to run
    fn on_batch_start(&mut self, count: usize);

    fn on_resource_start(&mut self, id: &str, description: &str);

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    fn on_batch_complete(&mut self);
}

/// Asked once, before the first change is made
pub trait ConfirmCallback {
    /// `Ok(false)` skips the whole plan
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Ignores every progress event
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_batch_complete(&mut self) {}
}

/// Answers yes, for non-interactive runs
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Answers no
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Per-apply flags handed to [`crate::Resource::apply`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyContext {
    /// Report only; write nothing
    pub dry_run: bool,
    pub verbose: bool,
}

impl ApplyContext {
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self { dry_run, verbose }
    }
}
