//! CIB descriptors as declarative resources
//!
//! Each validated descriptor becomes one [`CibResource`]. Current state is
//! whatever the reconciler would still have to do: no steps means the
//! cluster already matches.

use anyhow::{Result, anyhow};
use std::fmt;
use std::rc::Rc;

use cib::{Client, Descriptor, Error, Step};
use declarative::{ApplyContext, ApplyResult, Change, Intent, Resource, ResourceState};

/// One descriptor, reconciled through a shared client
pub struct CibResource {
    descriptor: Descriptor,
    client: Rc<Client>,
}

impl CibResource {
    pub fn new(descriptor: Descriptor, client: Rc<Client>) -> Self {
        Self { descriptor, client }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Steps still needed to reach the descriptor
    pub fn steps(&self) -> cib::Result<Vec<Step>> {
        self.client.plan(&self.descriptor)
    }
}

impl fmt::Debug for CibResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CibResource")
            .field("kind", &self.descriptor.kind())
            .field("id", &self.descriptor.id())
            .finish_non_exhaustive()
    }
}

impl Resource for CibResource {
    fn id(&self) -> String {
        self.descriptor.id()
    }

    fn description(&self) -> String {
        self.descriptor.summary()
    }

    fn resource_type(&self) -> &'static str {
        self.descriptor.kind()
    }

    fn current_state(&self) -> Result<ResourceState> {
        let steps = match self.steps() {
            Ok(steps) => steps,
            // Something created earlier in the same run
            Err(e) if is_unknown_reference(&e) => {
                log::debug!("{}: {}", self.id(), e.detailed());
                return Ok(ResourceState::Unknown);
            }
            Err(e) => return Err(anyhow!(e.detailed())),
        };

        if steps.is_empty() {
            return Ok(self.desired_state());
        }
        if self.descriptor.intent() == Intent::Absent {
            return Ok(ResourceState::Present {
                details: Some(join_steps(&steps)),
            });
        }
        if is_creation(&steps) {
            return Ok(ResourceState::Absent);
        }
        Ok(ResourceState::Modified {
            from: render(steps.iter().filter_map(|s| s.previous.as_ref())),
            to: render(steps.iter().filter_map(|s| s.change.fragment())),
        })
    }

    fn desired_state(&self) -> ResourceState {
        match self.descriptor.intent() {
            Intent::Present => ResourceState::Present {
                details: Some(self.descriptor.summary()),
            },
            Intent::Absent => ResourceState::Absent,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        let outcome = self
            .client
            .reconcile(&self.descriptor)
            .map_err(|e| anyhow!(e.detailed()))?;

        for warning in &outcome.warnings {
            log::warn!("{}: {warning}", self.id());
        }
        if ctx.verbose {
            for step in &outcome.steps {
                log::info!("{}: {step}", self.id());
            }
        }

        let result = if !outcome.changed {
            ApplyResult::NoChange
        } else if self.descriptor.intent() == Intent::Absent {
            ApplyResult::Removed
        } else if is_creation(&outcome.steps) {
            ApplyResult::Created
        } else {
            ApplyResult::Modified
        };
        Ok(result)
    }
}

fn is_unknown_reference(err: &Error) -> bool {
    match err {
        Error::UnknownReference { .. } => true,
        Error::Descriptor { source, .. } => is_unknown_reference(source),
        _ => false,
    }
}

/// Only new elements, nothing overwritten
fn is_creation(steps: &[Step]) -> bool {
    steps
        .iter()
        .all(|s| matches!(s.change, Change::Create(_)) && s.previous.is_none())
}

fn join_steps(steps: &[Step]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn render<'a>(elements: impl Iterator<Item = &'a cib::Element>) -> String {
    elements
        .map(cib::Element::render_pretty)
        .collect::<Vec<_>>()
        .join("\n")
}
