//! CIB Writer: one [`Change`] per admin tool call.

use crate::backend::{Backend, Query, Section};
use crate::error::{Error, Result};
use crate::xml::Element;
use declarative::Change;
use log::{debug, info};
use std::fmt;

/// A change placed in a CIB section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub section: Section,
    pub change: Change<Element>,
    /// What the change overwrites or removes
    pub previous: Option<Element>,
}

impl Step {
    pub fn new(section: Section, change: Change<Element>, previous: Option<Element>) -> Self {
        Self {
            section,
            change,
            previous,
        }
    }

    /// Tag of the element the step touches.
    pub fn tag(&self) -> &str {
        self.change
            .fragment()
            .or(self.previous.as_ref())
            .map_or("", |el| el.name.as_str())
    }

    /// Whether the step overwrites a whole section.
    pub fn is_section_replace(&self) -> bool {
        matches!(self.change, Change::Replace { .. }) && self.tag() == self.section.as_str()
    }

    /// Where a replace is sent.
    fn target(&self, id: &str) -> Query {
        if self.is_section_replace() {
            Query::Section(self.section)
        } else {
            Query::element(self.tag(), id)
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            Change::Create(el) => match el.id() {
                Some(id) => write!(f, "create {} '{id}' in {}", el.name, self.section),
                None => write!(f, "create {} in {}", el.name, self.section),
            },
            Change::Replace { .. } if self.is_section_replace() => {
                write!(f, "replace section {}", self.section)
            }
            Change::Replace { id, .. } => write!(f, "replace {} '{id}'", self.tag()),
            Change::Delete { id } => write!(f, "delete {} '{id}'", self.tag()),
            Change::NoOp => write!(f, "no change"),
        }
    }
}

/// Applies steps through a [`Backend`].
pub struct Writer<'a> {
    backend: &'a dyn Backend,
    dry_run: bool,
}

impl<'a> Writer<'a> {
    pub fn new(backend: &'a dyn Backend, dry_run: bool) -> Self {
        Self { backend, dry_run }
    }

    /// Apply one step. Returns whether it changed (or would change) the CIB.
    pub fn apply(&self, step: &Step) -> Result<bool> {
        if !step.change.is_change() {
            return Ok(false);
        }
        if self.dry_run {
            info!("would {step}");
            return Ok(true);
        }
        debug!("{step}");

        match &step.change {
            Change::Create(fragment) => self.backend.create(step.section, fragment)?,
            Change::Replace { id, fragment } => {
                self.backend.replace(&step.target(id), fragment)?;
            }
            Change::Delete { id } => {
                let tag = step.tag();
                if tag.is_empty() {
                    return Err(Error::Unsupported(format!(
                        "cannot delete '{id}' without knowing its element"
                    )));
                }
                self.backend
                    .delete(&Element::new(tag).with_attr("id", id))?;
            }
            Change::NoOp => return Ok(false),
        }
        Ok(true)
    }

    /// Apply steps in order, stopping at the first failure.
    pub fn apply_all(&self, steps: &[Step]) -> Result<bool> {
        let mut changed = false;
        for step in steps {
            changed |= self.apply(step)?;
        }
        Ok(changed)
    }
}
