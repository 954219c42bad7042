//! Backend abstraction for CIB access.
//!
//! The [`Backend`] trait is the whole contract the reconciler has with the
//! cluster: query a scope, create under a section, replace an element,
//! delete one, and read resource status. Implementations:
//! - [`cibadmin::CibadminBackend`] runs the Pacemaker CLI tools
//! - [`memory::MemoryBackend`] edits an in-process CIB document for tests

pub mod cibadmin;
pub mod memory;

use crate::error::Result;
use crate::xml::Element;
use std::fmt;

/// Top-level sections of the CIB, as accepted by `cibadmin --scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Configuration,
    CrmConfig,
    RscDefaults,
    Nodes,
    Resources,
    Constraints,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::CrmConfig => "crm_config",
            Self::RscDefaults => "rsc_defaults",
            Self::Nodes => "nodes",
            Self::Resources => "resources",
            Self::Constraints => "constraints",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to read (or, for replace, what to overwrite).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A whole section
    Section(Section),
    /// Any element with this id
    Id(String),
    /// The element with this tag and id
    Element { tag: String, id: String },
    /// The direct child of `resources` that is or contains this id
    TopLevel(String),
    /// Every element with this tag whose attributes match
    Match {
        tag: String,
        attrs: Vec<(String, String)>,
    },
}

impl Query {
    pub fn element(tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            id: id.into(),
        }
    }

    /// XPath for the query, `None` for a section scope.
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Self::Section(_) => None,
            Self::Id(id) => Some(format!("//*[@id='{id}']")),
            Self::Element { tag, id } => Some(format!("//{tag}[@id='{id}']")),
            Self::TopLevel(id) => Some(format!(
                "//resources/*[descendant-or-self::*[@id='{id}']]"
            )),
            Self::Match { tag, attrs } => {
                let predicate = attrs
                    .iter()
                    .map(|(k, v)| format!("@{k}='{v}'"))
                    .collect::<Vec<_>>()
                    .join(" and ");
                if predicate.is_empty() {
                    Some(format!("//{tag}"))
                } else {
                    Some(format!("//{tag}[{predicate}]"))
                }
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.to_xpath()) {
            (Self::Section(section), _) => write!(f, "scope {section}"),
            (_, Some(xpath)) => f.write_str(&xpath),
            (_, None) => Ok(()),
        }
    }
}

/// Access to one CIB instance.
///
/// Calls are blocking and never run concurrently. A query that matches
/// nothing fails with [`crate::Error::NotFound`].
pub trait Backend {
    /// Raw XML of the scope.
    fn query(&self, query: &Query) -> Result<String>;

    /// Insert a fragment under a section.
    fn create(&self, section: Section, fragment: &Element) -> Result<()>;

    /// Overwrite the element (or section) addressed by `target`.
    fn replace(&self, target: &Query, fragment: &Element) -> Result<()>;

    /// Remove the element with the fragment's tag and id.
    fn delete(&self, fragment: &Element) -> Result<()>;

    /// Raw `crm_mon` XML describing resource state.
    fn resource_status(&self) -> Result<String>;
}

impl<B: Backend + ?Sized> Backend for std::rc::Rc<B> {
    fn query(&self, query: &Query) -> Result<String> {
        (**self).query(query)
    }

    fn create(&self, section: Section, fragment: &Element) -> Result<()> {
        (**self).create(section, fragment)
    }

    fn replace(&self, target: &Query, fragment: &Element) -> Result<()> {
        (**self).replace(target, fragment)
    }

    fn delete(&self, fragment: &Element) -> Result<()> {
        (**self).delete(fragment)
    }

    fn resource_status(&self) -> Result<String> {
        (**self).resource_status()
    }
}
