//! CIB Reader: scoped queries parsed into elements and model values.

use crate::backend::{Backend, Query, Section};
use crate::error::{Error, Result};
use crate::xml::Element;
use log::trace;

/// Result of a scoped query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Found(Element),
    /// The scope does not exist (yet)
    NotFound,
}

impl Fetched {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn into_option(self) -> Option<Element> {
        match self {
            Self::Found(el) => Some(el),
            Self::NotFound => None,
        }
    }
}

/// Reads the narrowest scope needed from a [`Backend`].
pub struct Reader<'a> {
    backend: &'a dyn Backend,
}

impl<'a> Reader<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Every element matching the query. A missing scope yields none.
    pub fn fetch_all(&self, query: &Query) -> Result<Vec<Element>> {
        let xml = match self.backend.query(query) {
            Ok(xml) => xml,
            Err(Error::NotFound { .. }) => return Ok(Vec::new()),
            Err(e @ Error::ToolUnavailable { .. }) => return Err(e),
            Err(e) => {
                return Err(Error::Query {
                    message: format!("{query}: {e}"),
                });
            }
        };
        trace!("{query} returned {xml}");

        let root = Element::parse(&xml).map_err(|e| Error::Query {
            message: format!("{query}: {e}"),
        })?;
        if root.name == "xpath-query" {
            Ok(root.children)
        } else {
            Ok(vec![root])
        }
    }

    /// The first element matching the query.
    pub fn fetch(&self, query: &Query) -> Result<Fetched> {
        Ok(self
            .fetch_all(query)?
            .into_iter()
            .next()
            .map_or(Fetched::NotFound, Fetched::Found))
    }

    /// Any element with this id.
    pub fn fetch_by_id(&self, id: &str) -> Result<Fetched> {
        self.fetch(&Query::Id(id.to_string()))
    }

    /// The top-level resource that is or contains `id`.
    pub fn fetch_top_level(&self, id: &str) -> Result<Fetched> {
        self.fetch(&Query::TopLevel(id.to_string()))
    }

    pub fn fetch_section(&self, section: Section) -> Result<Fetched> {
        self.fetch(&Query::Section(section))
    }

    /// Whether any element carries this id.
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.fetch_by_id(id)?.is_found())
    }

    /// Whether a node with this uname is configured.
    ///
    /// `None` when the nodes section cannot be read, e.g. against a
    /// shadow CIB file without node entries.
    pub fn node_exists(&self, uname: &str) -> Option<bool> {
        match self.fetch_section(Section::Nodes) {
            Ok(Fetched::Found(nodes)) if !nodes.children.is_empty() => Some(
                nodes
                    .children_named("node")
                    .any(|n| n.attr("uname") == Some(uname)),
            ),
            _ => None,
        }
    }
}
