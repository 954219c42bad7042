//! In-process CIB document behind the [`Backend`] trait.
//!
//! Behaves like `cibadmin` against a live CIB closely enough for the
//! reconciler: missing scopes fail with `NotFound`, duplicate ids are
//! refused, and every successful write bumps the epoch. Writes can be made
//! to fail on demand to exercise the retry path.

use crate::backend::{Backend, Query, Section};
use crate::error::{Error, Result};
use crate::model::TARGET_ROLE;
use crate::xml::Element;
use std::cell::{Cell, RefCell};

/// A failure to inject into writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Conflict,
    SchemaRejected,
    ToolUnavailable,
}

impl Failure {
    fn to_error(self) -> Error {
        match self {
            Self::Conflict => Error::from_tool_output(
                "cibadmin",
                Some(205),
                "Update was older than existing configuration",
            ),
            Self::SchemaRejected => Error::from_tool_output(
                "cibadmin",
                Some(203),
                "Update does not conform to the configured schema",
            ),
            Self::ToolUnavailable => Error::ToolUnavailable {
                tool: "cibadmin".into(),
                message: "No such file or directory".into(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Injected {
    failure: Failure,
    permanent: bool,
}

/// In-memory CIB for tests and dry experiments.
#[derive(Debug)]
pub struct MemoryBackend {
    cib: RefCell<Element>,
    injected: Cell<Option<Injected>>,
    monitor_down: Cell<bool>,
    calls: RefCell<Vec<String>>,
    writes: Cell<usize>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::from_cib(skeleton())
    }
}

/// An empty cluster: every section but `rsc_defaults`, which Pacemaker
/// only adds once a default is set.
fn skeleton() -> Element {
    let configuration = ["crm_config", "nodes", "resources", "constraints"]
        .into_iter()
        .fold(Element::new("configuration"), |conf, section| {
            conf.with_child(Element::new(section))
        });
    Element::new("cib")
        .with_attr("epoch", "1")
        .with_attr("num_updates", "0")
        .with_attr("admin_epoch", "0")
        .with_child(configuration)
        .with_child(Element::new("status"))
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_cib(cib: Element) -> Self {
        Self {
            cib: RefCell::new(cib),
            injected: Cell::new(None),
            monitor_down: Cell::new(false),
            calls: RefCell::new(Vec::new()),
            writes: Cell::new(0),
        }
    }

    /// Start from an existing document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        Ok(Self::from_cib(Element::parse(xml)?))
    }

    /// Add cluster nodes by uname.
    pub fn with_nodes(self, unames: &[&str]) -> Self {
        {
            let mut cib = self.cib.borrow_mut();
            if let Some(nodes) = cib.find_named_mut("nodes") {
                for (i, uname) in unames.iter().enumerate() {
                    nodes.push(
                        Element::new("node")
                            .with_attr("id", (i + 1).to_string())
                            .with_attr("uname", *uname),
                    );
                }
            }
        }
        self
    }

    /// Insert a fragment directly, bypassing call and write accounting.
    pub fn seed(&self, section: Section, fragment: Element) -> Result<()> {
        let mut cib = self.cib.borrow_mut();
        let parent = cib
            .find_named_mut(section.as_str())
            .ok_or_else(|| Error::NotFound {
                id: section.to_string(),
            })?;
        parent.push(fragment);
        Ok(())
    }

    /// Fail the next write only.
    pub fn fail_next_write(&self, failure: Failure) {
        self.injected.set(Some(Injected {
            failure,
            permanent: false,
        }));
    }

    /// Fail every write from now on.
    pub fn fail_writes(&self, failure: Failure) {
        self.injected.set(Some(Injected {
            failure,
            permanent: true,
        }));
    }

    /// Make `resource_status` fail.
    pub fn set_monitor_down(&self, down: bool) {
        self.monitor_down.set(down);
    }

    /// Snapshot of the whole document.
    pub fn cib(&self) -> Element {
        self.cib.borrow().clone()
    }

    /// The element with `id`, if any.
    pub fn element(&self, id: &str) -> Option<Element> {
        self.cib.borrow().find_by_id(id).cloned()
    }

    /// Current `epoch` attribute.
    pub fn epoch(&self) -> u64 {
        self.cib
            .borrow()
            .attr("epoch")
            .and_then(|e| e.parse().ok())
            .unwrap_or(0)
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Every call made, as `verb target` lines.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    /// Consume an injected failure, if any.
    fn check_injected(&self) -> Result<()> {
        match self.injected.get() {
            Some(injected) => {
                if !injected.permanent {
                    self.injected.set(None);
                }
                Err(injected.failure.to_error())
            }
            None => Ok(()),
        }
    }

    fn committed(&self, cib: &mut Element) {
        let epoch = cib
            .attr("epoch")
            .and_then(|e| e.parse::<u64>().ok())
            .unwrap_or(0);
        cib.set_attr("epoch", (epoch + 1).to_string());
        self.writes.set(self.writes.get() + 1);
    }

    fn reject_duplicates(cib: &Element, fragment: &Element, replacing: Option<&Element>) -> Result<()> {
        let allowed = replacing.map(Element::ids).unwrap_or_default();
        for id in fragment.ids() {
            if allowed.contains(&id) {
                continue;
            }
            if cib.find_by_id(id).is_some() {
                return Err(Error::CommandFailed {
                    message: "cibadmin exited with status 76".into(),
                    stderr: format!("id '{id}' is already in use"),
                });
            }
        }
        Ok(())
    }
}

fn not_found(query: &Query) -> Error {
    Error::from_tool_output("cibadmin", Some(105), &format!("No such object: {query}"))
}

/// Every element in the subtree that satisfies `pred`, in document order.
fn collect<'a>(el: &'a Element, pred: &dyn Fn(&Element) -> bool, out: &mut Vec<&'a Element>) {
    if pred(el) {
        out.push(el);
    }
    for child in &el.children {
        collect(child, pred, out);
    }
}

fn find<'a>(cib: &'a Element, query: &Query) -> Vec<&'a Element> {
    let mut out = Vec::new();
    match query {
        Query::Section(section) => {
            if let Some(el) = cib.find_named(section.as_str()) {
                out.push(el);
            }
        }
        Query::Id(id) => {
            if let Some(el) = cib.find_by_id(id) {
                out.push(el);
            }
        }
        Query::Element { tag, id } => {
            collect(
                cib,
                &|e: &Element| e.name == *tag && e.id() == Some(id.as_str()),
                &mut out,
            );
        }
        Query::TopLevel(id) => {
            if let Some(resources) = cib.find_named("resources") {
                out.extend(
                    resources
                        .children
                        .iter()
                        .filter(|c| c.find_by_id(id).is_some()),
                );
            }
        }
        Query::Match { tag, attrs } => {
            collect(
                cib,
                &|e: &Element| {
                    e.name == *tag && attrs.iter().all(|(k, v)| e.attr(k) == Some(v.as_str()))
                },
                &mut out,
            );
        }
    }
    out
}

impl Backend for MemoryBackend {
    fn query(&self, query: &Query) -> Result<String> {
        self.record(format!("query {query}"));
        let cib = self.cib.borrow();
        match find(&cib, query).as_slice() {
            [] => Err(not_found(query)),
            [single] => Ok(single.render()),
            many => {
                let mut wrapper = Element::new("xpath-query");
                wrapper.children = many.iter().map(|e| (*e).clone()).collect();
                Ok(wrapper.render())
            }
        }
    }

    fn create(&self, section: Section, fragment: &Element) -> Result<()> {
        self.record(format!("create {section} {}", fragment.id().unwrap_or(&fragment.name)));
        self.check_injected()?;
        let mut cib = self.cib.borrow_mut();
        Self::reject_duplicates(&cib, fragment, None)?;
        let parent = cib
            .find_named_mut(section.as_str())
            .ok_or_else(|| not_found(&Query::Section(section)))?;
        parent.push(fragment.clone());
        self.committed(&mut cib);
        Ok(())
    }

    fn replace(&self, target: &Query, fragment: &Element) -> Result<()> {
        self.record(format!("replace {target}"));
        self.check_injected()?;
        let mut cib = self.cib.borrow_mut();
        let current = find(&cib, target).first().map(|e| (*e).clone());
        let Some(current) = current else {
            return Err(not_found(target));
        };
        Self::reject_duplicates(&cib, fragment, Some(&current))?;

        match target {
            Query::Section(section) => {
                let slot = cib
                    .find_named_mut(section.as_str())
                    .ok_or_else(|| not_found(target))?;
                *slot = fragment.clone();
            }
            _ => {
                let id = current.id().unwrap_or_default().to_string();
                if !cib.replace_by_id(&id, fragment.clone()) {
                    return Err(not_found(target));
                }
            }
        }
        self.committed(&mut cib);
        Ok(())
    }

    fn delete(&self, fragment: &Element) -> Result<()> {
        let id = fragment.id().unwrap_or_default().to_string();
        self.record(format!("delete {} {id}", fragment.name));
        self.check_injected()?;
        let mut cib = self.cib.borrow_mut();
        let target = Query::element(&fragment.name, &id);
        if find(&cib, &target).is_empty() {
            return Err(not_found(&target));
        }
        cib.remove_by_id(&id);
        self.committed(&mut cib);
        Ok(())
    }

    fn resource_status(&self) -> Result<String> {
        self.record("status".into());
        if self.monitor_down.get() {
            return Err(Error::ToolUnavailable {
                tool: "crm_mon".into(),
                message: "connection to cluster failed".into(),
            });
        }
        let cib = self.cib.borrow();
        let mut resources = Element::new("resources");
        if let Some(configured) = cib.find_named("resources") {
            for entry in &configured.children {
                if let Some(status) = status_of(entry, false) {
                    resources.push(status);
                }
            }
        }
        Ok(Element::new("crm_mon")
            .with_attr("version", "2.1.0")
            .with_child(resources)
            .render())
    }
}

fn stopped(el: &Element) -> bool {
    el.children_named("meta_attributes")
        .flat_map(|m| m.children_named("nvpair"))
        .any(|nv| nv.attr("name") == Some(TARGET_ROLE) && nv.attr("value") == Some("Stopped"))
}

/// Render one configured resource the way `crm_mon` reports it.
fn status_of(el: &Element, parent_stopped: bool) -> Option<Element> {
    let id = el.id()?;
    let is_stopped = parent_stopped || stopped(el);
    match el.name.as_str() {
        "primitive" => {
            let class = el.attr("class").unwrap_or_default();
            let provider = el.attr("provider").unwrap_or_default();
            let kind = el.attr("type").unwrap_or_default();
            Some(
                Element::new("resource")
                    .with_attr("id", id)
                    .with_attr("resource_agent", format!("{class}:{provider}:{kind}"))
                    .with_attr("role", if is_stopped { "Stopped" } else { "Started" })
                    .with_attr("active", if is_stopped { "false" } else { "true" })
                    .with_attr("failed", "false"),
            )
        }
        "group" | "clone" | "master" => {
            let tag = if el.name == "master" { "clone" } else { el.name.as_str() };
            let mut out = Element::new(tag).with_attr("id", id);
            for child in &el.children {
                if let Some(status) = status_of(child, is_stopped) {
                    out.push(status);
                }
            }
            Some(out)
        }
        _ => None,
    }
}
