//! Reconciler: read, diff and write one descriptor at a time.
//!
//! Every run starts from a fresh read of the narrowest scope the descriptor
//! needs. Changes are whole fragments: an element is created, replaced as a
//! unit, or deleted. The only multi-element writes are group membership
//! changes, which replace the `resources` section in a single call so that
//! members never exist twice or not at all.

use crate::backend::{Backend, Query, Section};
use crate::descriptor::{ConstraintSpec, Descriptor, GroupSpec, PrimitiveSpec, PropertySpec, State};
use crate::error::{Error, Result};
use crate::model::{
    Attributes, CibObject, ColocationConstraint, Group, LocationConstraint, OrderConstraint,
    OrderSet, PropertyScope, PropertySet, ResourceEntry, TARGET_ROLE, is_disabled,
};
use crate::monitor;
use crate::reader::Reader;
use crate::retry::with_refetch;
use crate::writer::{Step, Writer};
use crate::xml::Element;
use declarative::{Change, DiffOptions, Diffable, Intent, diff};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// What to do with members that a group descriptor no longer lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberPolicy {
    /// Fail, naming the members
    #[default]
    Reject,
    /// Move them back to the top level of `resources`
    Release,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Plan and report, but write nothing
    pub dry_run: bool,
    /// Consult the resource monitor after a change
    pub verify: bool,
    pub member_policy: MemberPolicy,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            verify: true,
            member_policy: MemberPolicy::Reject,
        }
    }
}

/// Result of reconciling one descriptor.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub changed: bool,
    pub message: String,
    /// Changes made (or, in check mode, that would be made)
    pub steps: Vec<Step>,
    /// Advisory findings from the resource monitor
    pub warnings: Vec<String>,
}

/// The `{changed, failed, message}` triple reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    pub changed: bool,
    pub failed: bool,
    pub message: String,
}

impl InvocationResult {
    pub fn from_result(result: &Result<Outcome>) -> Self {
        match result {
            Ok(outcome) => Self::from(outcome),
            Err(e) => Self {
                changed: false,
                failed: true,
                message: e.detailed(),
            },
        }
    }
}

impl From<&Outcome> for InvocationResult {
    fn from(outcome: &Outcome) -> Self {
        let mut message = outcome.message.clone();
        for warning in &outcome.warnings {
            message.push_str("; warning: ");
            message.push_str(warning);
        }
        Self {
            changed: outcome.changed,
            failed: false,
            message,
        }
    }
}

/// Drives one descriptor from current to desired state.
pub struct Reconciler<'a> {
    backend: &'a dyn Backend,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(backend: &'a dyn Backend, options: ReconcileOptions) -> Self {
        Self { backend, options }
    }

    /// Compute the steps for a descriptor without writing anything.
    pub fn plan(&self, descriptor: &Descriptor) -> Result<Vec<Step>> {
        self.plan_steps(descriptor)
            .map(|steps| steps.into_iter().filter(|s| s.change.is_change()).collect())
            .map_err(|e| e.for_descriptor(descriptor.kind(), descriptor.id()))
    }

    /// Converge the CIB on the descriptor.
    pub fn reconcile(&self, descriptor: &Descriptor) -> Result<Outcome> {
        self.run(descriptor)
            .map_err(|e| e.for_descriptor(descriptor.kind(), descriptor.id()))
    }

    fn run(&self, descriptor: &Descriptor) -> Result<Outcome> {
        let writer = Writer::new(self.backend, self.options.dry_run);
        let (steps, changed) = with_refetch(|attempt| {
            if attempt > 1 {
                debug!("re-planning {} '{}'", descriptor.kind(), descriptor.id());
            }
            let steps = self.plan_steps(descriptor)?;
            let changed = writer.apply_all(&steps)?;
            Ok((steps, changed))
        })?;
        let steps: Vec<Step> = steps.into_iter().filter(|s| s.change.is_change()).collect();

        let warnings = if changed
            && !self.options.dry_run
            && self.options.verify
            && descriptor.intent() == Intent::Present
        {
            monitor::verify(self.backend, &monitored_ids(descriptor))
        } else {
            Vec::new()
        };

        let message = summarize(descriptor, &steps, self.options.dry_run);
        info!("{message}");
        Ok(Outcome {
            changed,
            message,
            steps,
            warnings,
        })
    }

    fn plan_steps(&self, descriptor: &Descriptor) -> Result<Vec<Step>> {
        match descriptor {
            Descriptor::Primitive(spec) => self.plan_primitive(spec),
            Descriptor::Group(spec) => self.plan_group(spec),
            Descriptor::Location(spec) => self.plan_constraint(spec),
            Descriptor::Colocation(spec) => self.plan_constraint(spec),
            Descriptor::Order(spec) => self.plan_constraint(spec),
            Descriptor::OrderSet(spec) => self.plan_constraint(spec),
            Descriptor::Property(spec) => self.plan_property(spec),
        }
    }

    fn plan_primitive(&self, spec: &PrimitiveSpec) -> Result<Vec<Step>> {
        let reader = Reader::new(self.backend);
        let Some(current_el) = reader.fetch_top_level(&spec.id)?.into_option() else {
            return match (spec.state, &spec.definition) {
                (State::Absent, _) => Ok(no_change(Section::Resources)),
                (_, Some(definition)) => {
                    let mut desired = definition.clone();
                    if let Some(meta) = desired.meta_mut() {
                        apply_state(meta, spec.state, None);
                    }
                    if desired.id() != spec.id && reader.exists(desired.id())? {
                        return Err(Error::Unsupported(format!(
                            "id '{}' is already used by another element",
                            desired.id()
                        )));
                    }
                    Ok(vec![Step::new(
                        Section::Resources,
                        Change::Create(desired.to_element()),
                        None,
                    )])
                }
                (_, None) => Err(Error::NotFound {
                    id: spec.id.clone(),
                }),
            };
        };

        let current = ResourceEntry::from_element(&current_el).map_err(unreadable)?;
        match &current {
            ResourceEntry::Group(group) => self.plan_grouped_primitive(spec, group, &current_el),
            ResourceEntry::Other(el) => Err(Error::Unsupported(format!(
                "'{}' is inside <{}> '{}', which is not managed here",
                spec.id,
                el.name,
                current.id()
            ))),
            ResourceEntry::Primitive(_) | ResourceEntry::Wrapped(_) => {
                if current.find_primitive(&spec.id).is_none() {
                    return Err(Error::Unsupported(format!(
                        "'{}' is a <{}>, not a primitive",
                        spec.id,
                        current.kind()
                    )));
                }
                let intent = spec.state.intent();
                let mut desired = spec
                    .definition
                    .clone()
                    .unwrap_or_else(|| current.clone());
                if let Some(meta) = desired.meta_mut() {
                    apply_state(meta, spec.state, current.meta());
                }
                let changes = diff(
                    &desired,
                    Some(&current),
                    DiffOptions {
                        intent,
                        force: spec.force,
                    },
                );
                Ok(to_steps(Section::Resources, changes, Some(&current_el)))
            }
        }
    }

    /// A primitive that lives inside a group is edited by replacing the group.
    fn plan_grouped_primitive(
        &self,
        spec: &PrimitiveSpec,
        group: &Group,
        group_el: &Element,
    ) -> Result<Vec<Step>> {
        let Some(index) = group.members.iter().position(|m| m.id == spec.id) else {
            return Err(Error::Unsupported(format!(
                "'{}' is a group, not a primitive",
                spec.id
            )));
        };

        if spec.state == State::Absent {
            if group.members.len() == 1 {
                let changes = vec![Change::Delete {
                    id: group.id.clone(),
                }];
                return Ok(to_element_steps(Section::Resources, changes, Some(group_el)));
            }
            let mut updated = group_el.clone();
            updated.remove_by_id(&spec.id);
            return Ok(vec![replace_step(Section::Resources, &group.id, updated, group_el)]);
        }

        let current = &group.members[index];
        let mut desired = match &spec.definition {
            None => current.clone(),
            Some(ResourceEntry::Primitive(p)) => p.clone(),
            Some(other) => {
                return Err(Error::Unsupported(format!(
                    "'{}' is a member of group '{}' and cannot become a <{}>",
                    spec.id,
                    group.id,
                    other.kind()
                )));
            }
        };
        if desired.agent != current.agent {
            return Err(Error::Unsupported(format!(
                "changing the agent of '{}' ({} to {}) requires removing it from group '{}' first",
                spec.id, current.agent, desired.agent, group.id
            )));
        }
        apply_state(&mut desired.meta, spec.state, Some(&current.meta));

        let changes = diff(
            &desired,
            Some(current),
            DiffOptions {
                intent: Intent::Present,
                force: spec.force,
            },
        );
        let changes = changes
            .into_iter()
            .map(|change| match change {
                Change::Replace { fragment, .. } => {
                    let mut updated = group_el.clone();
                    updated.replace_by_id(&spec.id, fragment.to_element());
                    Change::Replace {
                        id: group.id.clone(),
                        fragment: updated,
                    }
                }
                _ => Change::NoOp,
            })
            .collect();
        Ok(to_element_steps(Section::Resources, changes, Some(group_el)))
    }

    fn plan_group(&self, spec: &GroupSpec) -> Result<Vec<Step>> {
        let reader = Reader::new(self.backend);
        let section_el = reader
            .fetch_section(Section::Resources)?
            .into_option()
            .unwrap_or_else(|| Element::new(Section::Resources.as_str()));
        let entries = section_el
            .children
            .iter()
            .map(ResourceEntry::from_element)
            .collect::<Result<Vec<_>>>()
            .map_err(unreadable)?;

        let group_pos = entries.iter().position(|e| e.id() == spec.id);
        let current_group = match group_pos.map(|pos| &entries[pos]) {
            Some(ResourceEntry::Group(g)) => Some(g),
            Some(other) => {
                return Err(Error::Unsupported(format!(
                    "'{}' is a <{}>, not a group",
                    spec.id,
                    other.kind()
                )));
            }
            None if entries.iter().any(|e| e.contains(&spec.id)) => {
                return Err(Error::Unsupported(format!(
                    "id '{}' is already used inside another resource",
                    spec.id
                )));
            }
            None => None,
        };

        if spec.state == State::Absent {
            let Some(pos) = group_pos else {
                return Ok(no_change(Section::Resources));
            };
            let mut section = section_el.clone();
            let group_el = section.children.remove(pos);
            let released = group_el.children.into_iter().filter(|c| c.name == "primitive");
            for (offset, member) in released.enumerate() {
                section.children.insert(pos + offset, member);
            }
            return Ok(vec![section_step(section, &section_el)]);
        }

        for member in &spec.members {
            check_groupable(&entries, &spec.id, member, &spec.members)?;
        }

        let dropped: Vec<&str> = current_group
            .map(|g| {
                g.members
                    .iter()
                    .map(|m| m.id.as_str())
                    .filter(|id| !spec.members.iter().any(|m| m == id))
                    .collect()
            })
            .unwrap_or_default();
        if !dropped.is_empty() && self.options.member_policy == MemberPolicy::Reject {
            return Err(Error::Unsupported(format!(
                "group '{}' also contains {}; list them or allow releasing removed members",
                spec.id,
                dropped.join(", ")
            )));
        }

        let mut meta = spec.meta.clone();
        apply_state(&mut meta, spec.state, current_group.map(|g| &g.meta));

        let member_els = spec
            .members
            .iter()
            .map(|id| {
                section_el
                    .find_by_id(id)
                    .cloned()
                    .ok_or_else(|| Error::UnknownReference {
                        kind: "resource",
                        id: id.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let group_el = group_element(&spec.id, &meta, member_els);

        if let (Some(current), Some(pos), true) = (current_group, group_pos, dropped.is_empty()) {
            if current.members.len() == spec.members.len() {
                // Same member set: only order or meta can differ.
                let desired = Group::from_element(&group_el).map_err(unreadable)?;
                let changes = diff(
                    &desired,
                    Some(current),
                    DiffOptions {
                        intent: Intent::Present,
                        force: spec.force,
                    },
                )
                .into_iter()
                .map(|change| change.map(|_| group_el.clone()))
                .collect();
                return Ok(to_element_steps(
                    Section::Resources,
                    changes,
                    Some(&section_el.children[pos]),
                ));
            }
        }

        let section = relocate(&section_el, spec, group_el, &dropped);
        Ok(vec![section_step(section, &section_el)])
    }

    fn plan_constraint<T: ConstraintKind>(&self, spec: &ConstraintSpec<T>) -> Result<Vec<Step>> {
        let reader = Reader::new(self.backend);
        let mut desired = spec.constraint.clone();
        if spec.intent == Intent::Present {
            check_references(&reader, &desired)?;
        }

        let current = find_constraint(&reader, &desired, spec.explicit_id)?;
        if let Some((found, _)) = &current {
            let found_id = Diffable::id(found);
            if found_id != Diffable::id(&desired) {
                debug!("adopting existing {} '{found_id}'", desired.tag());
                desired.adopt_id(found_id);
            }
        }

        let changes = diff(
            &desired,
            current.as_ref().map(|(c, _)| c),
            DiffOptions {
                intent: spec.intent,
                force: spec.force,
            },
        );
        Ok(to_steps(
            Section::Constraints,
            changes,
            current.as_ref().map(|(_, el)| el),
        ))
    }

    fn plan_property(&self, spec: &PropertySpec) -> Result<Vec<Step>> {
        let reader = Reader::new(self.backend);
        let scope = spec.scope;
        let section = property_section(scope);
        let current_el = reader
            .fetch(&Query::element(scope.tag(), scope.set_id()))?
            .into_option();
        let current = current_el
            .as_ref()
            .map(|el| PropertySet::from_element_in(scope, el))
            .transpose()
            .map_err(unreadable)?;

        let mut desired = current.clone().unwrap_or_else(|| PropertySet::new(scope));
        match spec.intent {
            Intent::Present => desired.values.merge(&spec.values),
            Intent::Absent => {
                for (name, _) in spec.values.iter() {
                    desired.values.remove(name);
                }
            }
        }

        let Some(current) = current else {
            if desired.values.is_empty() {
                return Ok(no_change(section));
            }
            return create_property_set(&reader, &desired);
        };

        // The set itself stays; removing names is a replace.
        let changes = diff(
            &desired,
            Some(&current),
            DiffOptions {
                intent: Intent::Present,
                force: false,
            },
        );
        Ok(to_steps(section, changes, current_el.as_ref()))
    }
}

/// Manage `target-role` on the outermost meta attributes.
///
/// An existing role survives unless the state says otherwise.
fn apply_state(meta: &mut Attributes, state: State, current: Option<&Attributes>) {
    if meta.get(TARGET_ROLE).is_none() {
        if let Some(role) = current.and_then(|m| m.get(TARGET_ROLE)) {
            meta.set(TARGET_ROLE, role);
        }
    }
    match state {
        State::Disabled => meta.set(TARGET_ROLE, "Stopped"),
        State::Enabled if is_disabled(meta) => {
            meta.remove(TARGET_ROLE);
        }
        _ => {}
    }
}

fn unreadable(e: Error) -> Error {
    Error::Query {
        message: e.to_string(),
    }
}

fn no_change(section: Section) -> Vec<Step> {
    vec![Step::new(section, Change::NoOp, None)]
}

/// Render model changes into steps; deletes and replaces carry `previous`.
fn to_steps<T: CibObject>(
    section: Section,
    changes: Vec<Change<T>>,
    previous: Option<&Element>,
) -> Vec<Step> {
    let changes = changes
        .into_iter()
        .map(|change| change.map(|fragment| fragment.to_element()))
        .collect();
    to_element_steps(section, changes, previous)
}

fn to_element_steps(
    section: Section,
    changes: Vec<Change<Element>>,
    previous: Option<&Element>,
) -> Vec<Step> {
    changes
        .into_iter()
        .map(|change| {
            let previous = match change {
                Change::Replace { .. } | Change::Delete { .. } => previous.cloned(),
                Change::Create(_) | Change::NoOp => None,
            };
            Step::new(section, change, previous)
        })
        .collect()
}

fn replace_step(section: Section, id: &str, fragment: Element, previous: &Element) -> Step {
    Step::new(
        section,
        Change::Replace {
            id: id.to_string(),
            fragment,
        },
        Some(previous.clone()),
    )
}

fn section_step(section: Element, previous: &Element) -> Step {
    let change = if section == *previous {
        Change::NoOp
    } else {
        Change::Replace {
            id: Section::Resources.as_str().to_string(),
            fragment: section,
        }
    };
    Step::new(Section::Resources, change, Some(previous.clone()))
}

fn group_element(id: &str, meta: &Attributes, members: Vec<Element>) -> Element {
    let mut el = Element::new("group").with_attr("id", id);
    if !meta.is_empty() {
        el.push(meta.to_set_element("meta_attributes", &format!("{id}-meta_attributes")));
    }
    el.children.extend(members);
    el
}

/// Check that `member` can be moved into group `group_id`.
fn check_groupable(
    entries: &[ResourceEntry],
    group_id: &str,
    member: &str,
    members: &[String],
) -> Result<()> {
    let Some(holder) = entries.iter().find(|e| e.contains(member)) else {
        return Err(Error::UnknownReference {
            kind: "resource",
            id: member.to_string(),
        });
    };
    match holder {
        ResourceEntry::Primitive(_) => Ok(()),
        ResourceEntry::Group(g) if g.id == member => Err(Error::Unsupported(format!(
            "'{member}' is a group; groups cannot be nested"
        ))),
        ResourceEntry::Group(g) if g.id == group_id => Ok(()),
        ResourceEntry::Group(g) => {
            let staying = g
                .members
                .iter()
                .filter(|m| !members.contains(&m.id))
                .count();
            if staying == 0 {
                Err(Error::Unsupported(format!(
                    "moving '{member}' would leave group '{}' empty",
                    g.id
                )))
            } else {
                Ok(())
            }
        }
        other => Err(Error::Unsupported(format!(
            "'{member}' is inside <{}> '{}' and cannot be grouped",
            other.kind(),
            other.id()
        ))),
    }
}

/// Rebuild the resources section with the group in place and its members
/// taken from wherever they were. Released members follow the group.
fn relocate(section_el: &Element, spec: &GroupSpec, group_el: Element, released: &[&str]) -> Element {
    let is_member = |id: Option<&str>| id.is_some_and(|id| spec.members.iter().any(|m| m == id));

    let mut section = Element {
        name: section_el.name.clone(),
        attributes: section_el.attributes.clone(),
        children: Vec::new(),
    };
    let mut anchor = None;
    let mut released_els = Vec::new();

    for child in &section_el.children {
        if child.id() == Some(spec.id.as_str()) {
            anchor = Some(section.children.len());
            released_els.extend(
                child
                    .children
                    .iter()
                    .filter(|c| released.iter().any(|r| c.id() == Some(*r)))
                    .cloned(),
            );
            continue;
        }
        if child.name == "primitive" && is_member(child.id()) {
            if anchor.is_none() {
                anchor = Some(section.children.len());
            }
            continue;
        }
        if child.name == "group" {
            let mut kept = child.clone();
            kept.children.retain(|c| !(c.name == "primitive" && is_member(c.id())));
            section.children.push(kept);
            continue;
        }
        section.children.push(child.clone());
    }

    let at = anchor.unwrap_or(section.children.len());
    section.children.insert(at, group_el);
    for (offset, member) in released_els.into_iter().enumerate() {
        section.children.insert(at + 1 + offset, member);
    }
    section
}

/// Section a singleton set is created in.
fn property_section(scope: PropertyScope) -> Section {
    match scope {
        PropertyScope::ClusterProperties => Section::CrmConfig,
        PropertyScope::ResourceDefaults => Section::RscDefaults,
    }
}

/// Create a singleton set, adding the `rsc_defaults` section if needed.
fn create_property_set(reader: &Reader<'_>, desired: &PropertySet) -> Result<Vec<Step>> {
    let section = property_section(desired.scope);
    let fragment = desired.to_element();
    if section == Section::RscDefaults && !reader.fetch_section(section)?.is_found() {
        let wrapper = Element::new(section.as_str()).with_child(fragment);
        return Ok(vec![Step::new(
            Section::Configuration,
            Change::Create(wrapper),
            None,
        )]);
    }
    Ok(vec![Step::new(section, Change::Create(fragment), None)])
}

/// Constraint kinds share one lookup and diff path.
trait ConstraintKind: CibObject + Diffable + Clone {
    fn adopt_id(&mut self, id: String);

    /// Resource ids the constraint refers to.
    fn references(&self) -> Vec<&str>;

    /// Queries that find an equivalent constraint stored under another id.
    fn natural_keys(&self) -> Vec<Query> {
        Vec::new()
    }

    /// Whether a natural-key match is really this constraint; attribute
    /// queries cannot express defaults or absent roles.
    fn same_key(&self, _found: &Self) -> bool {
        true
    }

    fn node(&self) -> Option<&str> {
        None
    }
}

fn match_query(tag: &str, attrs: &[(&str, &str)]) -> Query {
    Query::Match {
        tag: tag.to_string(),
        attrs: attrs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    }
}

impl ConstraintKind for LocationConstraint {
    fn adopt_id(&mut self, id: String) {
        self.id = id;
    }

    fn references(&self) -> Vec<&str> {
        vec![self.rsc.as_str()]
    }

    fn natural_keys(&self) -> Vec<Query> {
        vec![match_query(
            "rsc_location",
            &[("rsc", self.rsc.as_str()), ("node", self.node.as_str())],
        )]
    }

    fn node(&self) -> Option<&str> {
        Some(&self.node)
    }
}

impl ConstraintKind for ColocationConstraint {
    fn adopt_id(&mut self, id: String) {
        self.id = id;
    }

    fn references(&self) -> Vec<&str> {
        vec![self.rsc.id.as_str(), self.with.id.as_str()]
    }

    fn natural_keys(&self) -> Vec<Query> {
        vec![
            match_query(
                "rsc_colocation",
                &[("rsc", self.rsc.id.as_str()), ("with-rsc", self.with.id.as_str())],
            ),
            match_query(
                "rsc_colocation",
                &[("rsc", self.with.id.as_str()), ("with-rsc", self.rsc.id.as_str())],
            ),
        ]
    }

    fn same_key(&self, found: &Self) -> bool {
        self.same_pair(found)
    }
}

impl ConstraintKind for OrderConstraint {
    fn adopt_id(&mut self, id: String) {
        self.id = id;
    }

    fn references(&self) -> Vec<&str> {
        vec![self.first.as_str(), self.then.as_str()]
    }

    fn natural_keys(&self) -> Vec<Query> {
        vec![match_query(
            "rsc_order",
            &[("first", self.first.as_str()), ("then", self.then.as_str())],
        )]
    }

    fn same_key(&self, found: &Self) -> bool {
        self.same_pair(found)
    }
}

impl ConstraintKind for OrderSet {
    fn adopt_id(&mut self, id: String) {
        self.id = id;
    }

    fn references(&self) -> Vec<&str> {
        self.resources().collect()
    }
}

fn check_references<T: ConstraintKind>(reader: &Reader<'_>, constraint: &T) -> Result<()> {
    for rsc in constraint.references() {
        if !reader.exists(rsc)? {
            return Err(Error::UnknownReference {
                kind: "resource",
                id: rsc.to_string(),
            });
        }
    }
    if let Some(node) = constraint.node() {
        if reader.node_exists(node) == Some(false) {
            return Err(Error::UnknownReference {
                kind: "node",
                id: node.to_string(),
            });
        }
    }
    Ok(())
}

/// The stored constraint, by id first, then by natural key for derived ids.
fn find_constraint<T: ConstraintKind>(
    reader: &Reader<'_>,
    desired: &T,
    explicit_id: bool,
) -> Result<Option<(T, Element)>> {
    let id = Diffable::id(desired);
    if let Some(el) = reader.fetch(&Query::element(desired.tag(), &id))?.into_option() {
        let found = T::from_element(&el).map_err(|e| {
            Error::Unsupported(format!(
                "'{id}' exists but is not a {} of this form: {e}",
                desired.tag()
            ))
        })?;
        return Ok(Some((found, el)));
    }
    if explicit_id {
        return Ok(None);
    }
    for query in desired.natural_keys() {
        for el in reader.fetch_all(&query)? {
            match T::from_element(&el) {
                Ok(found) if desired.same_key(&found) => return Ok(Some((found, el))),
                Ok(found) => debug!("skipping {query} match '{}'", Diffable::id(&found)),
                Err(e) => debug!("skipping {query} match: {e}"),
            }
        }
    }
    Ok(None)
}

/// Primitives whose runtime state is worth checking after a change.
fn monitored_ids(descriptor: &Descriptor) -> Vec<String> {
    match descriptor {
        Descriptor::Primitive(spec) => vec![spec.id.clone()],
        Descriptor::Group(spec) => spec.members.clone(),
        _ => Vec::new(),
    }
}

fn summarize(descriptor: &Descriptor, steps: &[Step], dry_run: bool) -> String {
    let kind = descriptor.kind();
    let id = descriptor.id();
    if steps.is_empty() {
        return format!("{kind} '{id}' is up to date");
    }
    let actions = steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    if dry_run {
        format!("{kind} '{id}' would change: {actions}")
    } else {
        format!("{kind} '{id}' changed: {actions}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{Failure, MemoryBackend};
    use crate::descriptor::{
        ColocationParams, GroupParams, LocationParams, OrderParams, OrderSetParams,
        PrimitiveParams, PropertyParams, RawDescriptor, ResourceSets,
    };

    fn reconciler(backend: &MemoryBackend) -> Reconciler<'_> {
        Reconciler::new(
            backend,
            ReconcileOptions {
                verify: false,
                ..Default::default()
            },
        )
    }

    fn primitive(name: &str, agent: &str) -> PrimitiveParams {
        PrimitiveParams {
            name: Some(name.into()),
            agent: Some(agent.into()),
            ..Default::default()
        }
    }

    fn vip() -> PrimitiveParams {
        PrimitiveParams {
            params: Some("ip=192.168.0.100".into()),
            op: vec!["monitor interval=30s".into()],
            ..primitive("vip", "ocf:heartbeat:IPaddr2")
        }
    }

    fn group(name: &str, members: &[&str]) -> GroupParams {
        GroupParams {
            name: Some(name.into()),
            resources: members.iter().map(|m| (*m).to_string()).collect(),
            ..Default::default()
        }
    }

    fn apply(backend: &MemoryBackend, raw: RawDescriptor) -> Result<Outcome> {
        reconciler(backend).reconcile(&raw.build().unwrap())
    }

    fn top_level_ids(backend: &MemoryBackend) -> Vec<String> {
        let cib = backend.cib();
        cib.find_named("resources")
            .map(|r| {
                r.children
                    .iter()
                    .filter_map(|c| c.id().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn constraint_ids(backend: &MemoryBackend) -> Vec<String> {
        let cib = backend.cib();
        cib.find_named("constraints")
            .map(|c| {
                c.children
                    .iter()
                    .filter_map(|el| el.id().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn order(first_action: Option<&str>) -> OrderParams {
        OrderParams {
            resource1: Some("db".into()),
            resource1_action: first_action.map(String::from),
            resource2: Some("web".into()),
            ..Default::default()
        }
    }

    fn seed_primitives(backend: &MemoryBackend, names: &[&str]) {
        for name in names {
            apply(backend, RawDescriptor::Primitive(primitive(name, "ocf:heartbeat:Dummy"))).unwrap();
        }
    }

    #[test]
    fn test_primitive_idempotent() {
        let backend = MemoryBackend::new();
        let first = apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        assert!(first.changed);
        let after_first = backend.element("vip");

        let second = apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        assert!(!second.changed);
        assert!(second.steps.is_empty());
        assert_eq!(backend.element("vip"), after_first);
        assert_eq!(backend.writes(), 1);
    }

    #[test]
    fn test_primitive_create_carries_operations() {
        let backend = MemoryBackend::new();
        let desc = RawDescriptor::Primitive(vip()).build().unwrap();
        let steps = reconciler(&backend).plan(&desc).unwrap();
        assert_eq!(steps.len(), 1);
        let Change::Create(fragment) = &steps[0].change else {
            panic!("expected a create");
        };
        let op = fragment.find_by_id("vip-monitor-interval-30s").unwrap();
        assert_eq!(op.attr("interval"), Some("30s"));
        assert!(fragment.find_by_id("vip-instance_attributes-ip").is_some());
    }

    #[test]
    fn test_primitive_identical_is_noop() {
        let backend = MemoryBackend::new();
        let desc = RawDescriptor::Primitive(vip()).build().unwrap();
        let Descriptor::Primitive(spec) = &desc else {
            panic!("expected a primitive");
        };
        let definition = spec.definition.clone().unwrap();
        backend
            .seed(Section::Resources, definition.to_element())
            .unwrap();

        let outcome = reconciler(&backend).reconcile(&desc).unwrap();
        assert!(!outcome.changed);
        assert_eq!(backend.writes(), 0);
        assert_eq!(outcome.message, "primitive 'vip' is up to date");
    }

    #[test]
    fn test_primitive_param_change_replaces() {
        let backend = MemoryBackend::new();
        apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        let changed = PrimitiveParams {
            params: Some("ip=192.168.0.101".into()),
            ..vip()
        };
        let outcome = apply(&backend, RawDescriptor::Primitive(changed)).unwrap();
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].change.label(), "replace");
        let nv = backend.element("vip-instance_attributes-ip").unwrap();
        assert_eq!(nv.attr("value"), Some("192.168.0.101"));
    }

    #[test]
    fn test_agent_change_deletes_and_recreates() {
        let backend = MemoryBackend::new();
        apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        let changed = PrimitiveParams {
            agent: Some("ocf:pacemaker:Dummy".into()),
            ..vip()
        };
        let outcome = apply(&backend, RawDescriptor::Primitive(changed)).unwrap();
        let labels: Vec<_> = outcome.steps.iter().map(|s| s.change.label()).collect();
        assert_eq!(labels, vec!["delete", "create"]);
        assert_eq!(
            backend.element("vip").unwrap().attr("provider"),
            Some("pacemaker")
        );
    }

    #[test]
    fn test_wrapping_in_clone_and_changing_meta() {
        let backend = MemoryBackend::new();
        apply(&backend, RawDescriptor::Primitive(vip())).unwrap();

        let cloned = PrimitiveParams {
            clone: Some("clone-max=2".into()),
            ..vip()
        };
        let outcome = apply(&backend, RawDescriptor::Primitive(cloned.clone())).unwrap();
        let labels: Vec<_> = outcome.steps.iter().map(|s| s.change.label()).collect();
        assert_eq!(labels, vec!["delete", "create"]);
        assert_eq!(top_level_ids(&backend), vec!["vip-clone"]);

        let more = PrimitiveParams {
            clone: Some("clone-max=3".into()),
            ..cloned
        };
        let outcome = apply(&backend, RawDescriptor::Primitive(more)).unwrap();
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].to_string(), "replace clone 'vip-clone'");
        assert!(backend.element("vip").is_some());
    }

    #[test]
    fn test_disable_and_enable_on_wrapper() {
        let backend = MemoryBackend::new();
        let master = PrimitiveParams {
            master: Some("master-max=1 notify=true".into()),
            state: State::Disabled,
            ..primitive("db", "ocf:heartbeat:pgsql")
        };
        apply(&backend, RawDescriptor::Primitive(master)).unwrap();
        let role = backend.element("db-master-meta_attributes-target-role").unwrap();
        assert_eq!(role.attr("value"), Some("Stopped"));

        let enable = PrimitiveParams {
            name: Some("db".into()),
            state: State::Enabled,
            ..Default::default()
        };
        let outcome = apply(&backend, RawDescriptor::Primitive(enable)).unwrap();
        assert!(outcome.changed);
        assert!(backend.element("db-master-meta_attributes-target-role").is_none());
        assert!(backend.element("db-master-meta_attributes-notify").is_some());
    }

    #[test]
    fn test_present_keeps_existing_target_role() {
        let backend = MemoryBackend::new();
        let disabled = PrimitiveParams {
            state: State::Disabled,
            ..vip()
        };
        apply(&backend, RawDescriptor::Primitive(disabled)).unwrap();
        let outcome = apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        assert!(!outcome.changed);
    }

    #[test]
    fn test_enable_missing_resource_is_not_found() {
        let backend = MemoryBackend::new();
        let enable = PrimitiveParams {
            name: Some("ghost".into()),
            state: State::Enabled,
            ..Default::default()
        };
        let err = apply(&backend, RawDescriptor::Primitive(enable)).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::NotFound);
    }

    #[test]
    fn test_primitive_absent() {
        let backend = MemoryBackend::new();
        let absent = PrimitiveParams {
            name: Some("vip".into()),
            state: State::Absent,
            ..Default::default()
        };
        assert!(!apply(&backend, RawDescriptor::Primitive(absent.clone())).unwrap().changed);

        apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        assert!(apply(&backend, RawDescriptor::Primitive(absent)).unwrap().changed);
        assert!(backend.element("vip").is_none());
    }

    #[test]
    fn test_check_mode_writes_nothing() {
        let backend = MemoryBackend::new();
        let reconciler = Reconciler::new(
            &backend,
            ReconcileOptions {
                dry_run: true,
                ..Default::default()
            },
        );
        let outcome = reconciler
            .reconcile(&RawDescriptor::Primitive(vip()).build().unwrap())
            .unwrap();
        assert!(outcome.changed);
        assert!(outcome.message.contains("would change"));
        assert_eq!(backend.writes(), 0);
        assert!(!backend.calls().iter().any(|c| c.starts_with("status")));
    }

    #[test]
    fn test_conflict_retried_once() {
        let backend = MemoryBackend::new();
        backend.fail_next_write(Failure::Conflict);
        let outcome = apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        assert!(outcome.changed);
        assert_eq!(backend.writes(), 1);
        let creates = backend
            .calls()
            .iter()
            .filter(|c| c.starts_with("create"))
            .count();
        assert_eq!(creates, 2);
    }

    #[test]
    fn test_second_conflict_is_terminal() {
        let backend = MemoryBackend::new();
        backend.fail_writes(Failure::Conflict);
        let err = apply(&backend, RawDescriptor::Primitive(vip())).unwrap_err();
        assert!(err.to_string().starts_with("primitive 'vip' failed"));
        assert!(matches!(
            err,
            Error::Descriptor { ref source, .. } if matches!(**source, Error::ConcurrentModification { .. })
        ));
        let creates = backend
            .calls()
            .iter()
            .filter(|c| c.starts_with("create"))
            .count();
        assert_eq!(creates, 2);
    }

    #[test]
    fn test_schema_rejection_not_retried() {
        let backend = MemoryBackend::new();
        backend.fail_writes(Failure::SchemaRejected);
        let err = apply(&backend, RawDescriptor::Primitive(vip())).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::SchemaRejected);
        assert_eq!(backend.calls().iter().filter(|c| c.starts_with("create")).count(), 1);
    }

    #[test]
    fn test_location_scenario() {
        let backend = MemoryBackend::new().with_nodes(&["server1"]);
        apply(&backend, RawDescriptor::Primitive(vip())).unwrap();

        let location = LocationParams {
            resource: Some("vip".into()),
            node: Some("server1".into()),
            score: Some("100".into()),
            ..Default::default()
        };
        let outcome = apply(&backend, RawDescriptor::Location(location.clone())).unwrap();
        assert_eq!(outcome.steps.len(), 1);
        let Change::Create(el) = &outcome.steps[0].change else {
            panic!("expected a create");
        };
        assert_eq!(el.name, "rsc_location");
        assert_eq!(el.attr("rsc"), Some("vip"));
        assert_eq!(el.attr("node"), Some("server1"));
        assert_eq!(el.attr("score"), Some("100"));

        assert!(!apply(&backend, RawDescriptor::Location(location)).unwrap().changed);
    }

    #[test]
    fn test_location_adopts_existing_id() {
        let backend = MemoryBackend::new();
        apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        backend
            .seed(
                Section::Constraints,
                Element::new("rsc_location")
                    .with_attr("id", "location-vip-server1-100")
                    .with_attr("rsc", "vip")
                    .with_attr("node", "server1")
                    .with_attr("score", "100"),
            )
            .unwrap();

        let location = LocationParams {
            resource: Some("vip".into()),
            node: Some("server1".into()),
            score: Some("200".into()),
            ..Default::default()
        };
        let outcome = apply(&backend, RawDescriptor::Location(location)).unwrap();
        assert_eq!(
            outcome.steps[0].to_string(),
            "replace rsc_location 'location-vip-server1-100'"
        );
        assert!(backend.element("location-vip-server1").is_none());
    }

    #[test]
    fn test_unknown_references() {
        let backend = MemoryBackend::new().with_nodes(&["server1"]);
        let location = LocationParams {
            resource: Some("vip".into()),
            node: Some("server1".into()),
            ..Default::default()
        };
        let err = apply(&backend, RawDescriptor::Location(location.clone())).unwrap_err();
        assert!(err.to_string().contains("unknown resource 'vip'"));

        apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        let elsewhere = LocationParams {
            node: Some("server9".into()),
            ..location
        };
        let err = apply(&backend, RawDescriptor::Location(elsewhere)).unwrap_err();
        assert!(err.to_string().contains("unknown node 'server9'"));
        assert_eq!(backend.writes(), 1);
    }

    #[test]
    fn test_colocation_found_in_reverse() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["db", "web"]);
        backend
            .seed(
                Section::Constraints,
                Element::new("rsc_colocation")
                    .with_attr("id", "web-with-db")
                    .with_attr("rsc", "web")
                    .with_attr("with-rsc", "db")
                    .with_attr("score", "INFINITY"),
            )
            .unwrap();
        let colocation = ColocationParams {
            resource1: Some("db".into()),
            resource2: Some("web".into()),
            ..Default::default()
        };
        let outcome = apply(&backend, RawDescriptor::Colocation(colocation)).unwrap();
        assert_eq!(outcome.steps[0].to_string(), "replace rsc_colocation 'web-with-db'");
        assert_eq!(backend.element("web-with-db").unwrap().attr("rsc"), Some("db"));
    }

    #[test]
    fn test_colocations_differing_by_role_coexist() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["db", "vip"]);
        let master = ColocationParams {
            resource1: Some("db=Master".into()),
            resource2: Some("vip".into()),
            score: Some("INFINITY".into()),
            ..Default::default()
        };
        let slave = ColocationParams {
            resource1: Some("db=Slave".into()),
            score: Some("-INFINITY".into()),
            ..master.clone()
        };

        assert!(apply(&backend, RawDescriptor::Colocation(master.clone())).unwrap().changed);
        assert!(apply(&backend, RawDescriptor::Colocation(slave.clone())).unwrap().changed);
        assert!(!apply(&backend, RawDescriptor::Colocation(master)).unwrap().changed);
        assert!(!apply(&backend, RawDescriptor::Colocation(slave)).unwrap().changed);
        assert_eq!(
            constraint_ids(&backend),
            vec!["colocation-db-master-vip", "colocation-db-slave-vip"]
        );
    }

    #[test]
    fn test_colocation_without_role_skips_roled_match() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["db", "vip"]);
        backend
            .seed(
                Section::Constraints,
                Element::new("rsc_colocation")
                    .with_attr("id", "db-master-on-vip")
                    .with_attr("rsc", "db")
                    .with_attr("rsc-role", "Master")
                    .with_attr("with-rsc", "vip")
                    .with_attr("score", "INFINITY"),
            )
            .unwrap();
        let plain = ColocationParams {
            resource1: Some("db".into()),
            resource2: Some("vip".into()),
            ..Default::default()
        };
        let outcome = apply(&backend, RawDescriptor::Colocation(plain)).unwrap();
        assert_eq!(outcome.steps[0].change.label(), "create");
        assert_eq!(
            backend.element("db-master-on-vip").unwrap().attr("rsc-role"),
            Some("Master")
        );
        assert_eq!(constraint_ids(&backend).len(), 2);
    }

    #[test]
    fn test_order_create_and_idempotent() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["db", "web"]);

        let outcome = apply(&backend, RawDescriptor::Order(order(None))).unwrap();
        assert!(outcome.changed);
        let Change::Create(el) = &outcome.steps[0].change else {
            panic!("expected a create");
        };
        assert_eq!(el.attr("id"), Some("order-db-start-web-start"));
        assert_eq!(el.attr("first-action"), Some("start"));
        assert_eq!(el.attr("then"), Some("web"));

        let writes = backend.writes();
        let again = apply(&backend, RawDescriptor::Order(order(None))).unwrap();
        assert!(!again.changed);
        assert_eq!(backend.writes(), writes);
    }

    #[test]
    fn test_orders_differing_by_action_coexist() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["db", "web"]);

        assert!(apply(&backend, RawDescriptor::Order(order(None))).unwrap().changed);
        assert!(apply(&backend, RawDescriptor::Order(order(Some("promote")))).unwrap().changed);
        assert!(!apply(&backend, RawDescriptor::Order(order(Some("promote")))).unwrap().changed);
        assert!(!apply(&backend, RawDescriptor::Order(order(None))).unwrap().changed);
        assert_eq!(
            constraint_ids(&backend),
            vec!["order-db-start-web-start", "order-db-promote-web-start"]
        );
    }

    #[test]
    fn test_order_adopts_existing_id() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["db", "web"]);
        backend
            .seed(
                Section::Constraints,
                Element::new("rsc_order")
                    .with_attr("id", "db-then-web")
                    .with_attr("first", "db")
                    .with_attr("then", "web")
                    .with_attr("kind", "Optional"),
            )
            .unwrap();

        let outcome = apply(&backend, RawDescriptor::Order(order(None))).unwrap();
        assert_eq!(outcome.steps[0].to_string(), "replace rsc_order 'db-then-web'");
        let stored = backend.element("db-then-web").unwrap();
        assert_eq!(stored.attr("kind"), None);
        assert_eq!(stored.attr("first-action"), Some("start"));
        assert_eq!(constraint_ids(&backend), vec!["db-then-web"]);

        assert!(!apply(&backend, RawDescriptor::Order(order(None))).unwrap().changed);

        let promote = apply(&backend, RawDescriptor::Order(order(Some("promote")))).unwrap();
        assert_eq!(promote.steps[0].change.label(), "create");
        assert_eq!(constraint_ids(&backend).len(), 2);
    }

    #[test]
    fn test_constraint_absent() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["a", "b"]);
        let sets = OrderSetParams {
            name: Some("order-ab".into()),
            resource_sets: ResourceSets::Nested(vec![vec!["a".into()], vec!["b".into()]]),
            ..Default::default()
        };
        apply(&backend, RawDescriptor::OrderSet(sets.clone())).unwrap();
        assert!(backend.element("order-ab-set-2").is_some());

        let absent = OrderSetParams {
            state: Intent::Absent,
            ..sets
        };
        assert!(apply(&backend, RawDescriptor::OrderSet(absent.clone())).unwrap().changed);
        assert!(backend.element("order-ab").is_none());
        assert!(!apply(&backend, RawDescriptor::OrderSet(absent)).unwrap().changed);
    }

    #[test]
    fn test_group_create_relocates_members() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["other", "vip", "web"]);

        let outcome = apply(&backend, RawDescriptor::Group(group("site", &["vip", "web"]))).unwrap();
        assert_eq!(outcome.steps.len(), 1);
        assert!(outcome.steps[0].is_section_replace());
        assert_eq!(top_level_ids(&backend), vec!["other", "site"]);

        let site = backend.element("site").unwrap();
        let members: Vec<_> = site.children_named("primitive").filter_map(|e| e.id()).collect();
        assert_eq!(members, vec!["vip", "web"]);

        assert!(!apply(&backend, RawDescriptor::Group(group("site", &["vip", "web"]))).unwrap().changed);
    }

    #[test]
    fn test_group_reorder_replaces_group_only() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["vip", "web"]);
        apply(&backend, RawDescriptor::Group(group("site", &["vip", "web"]))).unwrap();

        let outcome = apply(&backend, RawDescriptor::Group(group("site", &["web", "vip"]))).unwrap();
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].to_string(), "replace group 'site'");
        let site = backend.element("site").unwrap();
        let members: Vec<_> = site.children_named("primitive").filter_map(|e| e.id()).collect();
        assert_eq!(members, vec!["web", "vip"]);
    }

    #[test]
    fn test_group_member_dropped() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["vip", "web"]);
        apply(&backend, RawDescriptor::Group(group("site", &["vip", "web"]))).unwrap();

        let err = apply(&backend, RawDescriptor::Group(group("site", &["vip"]))).unwrap_err();
        assert!(err.to_string().contains("also contains web"));

        let releasing = Reconciler::new(
            &backend,
            ReconcileOptions {
                verify: false,
                member_policy: MemberPolicy::Release,
                ..Default::default()
            },
        );
        let desc = RawDescriptor::Group(group("site", &["vip"])).build().unwrap();
        assert!(releasing.reconcile(&desc).unwrap().changed);
        assert_eq!(top_level_ids(&backend), vec!["site", "web"]);
    }

    #[test]
    fn test_group_absent_releases_members() {
        let backend = MemoryBackend::new();
        seed_primitives(&backend, &["vip", "web"]);
        apply(&backend, RawDescriptor::Group(group("site", &["vip", "web"]))).unwrap();

        let absent = GroupParams {
            state: State::Absent,
            ..group("site", &[])
        };
        assert!(apply(&backend, RawDescriptor::Group(absent)).unwrap().changed);
        assert_eq!(top_level_ids(&backend), vec!["vip", "web"]);
    }

    #[test]
    fn test_group_unknown_member() {
        let backend = MemoryBackend::new();
        let err = apply(&backend, RawDescriptor::Group(group("site", &["vip"]))).unwrap_err();
        assert!(matches!(
            err,
            Error::Descriptor { ref source, .. } if matches!(**source, Error::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_grouped_primitive_update_replaces_group() {
        let backend = MemoryBackend::new();
        apply(&backend, RawDescriptor::Primitive(vip())).unwrap();
        seed_primitives(&backend, &["web"]);
        apply(&backend, RawDescriptor::Group(group("site", &["vip", "web"]))).unwrap();

        let changed = PrimitiveParams {
            params: Some("ip=10.0.0.1".into()),
            ..vip()
        };
        let outcome = apply(&backend, RawDescriptor::Primitive(changed)).unwrap();
        assert_eq!(outcome.steps[0].to_string(), "replace group 'site'");
        assert_eq!(
            backend.element("vip-instance_attributes-ip").unwrap().attr("value"),
            Some("10.0.0.1")
        );

        let cloned = PrimitiveParams {
            clone: Some(String::new()),
            ..vip()
        };
        let err = apply(&backend, RawDescriptor::Primitive(cloned)).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Other);
    }

    #[test]
    fn test_property_merge_keeps_unmanaged() {
        let backend = MemoryBackend::new();
        backend
            .seed(
                Section::CrmConfig,
                Attributes::from_pairs([("dc-version".to_string(), "2.1.5".to_string())])
                    .to_set_element("cluster_property_set", "cib-bootstrap-options"),
            )
            .unwrap();

        let set = PropertyParams {
            params: Some("stonith-enabled=false".into()),
            state: Intent::Present,
        };
        let outcome = apply(&backend, RawDescriptor::Property(set.clone())).unwrap();
        assert_eq!(outcome.steps[0].change.label(), "replace");
        assert!(backend.element("cib-bootstrap-options-dc-version").is_some());
        assert!(!apply(&backend, RawDescriptor::Property(set)).unwrap().changed);

        let unset = PropertyParams {
            params: Some("stonith-enabled".into()),
            state: Intent::Absent,
        };
        assert!(apply(&backend, RawDescriptor::Property(unset)).unwrap().changed);
        assert!(backend.element("cib-bootstrap-options-stonith-enabled").is_none());
        assert!(backend.element("cib-bootstrap-options-dc-version").is_some());
    }

    #[test]
    fn test_resource_defaults_create_section() {
        let backend = MemoryBackend::new();
        let defaults = PropertyParams {
            params: Some("resource-stickiness=100".into()),
            state: Intent::Present,
        };
        let outcome = apply(&backend, RawDescriptor::ResourceDefaults(defaults.clone())).unwrap();
        assert_eq!(outcome.steps[0].to_string(), "create rsc_defaults in configuration");
        assert!(backend.element("rsc_defaults-options-resource-stickiness").is_some());

        let more = PropertyParams {
            params: Some("migration-threshold=3".into()),
            ..defaults
        };
        let outcome = apply(&backend, RawDescriptor::ResourceDefaults(more)).unwrap();
        assert_eq!(outcome.steps[0].to_string(), "replace meta_attributes 'rsc_defaults-options'");
        assert!(backend.element("rsc_defaults-options-resource-stickiness").is_some());
    }

    #[test]
    fn test_monitor_failure_is_a_warning() {
        let backend = MemoryBackend::new();
        backend.set_monitor_down(true);
        let reconciler = Reconciler::new(&backend, ReconcileOptions::default());
        let outcome = reconciler
            .reconcile(&RawDescriptor::Primitive(vip()).build().unwrap())
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.warnings.len(), 1);

        let result = InvocationResult::from(&outcome);
        assert!(!result.failed);
        assert!(result.message.contains("warning: could not read resource status"));
    }

    #[test]
    fn test_invocation_result_from_error() {
        let backend = MemoryBackend::new();
        backend.fail_writes(Failure::ToolUnavailable);
        let result = InvocationResult::from_result(&apply(&backend, RawDescriptor::Primitive(vip())));
        assert!(result.failed);
        assert!(!result.changed);
        assert!(result.message.starts_with("primitive 'vip' failed: cibadmin is not available"));
    }
}
