//! In-memory model of CIB fragments.
//!
//! Every kind renders to the exact element shape Pacemaker expects and can
//! be read back from it. Equality is structural: nvpair and operation order
//! is ignored, group membership and resource set order is not.

mod attributes;
pub mod constraint;
pub mod property;
pub mod resource;

pub use attributes::Attributes;
pub use constraint::{
    ColocationConstraint, LocationConstraint, OrderAction, OrderConstraint, OrderKind,
    OrderOptions, OrderSet, ResourceRef, ResourceSet, Score,
};
pub use property::{PropertyScope, PropertySet};
pub use resource::{
    Agent, Group, Operation, Primitive, ResourceEntry, Role, TARGET_ROLE, Wrapper, WrapperKind,
    is_disabled,
};

use crate::error::Result;
use crate::xml::Element;

/// Conversion between a model value and its CIB element.
pub trait CibObject: Sized {
    /// Tag of the rendered element.
    fn tag(&self) -> &'static str;

    /// Render to the element Pacemaker expects.
    fn to_element(&self) -> Element;

    /// Read back from a CIB element.
    fn from_element(element: &Element) -> Result<Self>;
}
