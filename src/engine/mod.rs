//! Execution engine for cibform
//!
//! The engine orchestrates:
//! 1. Planning - One resource per manifest descriptor, in apply order
//! 2. Diffing - What each descriptor would still change in the CIB
//! 3. Executing - Confirm, then reconcile descriptors one at a time

pub mod differ;
pub mod executor;

pub use executor::{ExecuteOptions, execute};

use std::rc::Rc;

use crate::resource::CibResource;
use cib::{Client, Descriptor};
use declarative::ExecutionPlan;

/// Build a plan from validated descriptors, keeping their order
pub fn plan(descriptors: Vec<Descriptor>, client: &Rc<Client>) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    for descriptor in descriptors {
        plan.add_resource(Box::new(CibResource::new(descriptor, Rc::clone(client))));
    }
    plan
}
