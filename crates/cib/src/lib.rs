//! # cib
//!
//! Declarative, idempotent management of the Pacemaker cluster
//! information base (CIB).
//!
//! A descriptor states how one primitive, group, constraint or property set
//! should look. The pipeline reads the narrowest part of the CIB it needs,
//! compares it with the descriptor and writes only what differs:
//!
//! - [`descriptor`]: raw parameters to validated desired state
//! - [`reader`]: current state from the CIB
//! - [`model`]: typed fragments and their XML shape
//! - [`declarative::diff`]: create, replace, delete or nothing
//! - [`writer`]: one admin tool call per change
//! - [`reconciler`]: the whole cycle, retried once on concurrent edits
//!
//! ## Example
//!
//! ```no_run
//! use cib::{Client, PrimitiveParams, RawDescriptor};
//!
//! let client = Client::new("/usr/sbin/cibadmin", "/usr/sbin/crm_mon");
//! let vip = PrimitiveParams {
//!     name: Some("vip".into()),
//!     agent: Some("ocf:heartbeat:IPaddr2".into()),
//!     params: Some("ip=192.168.0.100".into()),
//!     op: vec!["monitor interval=30s".into()],
//!     ..Default::default()
//! };
//! let result = client.invoke(&RawDescriptor::Primitive(vip));
//! println!("changed={} failed={}: {}", result.changed, result.failed, result.message);
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod monitor;
pub mod params;
pub mod reader;
pub mod reconciler;
pub mod retry;
pub mod writer;
pub mod xml;

pub use backend::{Backend, Query, Section, cibadmin::CibadminBackend, memory::MemoryBackend};
pub use descriptor::{
    ColocationParams, Descriptor, GroupParams, LocationParams, OrderParams, OrderSetParams,
    PrimitiveParams, PropertyParams, RawDescriptor, ResourceSets, State,
};
pub use error::{Error, ErrorCategory, Result};
pub use reconciler::{InvocationResult, MemberPolicy, Outcome, ReconcileOptions, Reconciler};
pub use writer::Step;
pub use xml::Element;

use std::path::PathBuf;

/// High-level entry point: one backend, one set of options.
pub struct Client {
    backend: Box<dyn Backend>,
    options: ReconcileOptions,
}

impl Client {
    /// Client that drives the given `cibadmin` and `crm_mon` binaries.
    pub fn new(cibadmin: impl Into<PathBuf>, crm_mon: impl Into<PathBuf>) -> Self {
        Self::with_backend(Box::new(CibadminBackend::new(cibadmin, crm_mon)))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            options: ReconcileOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ReconcileOptions {
        self.options
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(self.backend.as_ref(), self.options)
    }

    /// Converge the CIB on a validated descriptor.
    pub fn reconcile(&self, descriptor: &Descriptor) -> Result<Outcome> {
        self.reconciler().reconcile(descriptor)
    }

    /// Steps a descriptor would take, without writing.
    pub fn plan(&self, descriptor: &Descriptor) -> Result<Vec<Step>> {
        self.reconciler().plan(descriptor)
    }

    /// Validate and reconcile raw parameters.
    ///
    /// Never fails: errors are reported in the result. Validation happens
    /// before any tool is called.
    pub fn invoke(&self, raw: &RawDescriptor) -> InvocationResult {
        let result = raw.build().and_then(|descriptor| self.reconcile(&descriptor));
        InvocationResult::from_result(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn client(backend: &Rc<MemoryBackend>) -> Client {
        Client::with_backend(Box::new(Rc::clone(backend))).with_options(ReconcileOptions {
            verify: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_invoke_validation_error_makes_no_calls() {
        let backend = Rc::new(MemoryBackend::new());
        let result = client(&backend).invoke(&RawDescriptor::Primitive(PrimitiveParams {
            name: Some("vip".into()),
            ..Default::default()
        }));
        assert!(result.failed);
        assert!(!result.changed);
        assert_eq!(result.message, "invalid type: is required");
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_invoke_is_idempotent() {
        let backend = Rc::new(MemoryBackend::new());
        let client = client(&backend);
        let raw = RawDescriptor::Property(PropertyParams {
            params: Some("stonith-enabled=false no-quorum-policy=ignore".into()),
            ..Default::default()
        });

        let first = client.invoke(&raw);
        assert!(first.changed, "{}", first.message);
        assert!(!first.failed);

        let second = client.invoke(&raw);
        assert!(!second.changed);
        assert_eq!(second.message, "property 'cib-bootstrap-options' is up to date");
        assert_eq!(backend.writes(), 1);
    }

    #[test]
    fn test_plan_reports_without_writing() {
        let backend = Rc::new(MemoryBackend::new());
        let client = client(&backend);
        let descriptor = RawDescriptor::Property(PropertyParams {
            params: Some("maintenance-mode=true".into()),
            ..Default::default()
        })
        .build()
        .unwrap();
        let steps = client.plan(&descriptor).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(
            steps[0].to_string(),
            "create cluster_property_set 'cib-bootstrap-options' in crm_config"
        );
        assert_eq!(backend.writes(), 0);
    }
}
