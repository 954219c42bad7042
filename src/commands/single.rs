//! One descriptor, given as subcommand flags

use anyhow::Result;
use cib::{Client, RawDescriptor};

use crate::Context;
use crate::config::Settings;
use crate::ui;

/// Reconcile one descriptor and report the result.
///
/// Returns whether it succeeded; failures are reported, not returned.
pub fn run(ctx: &Context, settings: &Settings, raw: &RawDescriptor, check: bool) -> Result<bool> {
    let client = settings.client(check);
    run_with(ctx, &client, raw)
}

pub fn run_with(ctx: &Context, client: &Client, raw: &RawDescriptor) -> Result<bool> {
    if ctx.json {
        let result = client.invoke(raw);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(!result.failed);
    }

    let outcome = raw
        .build()
        .and_then(|descriptor| client.reconcile(&descriptor));

    match outcome {
        Ok(outcome) => {
            if outcome.changed {
                ui::success(&outcome.message);
            } else if !ctx.quiet {
                ui::info(&outcome.message);
            }
            if ctx.verbose > 0 {
                for step in &outcome.steps {
                    ui::step_line(&step.to_string());
                }
            }
            for warning in &outcome.warnings {
                ui::warn(warning);
            }
            Ok(true)
        }
        Err(e) => {
            ui::error(&e.detailed());
            if !ctx.quiet {
                ui::dim(e.category().advice());
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cib::{MemoryBackend, PrimitiveParams, ReconcileOptions};
    use std::rc::Rc;

    fn ctx(json: bool) -> Context {
        Context {
            verbose: 1,
            quiet: false,
            json,
        }
    }

    fn client(backend: &Rc<MemoryBackend>, dry_run: bool) -> Client {
        Client::with_backend(Box::new(Rc::clone(backend))).with_options(ReconcileOptions {
            dry_run,
            verify: false,
            ..Default::default()
        })
    }

    fn vip() -> RawDescriptor {
        RawDescriptor::Primitive(PrimitiveParams {
            name: Some("vip".into()),
            agent: Some("ocf:heartbeat:IPaddr2".into()),
            params: Some("ip=10.0.0.1".into()),
            op: vec!["monitor interval=30s".into()],
            ..Default::default()
        })
    }

    #[test]
    fn test_run_creates_then_settles() {
        let backend = Rc::new(MemoryBackend::new());
        let client = client(&backend, false);

        assert!(run_with(&ctx(false), &client, &vip()).unwrap());
        assert!(backend.element("vip").is_some());
        let writes = backend.writes();

        assert!(run_with(&ctx(true), &client, &vip()).unwrap());
        assert_eq!(backend.writes(), writes);
    }

    #[test]
    fn test_check_mode_writes_nothing() {
        let backend = Rc::new(MemoryBackend::new());
        assert!(run_with(&ctx(false), &client(&backend, true), &vip()).unwrap());
        assert_eq!(backend.writes(), 0);
        assert!(backend.element("vip").is_none());
    }

    #[test]
    fn test_invalid_descriptor_fails_without_calls() {
        let backend = Rc::new(MemoryBackend::new());
        let raw = RawDescriptor::Primitive(PrimitiveParams::default());

        assert!(!run_with(&ctx(false), &client(&backend, false), &raw).unwrap());
        assert!(!run_with(&ctx(true), &client(&backend, false), &raw).unwrap());
        assert!(backend.calls().is_empty());
    }
}
