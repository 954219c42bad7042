//! Manifest commands: `apply`, `diff` and `status`
//!
//! Every descriptor in the manifest is validated before the cluster is
//! touched. Descriptors then run one at a time in apply order, so a
//! constraint may reference a primitive created earlier in the same run.

use anyhow::{Result, bail};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;

use cib::{Client, Descriptor, ErrorCategory, InvocationResult};
use declarative::{Resource, ResourceState, compute_diffs};

use crate::Context;
use crate::cli::ManifestArgs;
use crate::config::Settings;
use crate::engine::{self, ExecuteOptions, differ};
use crate::manifest::Manifest;
use crate::paths;
use crate::resource::CibResource;
use crate::ui;

/// One descriptor's result in JSON output
#[derive(Debug, Serialize)]
struct Report {
    kind: &'static str,
    id: String,
    #[serde(flatten)]
    result: InvocationResult,
}

#[derive(Debug, Serialize)]
struct ManifestReport {
    changed: bool,
    failed: bool,
    results: Vec<Report>,
}

impl ManifestReport {
    fn new(results: Vec<Report>) -> Self {
        Self {
            changed: results.iter().any(|r| r.result.changed),
            failed: results.iter().any(|r| r.result.failed),
            results,
        }
    }
}

/// Drift of one descriptor in `status --json` and `diff --json`
#[derive(Debug, Serialize)]
struct StatusEntry {
    kind: &'static str,
    id: String,
    state: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

// ============================================================================
// Entry points
// ============================================================================

pub fn apply(
    ctx: &Context,
    settings: &Settings,
    args: &ManifestArgs,
    check: bool,
    yes: bool,
) -> Result<bool> {
    let client = Rc::new(settings.client(check));
    apply_with(ctx, &client, args, yes)
}

pub fn diff(ctx: &Context, settings: &Settings, args: &ManifestArgs) -> Result<bool> {
    let client = Rc::new(settings.client(true));
    diff_with(ctx, &client, args)
}

pub fn status(ctx: &Context, settings: &Settings, args: &ManifestArgs) -> Result<bool> {
    let client = Rc::new(settings.client(true));
    status_with(ctx, &client, args)
}

// ============================================================================
// Implementations
// ============================================================================

pub fn apply_with(
    ctx: &Context,
    client: &Rc<Client>,
    args: &ManifestArgs,
    yes: bool,
) -> Result<bool> {
    let dry_run = client.options().dry_run;
    let descriptors = load(client, args)?;

    if ctx.json {
        if !yes && !dry_run {
            bail!("apply --json cannot prompt; pass --yes or --check");
        }
        let report = invoke_all(client, &descriptors, args.fail_fast);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(!report.failed);
    }

    ui::header(if dry_run {
        "Checking Manifest"
    } else {
        "Applying Manifest"
    });
    ui::kv("Manifest", &args.manifest);
    ui::kv("Descriptors", &descriptors.len().to_string());

    let summary = engine::execute(
        engine::plan(descriptors, client),
        &ExecuteOptions {
            dry_run,
            yes,
            verbose: ctx.verbose > 0,
            fail_fast: args.fail_fast,
        },
    )?;
    Ok(summary.is_success())
}

pub fn diff_with(ctx: &Context, client: &Rc<Client>, args: &ManifestArgs) -> Result<bool> {
    let descriptors = load(client, args)?;

    if ctx.json {
        let pending: Vec<StatusEntry> = status_entries(client, descriptors)
            .into_iter()
            .filter(|e| e.state != "in-sync")
            .collect();
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(pending.iter().all(|e| e.state != "error"));
    }

    let plan = engine::plan(descriptors, client);
    let (diffs, errors) = compute_diffs(&plan.resources);
    differ::display_diff(&diffs, &errors, ctx.verbose > 0);
    Ok(errors.is_empty())
}

pub fn status_with(ctx: &Context, client: &Rc<Client>, args: &ManifestArgs) -> Result<bool> {
    let entries = status_entries(client, load(client, args)?);
    let healthy = entries.iter().all(|e| e.state != "error");

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(healthy);
    }

    ui::header("CIB Status");
    let mut current_kind = "";
    for entry in &entries {
        if entry.kind != current_kind {
            ui::section(entry.kind);
            current_kind = entry.kind;
        }
        let symbol = match entry.state {
            "in-sync" => "✓".green(),
            "unknown" => "?".dimmed(),
            "error" => "✗".red(),
            _ => "✗".yellow(),
        };
        println!("  {} {:<30} {}", symbol, entry.id, entry.state.dimmed());
        if let Some(detail) = &entry.detail {
            ui::dim(&format!("  {detail}"));
        }
        if ctx.verbose > 0 {
            for step in &entry.steps {
                ui::step_line(step);
            }
        }
    }

    let drifted = entries.iter().filter(|e| e.state != "in-sync").count();
    println!();
    if drifted == 0 {
        ui::success("CIB matches the manifest");
    } else {
        ui::warn(&format!(
            "{drifted} of {} descriptors differ from the CIB",
            entries.len()
        ));
    }
    Ok(healthy)
}

// ============================================================================
// Helpers
// ============================================================================

/// Load, validate and select the manifest's descriptors
fn load(client: &Rc<Client>, args: &ManifestArgs) -> Result<Vec<Descriptor>> {
    let path = paths::expand(&args.manifest);
    let manifest = Manifest::load(&path)?;
    if manifest.is_empty() {
        log::warn!("{} has no descriptors", path.display());
    }

    let mut descriptors = Vec::new();
    let mut invalid = Vec::new();
    for raw in manifest.descriptors() {
        match raw.build() {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) => invalid.push(format!("{}: {}", raw.kind(), e.detailed())),
        }
    }
    if !invalid.is_empty() {
        bail!(
            "Invalid manifest {}:\n  {}",
            path.display(),
            invalid.join("\n  ")
        );
    }

    Ok(select(descriptors, client, args.target.as_deref()))
}

/// Keep descriptors matching `target` ("kind" or "kind.id"), in order
fn select(
    descriptors: Vec<Descriptor>,
    client: &Rc<Client>,
    target: Option<&str>,
) -> Vec<Descriptor> {
    if target.is_none() {
        return descriptors;
    }
    let selected: HashSet<(&'static str, String)> = engine::plan(descriptors.clone(), client)
        .filter_by_target(target)
        .resources
        .iter()
        .map(|r| (r.resource_type(), r.id()))
        .collect();
    descriptors
        .into_iter()
        .filter(|d| selected.contains(&(d.kind(), d.id())))
        .collect()
}

fn invoke_all(client: &Client, descriptors: &[Descriptor], fail_fast: bool) -> ManifestReport {
    let mut results = Vec::new();
    for descriptor in descriptors {
        let result = InvocationResult::from_result(&client.reconcile(descriptor));
        let failed = result.failed;
        results.push(Report {
            kind: descriptor.kind(),
            id: descriptor.id(),
            result,
        });
        if failed && fail_fast {
            break;
        }
    }
    ManifestReport::new(results)
}

fn status_entries(client: &Rc<Client>, descriptors: Vec<Descriptor>) -> Vec<StatusEntry> {
    descriptors
        .into_iter()
        .map(|d| status_entry(&CibResource::new(d, Rc::clone(client))))
        .collect()
}

fn status_entry(resource: &CibResource) -> StatusEntry {
    let descriptor = resource.descriptor();
    let mut entry = StatusEntry {
        kind: descriptor.kind(),
        id: descriptor.id(),
        state: "in-sync",
        steps: Vec::new(),
        detail: None,
    };

    match resource.steps() {
        Ok(steps) if steps.is_empty() => {}
        Ok(steps) => {
            entry.steps = steps.iter().map(ToString::to_string).collect();
            entry.state = match resource.current_state() {
                Ok(ResourceState::Absent) => "missing",
                Ok(ResourceState::Present { .. }) => "to-remove",
                _ => "drifted",
            };
        }
        Err(e) if e.category() == ErrorCategory::NotFound => {
            entry.state = "unknown";
            entry.detail = Some(e.detailed());
        }
        Err(e) => {
            entry.state = "error";
            entry.detail = Some(e.detailed());
        }
    }
    entry
}
