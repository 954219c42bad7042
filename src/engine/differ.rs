//! Diff display for CIB descriptors

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState, group_by_type};
use similar::{ChangeTag, TextDiff};

/// Display a list of diffs grouped by descriptor kind
///
/// `errors` are descriptors whose current state could not be read.
/// With `verbose`, modifications show a line diff of the XML.
pub fn display_diff(diffs: &[ResourceDiff], errors: &[String], verbose: bool) {
    if diffs.is_empty() && errors.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "CIB Diff".bold()
    );
    println!("│");

    for (kind, kind_diffs) in group_by_type(diffs) {
        println!("│ {}", kind_title(&kind).bold());

        for diff in kind_diffs {
            println!(
                "│   {} {:<30} {}",
                symbol(diff),
                diff.resource_id,
                state_description(diff).dimmed()
            );
            if verbose && let ResourceState::Modified { from, to } = &diff.current {
                for line in xml_diff(from, to) {
                    println!("│       {line}");
                }
            }
        }
        println!("│");
    }

    if !errors.is_empty() {
        println!("│ {}", "Unreadable".red().bold());
        for error in errors {
            println!("│   {} {}", "✗".red(), error);
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to create, {} to modify, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn kind_title(kind: &str) -> &str {
    match kind {
        "primitive" => "Primitives",
        "group" => "Groups",
        "location" => "Location constraints",
        "colocation" => "Colocation constraints",
        "order" => "Order constraints",
        "order_set" => "Order sets",
        "property" => "Cluster properties",
        "resource_defaults" => "Resource defaults",
        _ => kind,
    }
}

fn symbol(diff: &ResourceDiff) -> colored::ColoredString {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { .. }) => "+".green(),
        (ResourceState::Present { .. }, ResourceState::Absent) => "-".red(),
        (ResourceState::Modified { .. }, _) => "~".yellow(),
        _ => "?".dimmed(),
    }
}

fn state_description(diff: &ResourceDiff) -> String {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => format!(
            "(new){}",
            details
                .as_ref()
                .map(|d| format!(" → {d}"))
                .unwrap_or_default()
        ),
        (ResourceState::Present { details }, ResourceState::Absent) => {
            details.clone().unwrap_or_else(|| "(will remove)".to_string())
        }
        (ResourceState::Modified { .. }, _) => diff.description.clone(),
        (ResourceState::Unknown, _) => "(depends on an earlier descriptor)".to_string(),
        _ => String::new(),
    }
}

/// Changed lines between two XML renderings, with +/- markers
fn xml_diff(from: &str, to: &str) -> Vec<String> {
    TextDiff::from_lines(from, to)
        .iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end();
            match change.tag() {
                ChangeTag::Delete => Some(format!("{}", format!("- {line}").red())),
                ChangeTag::Insert => Some(format!("{}", format!("+ {line}").green())),
                ChangeTag::Equal => None,
            }
        })
        .collect()
}
