//! Execution engine - cibform executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, ConfirmCallback, ExecuteSummary, ExecutionPlan, ProgressCallback, compute_diffs,
};

use super::differ::display_diff;

/// Options for execution (includes `yes` for confirmation skip)
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
    /// Stop at the first failed descriptor
    pub fail_fast: bool,
}

/// Show the diff, confirm, then reconcile every descriptor in order
pub fn execute(plan: ExecutionPlan, opts: &ExecuteOptions) -> Result<ExecuteSummary> {
    let (diffs, errors) = compute_diffs(&plan.resources);
    display_diff(&diffs, &errors, opts.verbose);

    if diffs.is_empty() && errors.is_empty() {
        return Ok(ExecuteSummary {
            no_change: plan.total_resources(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        println!();
        println!("  {} Check mode - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    println!();
    println!(
        "  {} Reconciling {} descriptors...",
        "→".cyan(),
        plan.total_resources()
    );

    let summary = declarative::execute(
        plan,
        declarative::ExecuteOptions {
            dry_run: false,
            verbose: opts.verbose,
            fail_fast: opts.fail_fast,
        },
        &mut TerminalProgress,
        &mut Prompt { yes: opts.yes },
    )?;

    print_summary(&summary);
    Ok(summary)
}

/// One line per descriptor as it completes
struct TerminalProgress;

impl ProgressCallback for TerminalProgress {
    fn on_batch_start(&mut self, _count: usize) {}

    fn on_resource_start(&mut self, id: &str, description: &str) {
        log::debug!("reconciling {id}: {description}");
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let (symbol, note) = match result {
            ApplyResult::NoChange => ("○".dimmed(), "up to date".to_string()),
            ApplyResult::Created => ("✓".green(), "created".to_string()),
            ApplyResult::Modified => ("✓".green(), "modified".to_string()),
            ApplyResult::Removed => ("✓".green(), "removed".to_string()),
            ApplyResult::Failed { error } => ("✗".red(), error.clone()),
            ApplyResult::Skipped { reason } => ("⊘".yellow(), reason.clone()),
        };
        println!("    {symbol} {id} {}", note.dimmed());
    }

    fn on_batch_complete(&mut self) {}
}

/// Confirm with user, unless `--yes`
struct Prompt {
    yes: bool,
}

impl ConfirmCallback for Prompt {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }

        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        if !confirmed {
            println!();
            println!("  {} Aborted", "✗".red());
        }
        Ok(confirmed)
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} CIB reconciled successfully!", "✓".green().bold());
    } else {
        println!("  {} CIB reconciled with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} descriptors created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} descriptors modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} descriptors removed", summary.removed);
    }
    if summary.no_change > 0 {
        println!("    • {} descriptors already up to date", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} descriptors skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "descriptors".red());
        for error in &summary.errors {
            println!("      {} {}", "✗".red(), error);
        }
    }
}
