use colored::{ColoredString, Colorize};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Change Symbols
// ============================================================================

/// Marker for a CIB step, keyed on the step's leading verb
pub fn step_symbol(step: &str) -> ColoredString {
    match step.split_whitespace().next() {
        Some("create") => "+".green(),
        Some("delete") => "-".red(),
        Some("replace" | "modify") => "~".yellow(),
        _ => "·".dimmed(),
    }
}

/// Print one planned or applied step, indented under its descriptor
pub fn step_line(step: &str) {
    println!("    {} {}", step_symbol(step), step);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_symbol_by_verb() {
        colored::control::set_override(false);
        assert_eq!(step_symbol("create primitive 'vip' in resources").to_string(), "+");
        assert_eq!(step_symbol("delete rsc_location 'loc' in constraints").to_string(), "-");
        assert_eq!(step_symbol("replace primitive 'vip' in resources").to_string(), "~");
        assert_eq!(step_symbol("").to_string(), "·");
    }
}
