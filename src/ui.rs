use colored::Colorize;
use serde_json::Value;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
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

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a line marked as changed
pub fn changed(marker: &str, msg: &str) {
    println!("{} {}", marker.yellow().bold(), msg);
}

// ============================================================================
// Value Rendering
// ============================================================================

/// Render a field value for display
///
/// Strings holding a JSON or YAML mapping are pretty-printed so that
/// structured fields diff line by line.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => match serde_yaml::from_str::<Value>(text) {
            Ok(parsed @ Value::Object(_)) => {
                serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| text.clone())
            }
            _ => text.clone(),
        },
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Print a field change, as a line diff when either side spans lines
pub fn field_change(field: &str, before: &Value, after: &Value) {
    let old = render_value(before);
    let new = render_value(after);

    if !old.contains('\n') && !new.contains('\n') {
        let old = if old.is_empty() { "(empty)".to_string() } else { old };
        println!(
            "    {}: {} → {}",
            field.dimmed(),
            old.red(),
            new.green()
        );
        return;
    }

    println!("    {}:", field.dimmed());
    let old = with_trailing_newline(old);
    let new = with_trailing_newline(new);
    let diff = similar::TextDiff::from_lines(&old, &new);
    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => print!("      {}", format!("- {change}").red()),
            similar::ChangeTag::Insert => print!("      {}", format!("+ {change}").green()),
            similar::ChangeTag::Equal => print!("      {}", format!("  {change}").dimmed()),
        }
    }
}

fn with_trailing_newline(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

// ============================================================================
// Tests
// ============================================================================
