// Output formatting: terminal display of cycle reports and roster status.

pub mod terminal;

/// Pluralize a count for summary lines: `plural(1, "clone")` -> "1 clone".
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
