// Output formatting: terminal display helpers.

pub mod terminal;

use chrono::NaiveDateTime;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing (`&text[..120]`), this respects UTF-8 character boundaries
/// and will never panic on multi-byte characters like emoji or accented letters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Human-readable age of `then` relative to `now`, e.g. "3 hours ago".
pub fn relative_time(then: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    let Some(then) = then else {
        return "Unknown time".to_string();
    };

    let diff = now - then;
    let days = diff.num_days();
    let seconds = diff.num_seconds();

    if days > 365 {
        format!("{} years ago", days / 365)
    } else if days > 30 {
        format!("{} months ago", days / 30)
    } else if days > 0 {
        format!("{days} days ago")
    } else if seconds > 3600 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds > 60 {
        format!("{} minutes ago", seconds / 60)
    } else {
        "just now".to_string()
    }
}
