use crate::models::NoteRecord;

pub const WELCOME: &str =
    "\u{1f44b} Welcome to the Telegram \u{2192} Memos relay! Send any message to save it to your Memos.";
pub const SAVED: &str = "\u{2705} Saved to Memos!";
pub const NO_NOTES: &str = "No notes yet";
pub const HEALTH: &str = "\u{2705} memos-relay is running";

pub const RECENT_NOTES_LIMIT: usize = 5;

/// Telegram caps messages at 4096 characters; stay under it in bytes.
const MAX_MESSAGE_CHARS: usize = 4000;

pub fn format_recent_notes(notes: &[NoteRecord]) -> String {
    let latest = notes
        .iter()
        .take(RECENT_NOTES_LIMIT)
        .map(|note| format!("\u{1f4dd} {}", note.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let body = if latest.is_empty() {
        NO_NOTES.to_string()
    } else {
        latest
    };

    truncate(
        &format!("Latest {RECENT_NOTES_LIMIT} notes:\n\n{body}"),
        MAX_MESSAGE_CHARS,
    )
}

pub fn format_list_failed(error: &str) -> String {
    truncate(
        &format!("\u{26a0}\u{fe0f} Failed to fetch Memos list: {error}"),
        MAX_MESSAGE_CHARS,
    )
}

pub fn format_save_failed(detail: &str) -> String {
    truncate(
        &format!("\u{274c} Save failed: {detail}"),
        MAX_MESSAGE_CHARS,
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let boundary = s.floor_char_boundary(max);
        format!("{}... (truncated)", &s[..boundary])
    }
}
