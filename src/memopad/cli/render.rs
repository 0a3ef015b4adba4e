use chrono::{DateTime, Utc};
use colored::Colorize;
use memopad::api::{CmdMessage, MessageLevel};
use memopad::model::Note;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

pub(super) fn print_notes(notes: &[Note]) {
    print!("{}", render_notes(notes, Utc::now()));
}

/// One line per note: position, single-line preview, age.
pub(super) fn render_notes(notes: &[Note], now: DateTime<Utc>) -> String {
    if notes.is_empty() {
        return "No notes yet.\n".to_string();
    }

    let mut out = String::new();
    for (i, note) in notes.iter().enumerate() {
        let left_prefix = "  ";
        let idx_str = format!("{}. ", i + 1);

        let preview: String = note
            .content
            .trim()
            .chars()
            .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
            .collect();

        let time_ago = note
            .created_at
            .map(|ts| format_time_ago(ts, now))
            .unwrap_or_else(|| " ".repeat(TIME_WIDTH));

        let fixed_width = left_prefix.width() + idx_str.width() + TIME_WIDTH + 1;
        let available = LINE_WIDTH.saturating_sub(fixed_width);
        let preview = truncate_to_width(&preview, available);
        let padding = available.saturating_sub(preview.width());

        out.push_str(&format!(
            "{}{}{}{} {}\n",
            left_prefix,
            idx_str.yellow(),
            preview,
            " ".repeat(padding),
            time_ago.dimmed()
        ));
    }
    out
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use memopad::model::NoteId;

    fn note(id: &str, content: &str, created_at: Option<DateTime<Utc>>) -> Note {
        Note {
            id: NoteId::new(id),
            owner_id: "u1".to_string(),
            content: content.to_string(),
            created_at,
        }
    }

    #[test]
    fn test_truncate_short_string_untouched() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_marks_cut_with_ellipsis() {
        let cut = truncate_to_width("hello world", 6);
        assert_eq!(cut, "hello…");
        assert!(cut.width() <= 6);
    }

    #[test]
    fn test_truncate_respects_wide_chars() {
        let cut = truncate_to_width("日本語のメモです", 7);
        assert!(cut.width() <= 7);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_empty_list_message() {
        assert_eq!(render_notes(&[], Utc::now()), "No notes yet.\n");
    }

    #[test]
    fn test_notes_are_numbered_and_flattened() {
        colored::control::set_override(false);
        let now = Utc::now();
        let notes = vec![
            note("10", "first\nsecond line", Some(now - Duration::hours(2))),
            note("11", "other", None),
        ];

        let out = render_notes(&notes, now);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  1. first second line"));
        assert!(lines[0].contains("2 hours ago"));
        assert!(lines[1].starts_with("  2. other"));
    }

    #[test]
    fn test_long_note_fits_line_width() {
        colored::control::set_override(false);
        let long = "x".repeat(300);
        let out = render_notes(&[note("1", &long, None)], Utc::now());
        assert_eq!(out.trim_end_matches('\n').width(), LINE_WIDTH);
    }
}
