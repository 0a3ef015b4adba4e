use crate::error::{MemoError, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Everything below this line in the editor buffer is discarded.
pub const CUT_LINE: &str = "# ------------------------ >8 ------------------------";

const CUT_HINT: &str = "# Edit the note above. Leave it empty to keep the note unchanged.";

/// Formats a note's content for the editor buffer, followed by the cut line.
pub fn to_buffer(content: &str) -> String {
    let body = content.trim_end();
    if body.is_empty() {
        format!("\n\n{}\n{}\n", CUT_LINE, CUT_HINT)
    } else {
        format!("{}\n\n{}\n{}\n", body, CUT_LINE, CUT_HINT)
    }
}

/// Extracts the note content from an edited buffer.
/// Drops everything from the cut line on and trims surrounding blank lines.
pub fn from_buffer(buffer: &str) -> String {
    let kept = match buffer.lines().position(|line| line.trim_end() == CUT_LINE) {
        Some(cut) => buffer.lines().take(cut).collect::<Vec<_>>().join("\n"),
        None => buffer.to_string(),
    };
    kept.trim_matches(|c| c == '\n' || c == '\r')
        .trim_end()
        .to_string()
}

/// Gets the editor command from environment.
/// Checks $EDITOR, then $VISUAL, then falls back to common editors.
pub fn get_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.trim().is_empty() {
                return Ok(editor);
            }
        }
    }

    for fallback in &["vim", "vi", "nano"] {
        if Command::new("which")
            .arg(fallback)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
        {
            return Ok((*fallback).to_string());
        }
    }

    Err(MemoError::Api(
        "No editor found. Set $EDITOR environment variable.".to_string(),
    ))
}

/// Opens a file in the user's editor and waits for it to close.
/// Returns the contents of the file after editing.
pub fn open_in_editor<P: AsRef<Path>>(file_path: P) -> Result<String> {
    let editor = get_editor()?;
    let path = file_path.as_ref();

    // $EDITOR may carry flags, e.g. "code --wait"
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");

    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| MemoError::Api(format!("Failed to launch editor '{}': {}", editor, e)))?;

    if !status.success() {
        return Err(MemoError::Api(format!(
            "Editor '{}' exited with non-zero status",
            editor
        )));
    }

    Ok(fs::read_to_string(path)?)
}

/// Opens an editor seeded with `initial` and returns the edited note content.
pub fn edit_text(initial: &str) -> Result<String> {
    let temp_file = env::temp_dir().join(format!("memopad_edit_{}.md", uuid::Uuid::new_v4()));
    fs::write(&temp_file, to_buffer(initial))?;

    let result = open_in_editor(&temp_file);

    if let Err(e) = fs::remove_file(&temp_file) {
        tracing::debug!("Could not remove {}: {}", temp_file.display(), e);
    }

    Ok(from_buffer(&result?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_buffer_places_content_above_cut_line() {
        let buffer = to_buffer("Buy milk\n");
        assert!(buffer.starts_with("Buy milk\n\n"));
        assert!(buffer.contains(CUT_LINE));
    }

    #[test]
    fn test_from_buffer_drops_everything_after_cut_line() {
        let buffer = format!("Buy milk\nand eggs\n\n{}\nignored\n", CUT_LINE);
        assert_eq!(from_buffer(&buffer), "Buy milk\nand eggs");
    }

    #[test]
    fn test_from_buffer_without_cut_line_keeps_everything() {
        assert_eq!(from_buffer("\n# heading\nbody\n\n"), "# heading\nbody");
    }

    #[test]
    fn test_from_buffer_of_untouched_empty_buffer_is_empty() {
        assert_eq!(from_buffer(&to_buffer("")), "");
    }

    #[test]
    fn test_buffer_preserves_edited_text() {
        let original = "First line\n\n  indented";
        assert_eq!(from_buffer(&to_buffer(original)), original);
    }
}
