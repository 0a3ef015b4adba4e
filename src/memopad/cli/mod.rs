//! # CLI Behavior
//!
//! This is **one possible UI client** for memopad, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes, and output formatting.
//!
//! For the overall architecture, see the crate-level documentation of the library.
//!
//! ### Naked Execution (`memopad`)
//!
//! Running `memopad` with no arguments defaults to `memopad list`.
//!
//! ### Adding (`memopad add`)
//!
//! 1. **Arguments**: `memopad add buy milk` joins the words into one note.
//! 2. **Piped Input**: `echo "buy milk" | memopad add` uses stdin when no words are given.
//!
//! ### Editing (`memopad edit 2`)
//!
//! With replacement text on the command line the note is updated directly.
//! Without it `$EDITOR` opens on the note's current content. Saving an empty
//! buffer leaves the note alone.
//!
//! ### Deleting (`memopad delete 2`)
//!
//! Asks for confirmation (`[y/N]`) unless `--yes` is given. Anything but `y`
//! cancels and nothing is sent to the backend.
//!
//! ### Notes are addressed by position
//!
//! `1` is the first note in `memopad list`. A raw note id works too.
//!
//! ## Module Structure
//!
//! - `commands`: Per-command handlers that call API and format output
//! - `render`: Output formatting (note list, colored messages)
//! - `setup`: Argument parsing via clap

mod commands;
mod render;
pub mod setup;

pub use commands::run;
