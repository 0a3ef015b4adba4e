//! # Memopad Architecture
//!
//! Memopad is a **UI-agnostic client for a hosted notes table**. Notes live in a
//! remote backend (a PostgREST table behind row-level security, fronted by a
//! GoTrue-style auth service). This crate keeps the client side honest: who is
//! signed in, which notes belong to them, and which note is being edited or is
//! waiting for a delete confirmation.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Owns the session, the note list and the workflow         │
//! │  - Resolves user-facing selectors (1, 2, …) → note ids      │
//! │  - Returns structured `CmdResult` values                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  State Layer                                                │
//! │  - session.rs: mirrors the gateway's auth session           │
//! │  - notes.rs: the signed-in user's note list + mutations     │
//! │  - workflow.rs: editing / confirming-delete state machine   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Gateway Layer (gateway/)                                   │
//! │  - Abstract RemoteGateway trait                             │
//! │  - HttpGateway (production), InMemoryGateway (testing)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session Gating
//!
//! Every data operation takes the current session explicitly. Without one,
//! reads and writes return `Outcome::Skipped(Rejection::NoSession)` before
//! any request is made and the cached list is left as it was. Row ownership is stamped from the session, never from user input.
//!
//! ## Read-After-Write
//!
//! The note list is never patched locally. Each successful create, update or
//! delete is followed by a full refetch, so the list always reflects what the
//! backend holds. If that refetch fails the mutation still counts, and the list
//! is flagged stale until the next successful fetch.
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code never writes to stdout/stderr and never exits the
//! process. Diagnostics go through `tracing`; the binary decides where they end up.
//!
//! ## Testing Strategy
//!
//! 1. **State** (`session.rs`, `notes.rs`, `workflow.rs`): unit tests against
//!    `InMemoryGateway`, which emulates row-level security and records calls.
//! 2. **API** (`api.rs`): end-to-end flows (sign in, create, edit, delete).
//! 3. **CLI** (`tests/`): argument parsing and the commands that need no network.
//!
//! ## Module Overview
//!
//! - [`api`]: facade consumed by UI clients
//! - [`session`]: session tracker
//! - [`notes`]: note collection store
//! - [`workflow`]: edit/delete workflow controller
//! - [`gateway`]: remote backend abstraction
//! - [`listeners`]: subscription registry used for change notifications
//! - [`model`]: core data types
//! - [`config`]: backend endpoint configuration
//! - [`editor`]: `$EDITOR` integration
//! - [`error`]: error types

pub mod api;
pub mod config;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod listeners;
pub mod model;
pub mod notes;
pub mod session;
pub mod workflow;
