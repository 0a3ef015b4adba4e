//! # Remote Store Gateway
//!
//! This module defines the boundary to the remote backend: an identity service
//! plus an owner-scoped row store. The [`RemoteGateway`] trait is the only way
//! the rest of the crate talks to the network.
//!
//! ## Design Rationale
//!
//! The gateway is abstracted behind a trait and injected into the components
//! that need it (never held in a global) so that:
//! - **tests** run against [`memory::InMemoryGateway`] with no network
//! - the backend can change without touching session or note logic
//!
//! ## Implementations
//!
//! - [`http::HttpGateway`]: REST client for a Supabase-compatible backend.
//!   Persists the session to disk so the next process restores it.
//! - [`memory::InMemoryGateway`]: in-process fake for testing
//!   - Emulates owner-scoped access control
//!   - Records every call and can be told to fail specific operations
//!
//! ## Result Semantics
//!
//! Every operation either succeeds or returns an error. Callers treat any
//! error as failure and its absence as success. Update and delete that match
//! zero rows are successes.
//!
//! ## Session Notifications
//!
//! Auth changes are pushed through [`RemoteGateway::auth_on_change`]. The
//! gateway announces sign in, sign out, token refresh and external expiry.
//! The auth calls themselves report only success or failure; the new session
//! value arrives through the listener.

use crate::error::Result;
use crate::listeners::Subscription;
use crate::model::{NewNote, Note, NoteId, NotePatch, Session};
use async_trait::async_trait;

pub mod http;
pub mod memory;

/// Callback receiving the gateway's current session after every auth change.
pub type SessionListener = Box<dyn Fn(&Option<Session>) + Send + Sync>;

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Current session as known to the gateway (restored or refreshed).
    async fn auth_get_session(&self) -> Result<Option<Session>>;

    /// Registers a listener for auth changes.
    fn auth_on_change(&self, listener: SessionListener) -> Subscription;

    async fn auth_sign_up(&self, email: &str, password: &str) -> Result<()>;

    async fn auth_sign_in(&self, email: &str, password: &str) -> Result<()>;

    async fn auth_sign_out(&self) -> Result<()>;

    /// All rows of `table` owned by `owner_id`, in store order.
    async fn select_all(&self, table: &str, owner_id: &str) -> Result<Vec<Note>>;

    async fn insert(&self, table: &str, row: &NewNote) -> Result<()>;

    async fn update_by_id(&self, table: &str, id: &NoteId, patch: &NotePatch) -> Result<()>;

    async fn delete_by_id(&self, table: &str, id: &NoteId) -> Result<()>;
}
