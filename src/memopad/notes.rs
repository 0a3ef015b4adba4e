//! # Note Collection Store
//!
//! Holds the signed-in user's notes as last fetched from the gateway and
//! performs the create/update/delete mutations.
//!
//! ## Cache Policy
//!
//! The cache is authoritative only when it came from a fetch. It is never
//! patched in place: after every successful mutation the whole list is
//! fetched again, and a failed fetch leaves the previous list untouched but
//! flags it stale until the next good fetch. A mutation that succeeded but
//! whose refresh failed is still reported as applied.
//!
//! ## Gating
//!
//! Operations take the acting session as `Option<&Session>`. Without a
//! session, or with blank content or a missing id, an operation returns
//! [`Outcome::Skipped`] without contacting the gateway and without changing
//! any state. Skips are not errors.
//!
//! Update and delete that match zero rows (the note is already gone, or was
//! never ours) succeed; the gateway gives no way to tell the cases apart.

use crate::error::Result;
use crate::gateway::RemoteGateway;
use crate::model::{is_blank, NewNote, Note, NoteId, NotePatch, Session};
use std::sync::Arc;

/// Why an operation was skipped before reaching the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoSession,
    EmptyContent,
    MissingId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

pub struct NoteCollection<G: RemoteGateway> {
    gateway: Arc<G>,
    table: String,
    notes: Vec<Note>,
    loading: bool,
    stale: bool,
}

impl<G: RemoteGateway> NoteCollection<G> {
    pub fn new(gateway: Arc<G>, table: impl Into<String>) -> Self {
        Self {
            gateway,
            table: table.into(),
            notes: Vec::new(),
            loading: false,
            stale: false,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True when the last fetch failed, so the list may not match the store.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| &n.id == id)
    }

    /// Finds a note by 1-based list position, falling back to its literal id.
    pub fn resolve(&self, selector: &str) -> Option<&Note> {
        let selector = selector.trim();
        selector
            .parse::<usize>()
            .ok()
            .and_then(|pos| pos.checked_sub(1))
            .and_then(|idx| self.notes.get(idx))
            .or_else(|| self.notes.iter().find(|n| n.id.as_str() == selector))
    }

    /// Drops the cached list wholesale (used when the session goes away).
    pub fn reset(&mut self) {
        self.notes = Vec::new();
        self.stale = false;
    }

    pub async fn fetch_all(&mut self, session: Option<&Session>) -> Result<Outcome> {
        let Some(session) = session else {
            return Ok(Outcome::Skipped(Rejection::NoSession));
        };

        self.loading = true;
        let fetched = self.gateway.select_all(&self.table, &session.user_id).await;
        self.loading = false;

        match fetched {
            Ok(notes) => {
                tracing::debug!("Fetched {} notes", notes.len());
                self.notes = notes;
                self.stale = false;
                Ok(Outcome::Applied)
            }
            Err(e) => {
                tracing::error!("Fetching notes failed: {}", e);
                self.stale = true;
                Err(e.into_store())
            }
        }
    }

    pub async fn create(&mut self, content: &str, session: Option<&Session>) -> Result<Outcome> {
        let Some(session) = session else {
            return Ok(Outcome::Skipped(Rejection::NoSession));
        };
        if is_blank(content) {
            return Ok(Outcome::Skipped(Rejection::EmptyContent));
        }

        let row = NewNote::new(content, session);
        self.loading = true;
        let inserted = self.gateway.insert(&self.table, &row).await;
        self.loading = false;

        if let Err(e) = inserted {
            tracing::error!("Creating note failed: {}", e);
            return Err(e.into_store());
        }
        self.refresh_after("create", session).await;
        Ok(Outcome::Applied)
    }

    pub async fn update(
        &mut self,
        id: Option<&NoteId>,
        content: &str,
        session: Option<&Session>,
    ) -> Result<Outcome> {
        let Some(session) = session else {
            return Ok(Outcome::Skipped(Rejection::NoSession));
        };
        let Some(id) = id else {
            return Ok(Outcome::Skipped(Rejection::MissingId));
        };
        if is_blank(content) {
            return Ok(Outcome::Skipped(Rejection::EmptyContent));
        }

        let patch = NotePatch {
            content: content.to_string(),
        };
        self.loading = true;
        let updated = self.gateway.update_by_id(&self.table, id, &patch).await;
        self.loading = false;

        if let Err(e) = updated {
            tracing::error!("Updating note {} failed: {}", id, e);
            return Err(e.into_store());
        }
        self.refresh_after("update", session).await;
        Ok(Outcome::Applied)
    }

    pub async fn delete(
        &mut self,
        id: Option<&NoteId>,
        session: Option<&Session>,
    ) -> Result<Outcome> {
        let Some(session) = session else {
            return Ok(Outcome::Skipped(Rejection::NoSession));
        };
        let Some(id) = id else {
            return Ok(Outcome::Skipped(Rejection::MissingId));
        };

        self.loading = true;
        let deleted = self.gateway.delete_by_id(&self.table, id).await;
        self.loading = false;

        if let Err(e) = deleted {
            tracing::error!("Deleting note {} failed: {}", id, e);
            return Err(e.into_store());
        }
        self.refresh_after("delete", session).await;
        Ok(Outcome::Applied)
    }

    async fn refresh_after(&mut self, action: &str, session: &Session) {
        if let Err(e) = self.fetch_all(Some(session)).await {
            tracing::warn!("Refresh after {} failed, list may be outdated: {}", action, e);
        }
    }
}
