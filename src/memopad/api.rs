//! # API Facade
//!
//! The API layer is the single entry point for any UI. It owns the three core
//! components and exposes read accessors plus action entry points.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Gates** every note action on the session held by the [`SessionTracker`]
//! - **Dispatches** to the [`NoteCollection`] and the [`Workflow`]
//! - **Reconciles** note state with the session ([`MemoApi::sync_session`])
//! - **Returns structured types** (`Result<CmdResult>`) with user-facing
//!   messages, never printed text
//!
//! ## What the API Does NOT Do
//!
//! - **I/O**: no stdout, stderr or prompts. Confirming a delete is an explicit
//!   call ([`MemoApi::confirm_delete`]) made by the UI once the user agreed.
//! - **Business rules**: validation and cache policy live in `notes.rs`, the
//!   state machine in `workflow.rs`.
//!
//! ## Generic Over RemoteGateway
//!
//! `MemoApi<G: RemoteGateway>`:
//! - Production: `MemoApi<HttpGateway>`
//! - Testing: `MemoApi<InMemoryGateway>`
//!
//! ## Session Reconciliation
//!
//! Session changes arrive as notifications, but fetching is asynchronous, so
//! the facade does not fetch from inside a listener. Instead every auth action
//! ends with [`MemoApi::sync_session`], and a UI that reacts to
//! [`MemoApi::subscribe`] notifications calls it too. A new owner gets a fresh
//! fetch; losing the session clears the list and the workflow. A fetch that
//! failed is retried by the next sync. An auth action whose follow-up fetch
//! fails still succeeds and carries an error message instead.

use crate::error::{MemoError, Result};
use crate::gateway::RemoteGateway;
use crate::listeners::Subscription;
use crate::model::{Note, NoteId, Session};
use crate::notes::NoteCollection;
use crate::session::SessionTracker;
use crate::workflow::{Workflow, WorkflowState};
use std::sync::Arc;

pub struct MemoApi<G: RemoteGateway> {
    session: SessionTracker<G>,
    notes: NoteCollection<G>,
    workflow: Workflow,
    /// Owner the notes and workflow currently belong to.
    owner: Option<String>,
    /// Set until the owner's notes have been fetched successfully.
    needs_fetch: bool,
}

impl<G: RemoteGateway> MemoApi<G> {
    /// Starts session tracking. Call [`Self::sync_session`] afterwards to
    /// load the notes of a restored session.
    pub async fn start(gateway: Arc<G>, table: impl Into<String>) -> Self {
        let session = SessionTracker::start(Arc::clone(&gateway)).await;
        Self {
            session,
            notes: NoteCollection::new(gateway, table),
            workflow: Workflow::new(),
            owner: None,
            needs_fetch: false,
        }
    }

    // --- Read accessors ---

    pub fn session(&self) -> Option<Session> {
        self.session.current_session()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_signed_in()
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.notes()
    }

    pub fn is_loading(&self) -> bool {
        self.notes.is_loading()
    }

    pub fn is_stale(&self) -> bool {
        self.notes.is_stale()
    }

    pub fn workflow_state(&self) -> WorkflowState {
        self.workflow.state()
    }

    pub fn draft(&self) -> &str {
        self.workflow.draft()
    }

    pub fn delete_confirmation_visible(&self) -> bool {
        self.workflow.is_confirming_delete()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Option<Session>) + Send + Sync + 'static,
    {
        self.session.subscribe(listener)
    }

    // --- Session actions ---

    pub async fn login(&mut self, email: &str, password: &str) -> Result<CmdResult> {
        self.session.sign_in(email, password).await?;
        let mut result = self.sync_after_auth().await;
        if self.has_session() {
            result.add_message(CmdMessage::success(format!("Logged in as {}", email.trim())));
        }
        Ok(result)
    }

    pub async fn signup(&mut self, email: &str, password: &str) -> Result<CmdResult> {
        self.session.sign_up(email, password).await?;
        let mut result = self.sync_after_auth().await;
        if self.has_session() {
            result.add_message(CmdMessage::success(format!(
                "Account created, logged in as {}",
                email.trim()
            )));
        } else {
            result.add_message(CmdMessage::info(
                "Account created. Confirm your email address, then log in.",
            ));
        }
        Ok(result)
    }

    pub async fn logout(&mut self) -> Result<CmdResult> {
        self.session.sign_out().await?;
        let mut result = self.sync_after_auth().await;
        result.add_message(CmdMessage::success("Logged out"));
        Ok(result)
    }

    /// Brings notes and workflow in line with the tracker's session.
    ///
    /// A new owner resets both and fetches. A fetch that failed is retried
    /// on the next call; until then the list reports itself stale.
    pub async fn sync_session(&mut self) -> Result<CmdResult> {
        let current = self.session.current_session();
        self.adopt_owner(current.as_ref());
        match current {
            Some(session) if self.needs_fetch => self.load(&session).await,
            _ => Ok(CmdResult::default()),
        }
    }

    /// An auth call already succeeded, so a failed fetch is reported as a
    /// message instead of failing the whole action.
    async fn sync_after_auth(&mut self) -> CmdResult {
        match self.sync_session().await {
            Ok(result) => result,
            Err(e) => {
                let mut result = CmdResult::default();
                result.add_message(CmdMessage::error(format!(
                    "Could not load your notes: {}",
                    e
                )));
                result
            }
        }
    }

    fn adopt_owner(&mut self, current: Option<&Session>) {
        let owner = current.map(|s| s.user_id.clone());
        if owner != self.owner {
            self.workflow.reset();
            self.notes.reset();
            self.needs_fetch = owner.is_some();
            self.owner = owner;
        }
    }

    async fn load(&mut self, session: &Session) -> Result<CmdResult> {
        let outcome = self.notes.fetch_all(Some(session)).await?;
        self.needs_fetch = false;
        Ok(CmdResult::with_outcome(outcome))
    }

    // --- Note actions ---

    pub async fn refresh(&mut self) -> Result<CmdResult> {
        let current = self.session.current_session();
        self.adopt_owner(current.as_ref());
        match current {
            Some(session) => self.load(&session).await,
            None => Ok(CmdResult::with_outcome(Outcome::Skipped(
                Rejection::NoSession,
            ))),
        }
    }

    /// Looks a note up by list position (1-based) or id.
    pub fn resolve_note(&self, selector: &str) -> Result<NoteId> {
        self.notes
            .resolve(selector)
            .map(|n| n.id.clone())
            .ok_or_else(|| MemoError::Api(format!("Note {} not found", selector.trim())))
    }

    pub fn begin_edit(&mut self, id: &NoteId) -> bool {
        self.workflow.begin_edit(&self.notes, id)
    }

    pub fn cancel_edit(&mut self) {
        self.workflow.cancel_edit();
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.workflow.set_draft(text);
    }

    /// Creates or updates depending on whether an edit is in progress.
    pub async fn submit(&mut self) -> Result<CmdResult> {
        let session = self.session.current_session();
        let verb = if self.workflow.edit_target().is_some() {
            "updated"
        } else {
            "created"
        };
        let outcome = self
            .workflow
            .submit(&mut self.notes, session.as_ref())
            .await?;

        let mut result = CmdResult::with_outcome(outcome);
        if outcome.is_applied() {
            result.add_message(CmdMessage::success(format!("Note {}", verb)));
            self.warn_if_stale(&mut result);
        }
        Ok(result)
    }

    /// Opens the delete confirmation for `id`. Nothing is deleted yet.
    pub fn request_delete(&mut self, id: NoteId) {
        self.workflow.request_delete(id);
    }

    pub async fn confirm_delete(&mut self) -> Result<CmdResult> {
        let session = self.session.current_session();
        let outcome = self
            .workflow
            .confirm_delete(&mut self.notes, session.as_ref())
            .await?;

        let mut result = CmdResult::with_outcome(outcome);
        if outcome.is_applied() {
            result.add_message(CmdMessage::success("Note deleted"));
            self.warn_if_stale(&mut result);
        }
        Ok(result)
    }

    pub fn cancel_delete(&mut self) -> CmdResult {
        let mut result = CmdResult::default();
        if self.workflow.cancel_delete() {
            result.add_message(CmdMessage::info("Delete cancelled"));
        }
        result
    }

    fn warn_if_stale(&self, result: &mut CmdResult) {
        if self.notes.is_stale() {
            result.add_message(CmdMessage::warning(
                "Saved, but the note list could not be refreshed",
            ));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// What an action did, plus messages for the user.
#[derive(Debug, Clone)]
pub struct CmdResult {
    pub outcome: Outcome,
    pub messages: Vec<CmdMessage>,
}

impl Default for CmdResult {
    fn default() -> Self {
        Self::with_outcome(Outcome::Applied)
    }
}

impl CmdResult {
    pub fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            messages: Vec::new(),
        }
    }

    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }
}

pub use crate::notes::{Outcome, Rejection};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{FailOn, GatewayCall, InMemoryGateway};

    const TABLE: &str = "memos";
    const EMAIL: &str = "a@b.c";
    const PASSWORD: &str = "secret123";

    async fn signed_in_api(seed: &[&str]) -> (Arc<InMemoryGateway>, MemoApi<InMemoryGateway>) {
        let gateway = Arc::new(InMemoryGateway::new().with_signed_in(EMAIL, PASSWORD));
        let owner = gateway.session().unwrap().user_id;
        for content in seed {
            gateway.seed_note(TABLE, &owner, content);
        }
        let mut api = MemoApi::start(Arc::clone(&gateway), TABLE).await;
        api.sync_session().await.unwrap();
        gateway.clear_calls();
        (gateway, api)
    }

    fn contents(api: &MemoApi<InMemoryGateway>) -> Vec<&str> {
        api.notes().iter().map(|n| n.content.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_without_session_is_gated() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut api = MemoApi::start(Arc::clone(&gateway), TABLE).await;
        api.sync_session().await.unwrap();
        gateway.clear_calls();

        api.set_draft("hello");
        let result = api.submit().await.unwrap();

        assert_eq!(result.outcome, Outcome::Skipped(Rejection::NoSession));
        assert!(result.messages.is_empty());
        assert!(gateway.calls().is_empty());
        assert!(api.notes().is_empty());
        assert_eq!(api.draft(), "hello");
    }

    #[tokio::test]
    async fn test_create_with_session_shows_the_new_note() {
        let (gateway, mut api) = signed_in_api(&[]).await;

        api.set_draft("hello");
        let result = api.submit().await.unwrap();

        assert_eq!(result.outcome, Outcome::Applied);
        assert_eq!(result.messages[0].content, "Note created");
        assert_eq!(contents(&api), vec!["hello"]);
        assert_eq!(gateway.rows(TABLE)[0].id, api.notes()[0].id);
    }

    #[tokio::test]
    async fn test_edit_flow_updates_and_returns_to_idle() {
        let (gateway, mut api) = signed_in_api(&["a"]).await;
        let id = api.resolve_note("1").unwrap();

        assert!(api.begin_edit(&id));
        assert_eq!(api.draft(), "a");
        api.set_draft("b");
        let result = api.submit().await.unwrap();

        assert_eq!(result.messages[0].content, "Note updated");
        assert!(gateway
            .mutation_calls()
            .iter()
            .all(|c| matches!(c, GatewayCall::UpdateById { .. })));
        assert_eq!(contents(&api), vec!["b"]);
        assert_eq!(api.notes()[0].id, id);
        assert_eq!(api.workflow_state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_delete_keeps_everything() {
        let (gateway, mut api) = signed_in_api(&["a"]).await;
        let id = api.resolve_note("1").unwrap();

        api.request_delete(id.clone());
        assert!(api.delete_confirmation_visible());
        assert_eq!(api.workflow_state(), WorkflowState::ConfirmingDelete(id));
        assert_eq!(contents(&api), vec!["a"]);

        let result = api.cancel_delete();
        assert_eq!(result.messages[0].content, "Delete cancelled");
        assert_eq!(api.workflow_state(), WorkflowState::Idle);
        assert_eq!(contents(&api), vec!["a"]);
        assert!(gateway.mutation_calls().is_empty());
    }

    #[tokio::test]
    async fn test_confirmed_delete_removes_the_note() {
        let (gateway, mut api) = signed_in_api(&["a"]).await;
        let id = api.resolve_note("1").unwrap();

        api.request_delete(id.clone());
        let result = api.confirm_delete().await.unwrap();

        assert_eq!(result.messages[0].content, "Note deleted");
        assert_eq!(
            gateway.mutation_calls(),
            vec![GatewayCall::DeleteById {
                table: TABLE.to_string(),
                id: id.clone(),
            }]
        );
        assert!(api.notes().iter().all(|n| n.id != id));
        assert_eq!(api.workflow_state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn test_login_fetches_and_logout_clears() {
        let gateway = Arc::new(InMemoryGateway::new());
        let owner = gateway.add_account(EMAIL, PASSWORD);
        gateway.seed_note(TABLE, &owner, "mine");
        let mut api = MemoApi::start(Arc::clone(&gateway), TABLE).await;
        api.sync_session().await.unwrap();
        assert!(!api.has_session());

        let result = api.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(result.messages[0].content, "Logged in as a@b.c");
        assert_eq!(contents(&api), vec!["mine"]);

        let id = api.resolve_note("1").unwrap();
        api.begin_edit(&id);
        api.logout().await.unwrap();
        assert!(!api.has_session());
        assert!(api.notes().is_empty());
        assert_eq!(api.workflow_state(), WorkflowState::Idle);
        assert_eq!(api.draft(), "");
    }

    #[tokio::test]
    async fn test_login_survives_a_failed_fetch_and_recovers() {
        let gateway = Arc::new(InMemoryGateway::new());
        let owner = gateway.add_account(EMAIL, PASSWORD);
        gateway.seed_note(TABLE, &owner, "mine");
        let mut api = MemoApi::start(Arc::clone(&gateway), TABLE).await;
        gateway.set_failing(FailOn::Select, true);

        let result = api.login(EMAIL, PASSWORD).await.unwrap();
        assert!(api.has_session());
        assert!(result
            .messages
            .iter()
            .any(|m| m.level == MessageLevel::Error));
        assert!(result
            .messages
            .iter()
            .any(|m| m.content == "Logged in as a@b.c"));
        assert!(api.notes().is_empty());
        assert!(api.is_stale());

        gateway.set_failing(FailOn::Select, false);
        api.sync_session().await.unwrap();
        assert_eq!(contents(&api), vec!["mine"]);
        assert!(!api.is_stale());
    }

    #[tokio::test]
    async fn test_failed_sync_is_retried() {
        let gateway = Arc::new(InMemoryGateway::new().with_signed_in(EMAIL, PASSWORD));
        let owner = gateway.session().unwrap().user_id;
        gateway.seed_note(TABLE, &owner, "a");
        let mut api = MemoApi::start(Arc::clone(&gateway), TABLE).await;

        gateway.set_failing(FailOn::Select, true);
        assert!(matches!(
            api.sync_session().await,
            Err(MemoError::Store(_))
        ));
        assert!(api.is_stale());

        gateway.set_failing(FailOn::Select, false);
        api.sync_session().await.unwrap();
        assert_eq!(contents(&api), vec!["a"]);

        gateway.clear_calls();
        api.sync_session().await.unwrap();
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_login_changes_nothing() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.add_account(EMAIL, PASSWORD);
        let mut api = MemoApi::start(Arc::clone(&gateway), TABLE).await;

        let err = api.login(EMAIL, "wrong").await.unwrap_err();
        assert!(matches!(err, MemoError::Auth(_)));
        assert!(!api.has_session());
    }

    #[tokio::test]
    async fn test_signup_logs_in() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut api = MemoApi::start(Arc::clone(&gateway), TABLE).await;

        let result = api.signup("new@b.c", PASSWORD).await.unwrap();
        assert!(api.has_session());
        assert_eq!(
            result.messages[0].content,
            "Account created, logged in as new@b.c"
        );
    }

    #[tokio::test]
    async fn test_external_expiry_is_reconciled() {
        let (gateway, mut api) = signed_in_api(&["a"]).await;
        gateway.expire_session();

        assert!(!api.has_session());
        api.sync_session().await.unwrap();
        assert!(api.notes().is_empty());
    }

    #[tokio::test]
    async fn test_sync_is_idempotent_for_the_same_owner() {
        let (gateway, mut api) = signed_in_api(&["a"]).await;
        api.sync_session().await.unwrap();
        gateway.refresh_session();
        api.sync_session().await.unwrap();
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_view_listeners_follow_the_session() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.add_account(EMAIL, PASSWORD);
        let mut api = MemoApi::start(Arc::clone(&gateway), TABLE).await;

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = api.subscribe(move |s| sink.lock().unwrap().push(s.is_some()));

        api.login(EMAIL, PASSWORD).await.unwrap();
        api.logout().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_unknown_selector_is_an_api_error() {
        let (_gateway, api) = signed_in_api(&["a"]).await;
        assert!(matches!(api.resolve_note("5"), Err(MemoError::Api(_))));
    }
}
