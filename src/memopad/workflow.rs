//! # Edit/Delete Workflow
//!
//! Coordinates the single composer draft shared by create and update, plus the
//! two-step delete.
//!
//! ```text
//!            begin_edit(id)               request_delete(id)
//!   Idle ───────────────────▶ Editing(id) ───────────────────▶ ConfirmingDelete(id)
//!    ▲ ◀─────────────────────────┘                                   │
//!    │   cancel_edit / submit ok                                     │
//!    └───────────────────────── confirm_delete / cancel_delete ◀─────┘
//! ```
//!
//! Submit is bound to the state: while editing it updates the edit target,
//! otherwise it creates a new note from the draft.
//!
//! A pending delete does not discard an edit in progress. Resolving the delete
//! returns to the edit, unless the confirmed delete removed the very note
//! being edited.
//!
//! The delete is only ever issued from [`Workflow::confirm_delete`].

use crate::error::Result;
use crate::gateway::RemoteGateway;
use crate::model::{NoteId, Session};
use crate::notes::{NoteCollection, Outcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Editing(NoteId),
    ConfirmingDelete(NoteId),
}

#[derive(Debug, Default)]
pub struct Workflow {
    edit_target: Option<NoteId>,
    delete_target: Option<NoteId>,
    draft: String,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pending delete takes precedence over an edit when reporting state.
    pub fn state(&self) -> WorkflowState {
        match (&self.delete_target, &self.edit_target) {
            (Some(id), _) => WorkflowState::ConfirmingDelete(id.clone()),
            (None, Some(id)) => WorkflowState::Editing(id.clone()),
            (None, None) => WorkflowState::Idle,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn edit_target(&self) -> Option<&NoteId> {
        self.edit_target.as_ref()
    }

    pub fn delete_target(&self) -> Option<&NoteId> {
        self.delete_target.as_ref()
    }

    pub fn is_confirming_delete(&self) -> bool {
        self.delete_target.is_some()
    }

    /// Starts editing `id`, seeding the draft with its current content.
    /// Returns false (and changes nothing) when the note is not in the list.
    pub fn begin_edit<G: RemoteGateway>(&mut self, notes: &NoteCollection<G>, id: &NoteId) -> bool {
        let Some(note) = notes.get(id) else {
            tracing::debug!("Ignoring edit of unknown note {}", id);
            return false;
        };
        self.draft = note.content.clone();
        self.edit_target = Some(id.clone());
        true
    }

    pub fn cancel_edit(&mut self) {
        self.edit_target = None;
        self.draft.clear();
    }

    /// Saves the draft: updates the edit target if there is one, otherwise
    /// creates a note. Draft and edit target are kept unless it was applied.
    pub async fn submit<G: RemoteGateway>(
        &mut self,
        notes: &mut NoteCollection<G>,
        session: Option<&Session>,
    ) -> Result<Outcome> {
        let outcome = match &self.edit_target {
            Some(id) => notes.update(Some(id), &self.draft, session).await?,
            None => notes.create(&self.draft, session).await?,
        };
        if outcome.is_applied() {
            self.cancel_edit();
        }
        Ok(outcome)
    }

    /// Asks for confirmation before deleting `id`. Issues nothing.
    pub fn request_delete(&mut self, id: NoteId) {
        self.delete_target = Some(id);
    }

    /// Deletes the pending note. The confirmation closes whatever the result.
    pub async fn confirm_delete<G: RemoteGateway>(
        &mut self,
        notes: &mut NoteCollection<G>,
        session: Option<&Session>,
    ) -> Result<Outcome> {
        let target = self.delete_target.take();
        let outcome = notes.delete(target.as_ref(), session).await?;
        if outcome.is_applied() && target.is_some() && target == self.edit_target {
            self.cancel_edit();
        }
        Ok(outcome)
    }

    /// Dismisses the confirmation. Returns whether one was pending.
    pub fn cancel_delete(&mut self) -> bool {
        self.delete_target.take().is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{FailOn, GatewayCall, InMemoryGateway};
    use std::sync::Arc;

    const TABLE: &str = "memos";

    struct Fixture {
        gateway: Arc<InMemoryGateway>,
        session: Session,
        notes: NoteCollection<InMemoryGateway>,
        workflow: Workflow,
    }

    async fn fixture(seed: &[&str]) -> (Fixture, Vec<NoteId>) {
        let gateway = Arc::new(InMemoryGateway::new().with_signed_in("a@b.c", "secret123"));
        let session = gateway.session().unwrap();
        let ids = seed
            .iter()
            .map(|c| gateway.seed_note(TABLE, &session.user_id, c))
            .collect();
        let mut notes = NoteCollection::new(Arc::clone(&gateway), TABLE);
        notes.fetch_all(Some(&session)).await.unwrap();
        gateway.clear_calls();
        (
            Fixture {
                gateway,
                session,
                notes,
                workflow: Workflow::new(),
            },
            ids,
        )
    }

    fn contents(notes: &NoteCollection<InMemoryGateway>) -> Vec<&str> {
        notes.notes().iter().map(|n| n.content.as_str()).collect()
    }

    #[tokio::test]
    async fn test_submit_while_idle_creates() {
        let (mut f, _) = fixture(&[]).await;
        f.workflow.set_draft("hello");

        let outcome = f
            .workflow
            .submit(&mut f.notes, Some(&f.session))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(contents(&f.notes), vec!["hello"]);
        assert_eq!(f.workflow.draft(), "");
        assert_eq!(f.workflow.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn test_edit_then_submit_updates_the_target() {
        let (mut f, ids) = fixture(&["a"]).await;

        assert!(f.workflow.begin_edit(&f.notes, &ids[0]));
        assert_eq!(f.workflow.draft(), "a");
        assert_eq!(f.workflow.state(), WorkflowState::Editing(ids[0].clone()));

        f.workflow.set_draft("b");
        f.workflow
            .submit(&mut f.notes, Some(&f.session))
            .await
            .unwrap();

        assert_eq!(
            f.gateway.mutation_calls(),
            vec![GatewayCall::UpdateById {
                table: TABLE.to_string(),
                id: ids[0].clone(),
                content: "b".to_string(),
            }]
        );
        assert_eq!(f.notes.notes()[0].id, ids[0]);
        assert_eq!(contents(&f.notes), vec!["b"]);
        assert_eq!(f.workflow.state(), WorkflowState::Idle);
        assert_eq!(f.workflow.draft(), "");
    }

    #[tokio::test]
    async fn test_editing_never_creates() {
        let (mut f, ids) = fixture(&["a", "b"]).await;
        f.workflow.begin_edit(&f.notes, &ids[1]);
        f.workflow.set_draft("changed");
        f.workflow
            .submit(&mut f.notes, Some(&f.session))
            .await
            .unwrap();

        let calls = f.gateway.mutation_calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], GatewayCall::UpdateById { id, .. } if id == &ids[1]));
        assert_eq!(contents(&f.notes), vec!["a", "changed"]);
    }

    #[tokio::test]
    async fn test_begin_edit_of_unknown_note_is_ignored() {
        let (mut f, _) = fixture(&["a"]).await;
        f.workflow.set_draft("typed");
        assert!(!f.workflow.begin_edit(&f.notes, &NoteId::new("missing")));
        assert_eq!(f.workflow.state(), WorkflowState::Idle);
        assert_eq!(f.workflow.draft(), "typed");
    }

    #[tokio::test]
    async fn test_cancel_edit_clears_draft() {
        let (mut f, ids) = fixture(&["a"]).await;
        f.workflow.begin_edit(&f.notes, &ids[0]);
        f.workflow.cancel_edit();
        assert_eq!(f.workflow.state(), WorkflowState::Idle);
        assert_eq!(f.workflow.draft(), "");
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_the_draft() {
        let (mut f, ids) = fixture(&["a"]).await;
        f.gateway.set_failing(FailOn::Insert, true);
        f.workflow.set_draft("unsaved");
        assert!(f
            .workflow
            .submit(&mut f.notes, Some(&f.session))
            .await
            .is_err());
        assert_eq!(f.workflow.draft(), "unsaved");

        f.gateway.set_failing(FailOn::Update, true);
        f.workflow.begin_edit(&f.notes, &ids[0]);
        f.workflow.set_draft("edited");
        assert!(f
            .workflow
            .submit(&mut f.notes, Some(&f.session))
            .await
            .is_err());
        assert_eq!(f.workflow.state(), WorkflowState::Editing(ids[0].clone()));
        assert_eq!(f.workflow.draft(), "edited");
    }

    #[tokio::test]
    async fn test_blank_draft_submit_is_skipped() {
        let (mut f, _) = fixture(&[]).await;
        f.workflow.set_draft("   ");
        let outcome = f
            .workflow
            .submit(&mut f.notes, Some(&f.session))
            .await
            .unwrap();
        assert!(!outcome.is_applied());
        assert_eq!(f.workflow.draft(), "   ");
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_request_then_cancel_never_deletes() {
        let (mut f, ids) = fixture(&["a"]).await;

        f.workflow.request_delete(ids[0].clone());
        assert_eq!(
            f.workflow.state(),
            WorkflowState::ConfirmingDelete(ids[0].clone())
        );
        assert!(f.workflow.is_confirming_delete());
        assert!(f.gateway.calls().is_empty());

        assert!(f.workflow.cancel_delete());
        assert_eq!(f.workflow.state(), WorkflowState::Idle);
        assert_eq!(contents(&f.notes), vec!["a"]);
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_request_then_confirm_deletes() {
        let (mut f, ids) = fixture(&["a", "b"]).await;

        f.workflow.request_delete(ids[0].clone());
        let outcome = f
            .workflow
            .confirm_delete(&mut f.notes, Some(&f.session))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(
            f.gateway.mutation_calls(),
            vec![GatewayCall::DeleteById {
                table: TABLE.to_string(),
                id: ids[0].clone(),
            }]
        );
        assert!(f.notes.get(&ids[0]).is_none());
        assert_eq!(f.workflow.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn test_failed_delete_still_closes_the_confirmation() {
        let (mut f, ids) = fixture(&["a"]).await;
        f.gateway.set_failing(FailOn::Delete, true);
        f.workflow.request_delete(ids[0].clone());

        assert!(f
            .workflow
            .confirm_delete(&mut f.notes, Some(&f.session))
            .await
            .is_err());
        assert_eq!(f.workflow.state(), WorkflowState::Idle);
        assert_eq!(contents(&f.notes), vec!["a"]);
    }

    #[tokio::test]
    async fn test_confirm_without_request_issues_nothing() {
        let (mut f, _) = fixture(&["a"]).await;
        let outcome = f
            .workflow
            .confirm_delete(&mut f.notes, Some(&f.session))
            .await
            .unwrap();
        assert!(!outcome.is_applied());
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_request_keeps_edit_in_progress() {
        let (mut f, ids) = fixture(&["a", "b"]).await;
        f.workflow.begin_edit(&f.notes, &ids[0]);
        f.workflow.set_draft("half-typed");

        f.workflow.request_delete(ids[1].clone());
        assert_eq!(
            f.workflow.state(),
            WorkflowState::ConfirmingDelete(ids[1].clone())
        );
        f.workflow.cancel_delete();

        assert_eq!(f.workflow.state(), WorkflowState::Editing(ids[0].clone()));
        assert_eq!(f.workflow.draft(), "half-typed");
    }

    #[tokio::test]
    async fn test_deleting_the_edited_note_ends_the_edit() {
        let (mut f, ids) = fixture(&["a"]).await;
        f.workflow.begin_edit(&f.notes, &ids[0]);
        f.workflow.request_delete(ids[0].clone());
        f.workflow
            .confirm_delete(&mut f.notes, Some(&f.session))
            .await
            .unwrap();

        assert_eq!(f.workflow.state(), WorkflowState::Idle);
        assert_eq!(f.workflow.draft(), "");
    }
}
