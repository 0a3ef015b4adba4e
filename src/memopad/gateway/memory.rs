use super::{RemoteGateway, SessionListener};
use crate::error::{MemoError, Result};
use crate::listeners::{lock, ListenerRegistry, Subscription};
use crate::model::{NewNote, Note, NoteId, NotePatch, Session};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

/// A gateway operation as observed by the fake, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    GetSession,
    SignUp(String),
    SignIn(String),
    SignOut,
    SelectAll { table: String, owner: String },
    Insert { table: String, content: String },
    UpdateById { table: String, id: NoteId, content: String },
    DeleteById { table: String, id: NoteId },
}

impl GatewayCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            GatewayCall::Insert { .. } | GatewayCall::UpdateById { .. } | GatewayCall::DeleteById { .. }
        )
    }
}

/// Operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    /// `auth_get_session`
    Restore,
    Auth,
    Select,
    Insert,
    Update,
    Delete,
}

struct Account {
    user_id: String,
    password: String,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    tables: HashMap<String, Vec<Note>>,
    next_row_id: u64,
    next_token: u64,
    calls: Vec<GatewayCall>,
    failing: HashSet<FailOn>,
}

impl State {
    fn issue_session(&mut self, email: &str, user_id: &str) -> Session {
        self.next_token += 1;
        let mut session = Session::new(user_id, format!("token-{}", self.next_token))
            .with_email(email);
        session.refresh_token = Some(format!("refresh-{}", self.next_token));
        session
    }

    fn check(&self, op: FailOn) -> Result<()> {
        if self.failing.contains(&op) {
            return Err(MemoError::Gateway(format!("Simulated {:?} failure", op)));
        }
        Ok(())
    }

    fn current_user(&self) -> Option<String> {
        self.session.as_ref().map(|s| s.user_id.clone())
    }
}

/// In-memory gateway for testing.
///
/// Behaves like a hosted backend with row-level security: reads only return
/// rows owned by the signed-in user, inserts must carry the caller's id, and
/// update/delete silently match nothing when the row belongs to someone else
/// or no longer exists.
pub struct InMemoryGateway {
    state: Mutex<State>,
    listeners: ListenerRegistry<Option<Session>>,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                next_row_id: 1,
                ..State::default()
            }),
            listeners: ListenerRegistry::new(),
        }
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account and returns its user id.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let user_id = Uuid::new_v4().to_string();
        lock(&self.state).accounts.insert(
            email.to_string(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        user_id
    }

    /// Registers an account and starts with it signed in, as if a previous
    /// run had left a persisted session behind. No notification is sent.
    pub fn with_signed_in(self, email: &str, password: &str) -> Self {
        let user_id = self.add_account(email, password);
        {
            let mut state = lock(&self.state);
            let session = state.issue_session(email, &user_id);
            state.session = Some(session);
        }
        self
    }

    /// Inserts a row directly, bypassing auth and call recording.
    pub fn seed_note(&self, table: &str, owner_id: &str, content: &str) -> NoteId {
        let mut state = lock(&self.state);
        let id = NoteId::new(state.next_row_id.to_string());
        state.next_row_id += 1;
        state.tables.entry(table.to_string()).or_default().push(Note {
            id: id.clone(),
            owner_id: owner_id.to_string(),
            content: content.to_string(),
            created_at: Some(Utc::now()),
        });
        id
    }

    /// Removes a row directly, as another client would.
    pub fn remove_note(&self, table: &str, id: &NoteId) {
        if let Some(rows) = lock(&self.state).tables.get_mut(table) {
            rows.retain(|n| &n.id != id);
        }
    }

    /// Every row of a table regardless of owner.
    pub fn rows(&self, table: &str) -> Vec<Note> {
        lock(&self.state)
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn session(&self) -> Option<Session> {
        lock(&self.state).session.clone()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.state).calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<GatewayCall> {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Number of auth listeners still registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Enable failure simulation for an operation.
    pub fn set_failing(&self, op: FailOn, failing: bool) {
        let mut state = lock(&self.state);
        if failing {
            state.failing.insert(op);
        } else {
            state.failing.remove(&op);
        }
    }

    /// Invalidates the session server-side (e.g. token expiry) and notifies.
    pub fn expire_session(&self) {
        let previous = lock(&self.state).session.take();
        if previous.is_some() {
            self.listeners.emit(&None);
        }
    }

    /// Rotates the access token of the current session and notifies.
    pub fn refresh_session(&self) {
        let refreshed = {
            let mut state = lock(&self.state);
            let Some(current) = state.session.clone() else {
                return;
            };
            let email = current.email.clone().unwrap_or_default();
            let session = state.issue_session(&email, &current.user_id);
            state.session = Some(session.clone());
            session
        };
        self.listeners.emit(&Some(refreshed));
    }

    /// Re-announces the current session without changing it.
    pub fn replay_session(&self) {
        let current = lock(&self.state).session.clone();
        self.listeners.emit(&current);
    }

    fn record(&self, call: GatewayCall) -> std::sync::MutexGuard<'_, State> {
        let mut state = lock(&self.state);
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl RemoteGateway for InMemoryGateway {
    async fn auth_get_session(&self) -> Result<Option<Session>> {
        let state = self.record(GatewayCall::GetSession);
        state.check(FailOn::Restore)?;
        Ok(state.session.clone())
    }

    fn auth_on_change(&self, listener: SessionListener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    async fn auth_sign_up(&self, email: &str, password: &str) -> Result<()> {
        let session = {
            let mut state = self.record(GatewayCall::SignUp(email.to_string()));
            state.check(FailOn::Auth)?;
            if state.accounts.contains_key(email) {
                return Err(MemoError::Auth("User already registered".to_string()));
            }
            if password.len() < MIN_PASSWORD_LEN {
                return Err(MemoError::Auth(format!(
                    "Password should be at least {} characters",
                    MIN_PASSWORD_LEN
                )));
            }
            let user_id = Uuid::new_v4().to_string();
            state.accounts.insert(
                email.to_string(),
                Account {
                    user_id: user_id.clone(),
                    password: password.to_string(),
                },
            );
            let session = state.issue_session(email, &user_id);
            state.session = Some(session.clone());
            session
        };
        self.listeners.emit(&Some(session));
        Ok(())
    }

    async fn auth_sign_in(&self, email: &str, password: &str) -> Result<()> {
        let session = {
            let mut state = self.record(GatewayCall::SignIn(email.to_string()));
            state.check(FailOn::Auth)?;
            let user_id = match state.accounts.get(email) {
                Some(account) if account.password == password => account.user_id.clone(),
                _ => return Err(MemoError::Auth("Invalid login credentials".to_string())),
            };
            let session = state.issue_session(email, &user_id);
            state.session = Some(session.clone());
            session
        };
        self.listeners.emit(&Some(session));
        Ok(())
    }

    async fn auth_sign_out(&self) -> Result<()> {
        let previous = {
            let mut state = self.record(GatewayCall::SignOut);
            state.check(FailOn::Auth)?;
            state.session.take()
        };
        if previous.is_some() {
            self.listeners.emit(&None);
        }
        Ok(())
    }

    async fn select_all(&self, table: &str, owner_id: &str) -> Result<Vec<Note>> {
        let state = self.record(GatewayCall::SelectAll {
            table: table.to_string(),
            owner: owner_id.to_string(),
        });
        state.check(FailOn::Select)?;
        let Some(caller) = state.current_user() else {
            return Ok(Vec::new());
        };
        Ok(state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|n| n.owner_id == caller && n.owner_id == owner_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: &NewNote) -> Result<()> {
        let mut state = self.record(GatewayCall::Insert {
            table: table.to_string(),
            content: row.content.clone(),
        });
        state.check(FailOn::Insert)?;
        if state.current_user().as_deref() != Some(row.user_id.as_str()) {
            return Err(MemoError::Gateway(
                "new row violates row-level security policy".to_string(),
            ));
        }
        let id = NoteId::new(state.next_row_id.to_string());
        state.next_row_id += 1;
        state.tables.entry(table.to_string()).or_default().push(Note {
            id,
            owner_id: row.user_id.clone(),
            content: row.content.clone(),
            created_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn update_by_id(&self, table: &str, id: &NoteId, patch: &NotePatch) -> Result<()> {
        let mut state = self.record(GatewayCall::UpdateById {
            table: table.to_string(),
            id: id.clone(),
            content: patch.content.clone(),
        });
        state.check(FailOn::Update)?;
        let caller = state.current_user();
        if let Some(rows) = state.tables.get_mut(table) {
            for note in rows
                .iter_mut()
                .filter(|n| &n.id == id && Some(&n.owner_id) == caller.as_ref())
            {
                note.content = patch.content.clone();
            }
        }
        Ok(())
    }

    async fn delete_by_id(&self, table: &str, id: &NoteId) -> Result<()> {
        let mut state = self.record(GatewayCall::DeleteById {
            table: table.to_string(),
            id: id.clone(),
        });
        state.check(FailOn::Delete)?;
        let caller = state.current_user();
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|n| !(&n.id == id && Some(&n.owner_id) == caller.as_ref()));
        }
        Ok(())
    }
}
