//! REST gateway for a Supabase-compatible backend.
//!
//! Auth goes through `/auth/v1`, rows through `/rest/v1/<table>`. Every request
//! carries the public `apikey`; row requests are authorized with the session's
//! access token so the server applies its owner-scoped policies.

use super::{RemoteGateway, SessionListener};
use crate::config::Endpoint;
use crate::error::{MemoError, Result};
use crate::listeners::{lock, ListenerRegistry, Subscription};
use crate::model::{NewNote, Note, NoteId, NotePatch, Session};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            user_id: self.user.id,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            email: self.user.email,
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Best human-readable message from an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                format!("HTTP {}: {}", status, body.trim())
            }
        })
}

/// Sign-up answers with a full token when the account is usable right away,
/// and with a bare user record when email confirmation is pending.
fn session_from_signup(body: Value) -> Result<Option<Session>> {
    if body.get("access_token").is_none() {
        return Ok(None);
    }
    let token: TokenResponse = serde_json::from_value(body)?;
    Ok(Some(token.into_session()))
}

pub struct HttpGateway {
    client: Client,
    endpoint: Endpoint,
    session_file: Option<PathBuf>,
    session: Mutex<Option<Session>>,
    listeners: ListenerRegistry<Option<Session>>,
}

impl HttpGateway {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            session_file: None,
            session: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Use a preconfigured client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Persist the session in `path`, restoring whatever a previous run left.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let restored = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Session>(&content) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };
        self.session = Mutex::new(restored);
        self.session_file = Some(path);
        Ok(self)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.endpoint.url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.endpoint.url, table)
    }

    fn current(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.endpoint.anon_key)
    }

    /// Attaches the caller's token, falling back to the anon key.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .current()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.endpoint.anon_key.clone());
        self.with_api_key(request)
            .header("Authorization", format!("Bearer {}", token))
    }

    /// Replaces the session, notifies on change, then persists it.
    ///
    /// A failed write only costs the next process its restore, so it is
    /// logged and the in-memory session stays authoritative.
    fn set_session(&self, session: Option<Session>) {
        let changed = {
            let mut current = lock(&self.session);
            let changed = *current != session;
            *current = session.clone();
            changed
        };
        if changed {
            self.listeners.emit(&session);
        }
        if let Err(e) = self.persist(&session) {
            tracing::warn!("Could not persist session: {}", e);
        }
    }

    fn persist(&self, session: &Option<Session>) -> Result<()> {
        let Some(path) = &self.session_file else {
            return Ok(());
        };
        match session {
            Some(session) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, serde_json::to_string_pretty(session)?)?;
            }
            None => {
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MemoError::Gateway(error_message(status, &body)))
    }

    /// Like [`Self::check`], but a 401 from the row store means the server no
    /// longer accepts the session.
    async fn check_rows(&self, response: Response) -> Result<Response> {
        if response.status() == StatusCode::UNAUTHORIZED && self.current().is_some() {
            tracing::info!("Backend rejected the session token; signing out locally");
            let result = Self::check(response).await;
            self.set_session(None);
            return result;
        }
        Self::check(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        tracing::debug!("Refreshing session");
        let response = self
            .with_api_key(self.client.post(self.auth_url("token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        let token: TokenResponse = Self::check(response).await?.json().await?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn auth_get_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.current() else {
            return Ok(None);
        };
        if !session.is_expired_at(Utc::now()) {
            return Ok(Some(session));
        }

        let refreshed = match session.refresh_token.as_deref() {
            Some(token) => match self.refresh(token).await {
                Ok(fresh) => Some(fresh),
                Err(e) => {
                    tracing::warn!("Session refresh failed: {}", e);
                    None
                }
            },
            None => None,
        };
        self.set_session(refreshed.clone());
        Ok(refreshed)
    }

    fn auth_on_change(&self, listener: SessionListener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    async fn auth_sign_up(&self, email: &str, password: &str) -> Result<()> {
        tracing::debug!("POST auth/v1/signup");
        let response = self
            .with_api_key(self.client.post(self.auth_url("signup")))
            .json(&Credentials { email, password })
            .send()
            .await?;
        let body: Value = Self::check(response).await?.json().await?;
        match session_from_signup(body)? {
            Some(session) => self.set_session(Some(session)),
            None => tracing::info!("Sign-up accepted; confirmation pending for {}", email),
        }
        Ok(())
    }

    async fn auth_sign_in(&self, email: &str, password: &str) -> Result<()> {
        tracing::debug!("POST auth/v1/token (password)");
        let response = self
            .with_api_key(self.client.post(self.auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;
        let token: TokenResponse = Self::check(response).await?.json().await?;
        self.set_session(Some(token.into_session()));
        Ok(())
    }

    async fn auth_sign_out(&self) -> Result<()> {
        if self.current().is_none() {
            return Ok(());
        }
        tracing::debug!("POST auth/v1/logout");
        let response = self
            .authorized(self.client.post(self.auth_url("logout")))
            .send()
            .await?;
        Self::check(response).await?;
        self.set_session(None);
        Ok(())
    }

    async fn select_all(&self, table: &str, owner_id: &str) -> Result<Vec<Note>> {
        tracing::debug!("GET rest/v1/{}", table);
        let owner_filter = format!("eq.{}", owner_id);
        let response = self
            .authorized(self.client.get(self.rest_url(table)))
            .query(&[("select", "*"), ("user_id", owner_filter.as_str())])
            .send()
            .await?;
        let rows = self.check_rows(response).await?.json().await?;
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: &NewNote) -> Result<()> {
        tracing::debug!("POST rest/v1/{}", table);
        let response = self
            .authorized(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;
        self.check_rows(response).await?;
        Ok(())
    }

    async fn update_by_id(&self, table: &str, id: &NoteId, patch: &NotePatch) -> Result<()> {
        tracing::debug!("PATCH rest/v1/{} id={}", table, id);
        let id_filter = format!("eq.{}", id);
        let response = self
            .authorized(self.client.patch(self.rest_url(table)))
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        self.check_rows(response).await?;
        Ok(())
    }

    async fn delete_by_id(&self, table: &str, id: &NoteId) -> Result<()> {
        tracing::debug!("DELETE rest/v1/{} id={}", table, id);
        let id_filter = format!("eq.{}", id);
        let response = self
            .authorized(self.client.delete(self.rest_url(table)))
            .query(&[("id", id_filter.as_str())])
            .send()
            .await?;
        self.check_rows(response).await?;
        Ok(())
    }
}
