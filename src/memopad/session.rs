//! # Session Tracker
//!
//! A thin observer over the gateway's session notifications. The gateway is
//! the source of truth; the tracker keeps the last value it announced so the
//! view layer can read it synchronously, and relays changes to its own
//! listeners.
//!
//! ## Notification Guarantees
//!
//! - exactly one notification per state transition
//! - no notification when the gateway re-announces an identical session
//! - a token refresh changes the session value and is announced
//! - after [`Subscription::unsubscribe`] (or drop) a listener is never called
//!
//! ## Auth Calls
//!
//! `sign_up`, `sign_in` and `sign_out` only forward to the gateway. They never
//! touch the cached session; a successful call is followed by a gateway
//! notification, which is what updates the tracker. Failures come back as
//! [`MemoError::Auth`] and leave the session as it was.

use crate::error::{MemoError, Result};
use crate::gateway::RemoteGateway;
use crate::listeners::{lock, ListenerRegistry, Subscription};
use crate::model::Session;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Shared {
    current: Mutex<Option<Session>>,
    listeners: ListenerRegistry<Option<Session>>,
}

impl Shared {
    fn apply(&self, next: Option<Session>) {
        let changed = {
            let mut current = lock(&self.current);
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        };

        if !changed {
            return;
        }
        match &next {
            Some(session) => tracing::info!(user = %session.user_id, "Session active"),
            None => tracing::info!("Session ended"),
        }
        self.listeners.emit(&next);
    }
}

pub struct SessionTracker<G: RemoteGateway> {
    gateway: Arc<G>,
    shared: Arc<Shared>,
    _upstream: Subscription,
}

impl<G: RemoteGateway> SessionTracker<G> {
    /// Subscribes to the gateway, then restores whatever session it holds.
    ///
    /// A failed restore is logged and the tracker starts signed out.
    pub async fn start(gateway: Arc<G>) -> Self {
        let shared = Arc::new(Shared::default());
        let relay = Arc::clone(&shared);
        let upstream = gateway.auth_on_change(Box::new(move |session: &Option<Session>| {
            relay.apply(session.clone());
        }));

        match gateway.auth_get_session().await {
            Ok(restored) => shared.apply(restored),
            Err(e) => tracing::warn!("Could not restore session: {}", e),
        }

        Self {
            gateway,
            shared,
            _upstream: upstream,
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        lock(&self.shared.current).clone()
    }

    pub fn is_signed_in(&self) -> bool {
        lock(&self.shared.current).is_some()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Option<Session>) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(listener)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<()> {
        check_credentials(email, password)?;
        self.gateway
            .auth_sign_up(email.trim(), password)
            .await
            .map_err(|e| log_auth_failure("Sign-up", e))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        check_credentials(email, password)?;
        self.gateway
            .auth_sign_in(email.trim(), password)
            .await
            .map_err(|e| log_auth_failure("Sign-in", e))
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.gateway
            .auth_sign_out()
            .await
            .map_err(|e| log_auth_failure("Sign-out", e))
    }
}

fn check_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(MemoError::Auth(
            "Email and password are required".to_string(),
        ));
    }
    Ok(())
}

fn log_auth_failure(action: &str, error: MemoError) -> MemoError {
    let error = error.into_auth();
    tracing::warn!("{} failed: {}", action, error);
    error
}
