//! Session identity as published by the identity provider.
//!
//! The provider side holds an [`IdentityHandle`]; the engine side holds the
//! matching [`SessionContext`]. Until the provider publishes its first
//! session the context reports [`SessionState::Initializing`], and
//! [`SessionContext::ready`] waits for that first publication.

use crate::{error::Result, Error, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Who is browsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "userId")]
pub enum Session {
    /// No stable identity; lists live only on the device.
    Guest,
    /// Signed in; lists live in the user's remote document.
    Authenticated(UserId),
}

impl Session {
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Session::Guest => None,
            Session::Authenticated(user) => Some(user),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Session::Guest)
    }
}

/// What the identity provider has told us so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The provider has not finished restoring its session yet.
    Initializing,
    Ready(Session),
}

/// Provider-side handle used to publish session changes.
#[derive(Debug)]
pub struct IdentityHandle {
    tx: watch::Sender<SessionState>,
}

impl IdentityHandle {
    /// Publish the current session.
    pub fn publish(&self, session: Session) {
        self.tx.send_replace(SessionState::Ready(session));
    }

    pub fn sign_in(&self, user: impl Into<UserId>) {
        self.publish(Session::Authenticated(user.into()));
    }

    pub fn sign_out(&self) {
        self.publish(Session::Guest);
    }

    /// Another context observing the same provider.
    pub fn subscribe(&self) -> SessionContext {
        SessionContext {
            rx: self.tx.subscribe(),
        }
    }
}

/// Engine-side view of the identity provider.
#[derive(Debug, Clone)]
pub struct SessionContext {
    rx: watch::Receiver<SessionState>,
}

impl SessionContext {
    /// Create a connected provider handle and context, starting in
    /// [`SessionState::Initializing`].
    pub fn channel() -> (IdentityHandle, SessionContext) {
        let (tx, rx) = watch::channel(SessionState::Initializing);
        (IdentityHandle { tx }, SessionContext { rx })
    }

    /// A context that is already ready with a fixed session.
    pub fn fixed(session: Session) -> (IdentityHandle, SessionContext) {
        let (tx, rx) = watch::channel(SessionState::Ready(session));
        (IdentityHandle { tx }, SessionContext { rx })
    }

    pub fn state(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// The published session, if the provider is ready.
    pub fn current(&self) -> Option<Session> {
        match &*self.rx.borrow() {
            SessionState::Ready(session) => Some(session.clone()),
            SessionState::Initializing => None,
        }
    }

    /// Wait until the provider has published a session and return it.
    pub async fn ready(&mut self) -> Result<Session> {
        let state = self
            .rx
            .wait_for(|state| matches!(state, SessionState::Ready(_)))
            .await
            .map_err(|_| Error::IdentityClosed)?;

        match &*state {
            SessionState::Ready(session) => Ok(session.clone()),
            SessionState::Initializing => Err(Error::IdentityClosed),
        }
    }

    /// Wait for the next published session.
    ///
    /// Returns `None` once the provider handle has been dropped.
    pub async fn next(&mut self) -> Option<Session> {
        loop {
            self.rx.changed().await.ok()?;
            if let SessionState::Ready(session) = &*self.rx.borrow_and_update() {
                return Some(session.clone());
            }
        }
    }
}
