//! Auth signal consumed by the session.
//!
//! The authentication flow itself lives outside this crate. It publishes the
//! current [`AuthState`] on an [`AuthSignal`]; the session subscribes and
//! reacts to identity-presence transitions only.

use closet_core::UserId;
use tokio::sync::watch;

/// Snapshot of the auth collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<UserId>,
    /// True while the auth flow is still resolving; transitions are ignored
    /// until it settles.
    pub loading: bool,
}

impl AuthState {
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }
}

/// Publisher side of the auth state.
#[derive(Debug)]
pub struct AuthSignal {
    tx: watch::Sender<AuthState>,
}

impl Default for AuthSignal {
    fn default() -> Self {
        Self::new(AuthState::default())
    }
}

impl AuthSignal {
    pub fn new(initial: AuthState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn sign_in(&self, user: UserId) {
        self.tx.send_replace(AuthState::signed_in(user));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(AuthState::default());
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|state| state.loading = loading);
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }
}
