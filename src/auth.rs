//! Authentication state and persistence.
//!
//! The auth store is foundational: every per-user store derives its
//! persistence namespace from [`AuthStore::current_user_id`]. State is
//! updated in memory first (subscribers notified immediately) and then
//! mirrored to both persistence tiers; mirroring failures are logged,
//! never propagated, and never roll back the in-memory state.

use crate::storage::{Storage, Tier, keys};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An authenticated (or authenticating) user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned user id, absent until the backend confirms one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Institutional email address.
    pub email: String,
    /// Bearer token issued at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Current authentication status.
///
/// Invariant: `is_authenticated == true` implies `user.is_some()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    /// Whether a user is logged in.
    pub is_authenticated: bool,
    /// The logged-in user, if any.
    pub user: Option<User>,
    /// Bearer token, if any.
    pub token: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            token: None,
        }
    }
}

/// Owner of the in-memory auth state and its persisted mirrors.
#[derive(Clone)]
pub struct AuthStore {
    state: Store<AuthState>,
    storage: Arc<Storage>,
}

impl AuthStore {
    /// Create an unauthenticated store over `storage`.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            state: Store::new(AuthState::default()),
            storage,
        }
    }

    /// Snapshot of the in-memory state.
    pub fn current(&self) -> AuthState {
        self.state.get()
    }

    /// The underlying reactive container, for subscribers.
    pub fn state(&self) -> Store<AuthState> {
        self.state.clone()
    }

    /// Log `user` in: in-memory state first, then mirror the snapshot
    /// and the bare token to the session tier and the durable tier.
    pub fn login(&self, user: User) {
        tracing::info!(email = %user.email, "Logging in");

        let state = AuthState {
            is_authenticated: true,
            token: user.token.clone(),
            user: Some(user),
        };
        self.state.set(state.clone());

        let token = state.token.clone().unwrap_or_default();
        for tier in [Tier::Session, Tier::Durable] {
            if let Err(e) = self.storage.write(tier, keys::AUTH_TOKEN, &token) {
                tracing::warn!(error = %e, ?tier, "Failed to store auth token");
            }
            if let Err(e) = self.storage.write(tier, keys::AUTH, &state) {
                tracing::warn!(error = %e, ?tier, "Failed to store auth state");
            }
        }
    }

    /// Log out: reset in-memory state, then best-effort-clear both
    /// tiers.
    pub fn logout(&self) {
        tracing::info!("Logging out");

        self.state.set(AuthState::default());

        for tier in [Tier::Session, Tier::Durable] {
            for key in [keys::AUTH_TOKEN, keys::AUTH] {
                if let Err(e) = self.storage.remove(tier, key) {
                    tracing::warn!(error = %e, ?tier, key, "Failed to clear auth data");
                }
            }
        }
    }

    /// Restore a persisted session, preferring the session tier.
    ///
    /// Returns `true` when an authenticated snapshot was found and set
    /// as current state. A snapshot with `is_authenticated == false`
    /// (an intentional logout) and a missing snapshot both report
    /// `false` without mutating state; a malformed snapshot is treated
    /// as missing.
    pub fn restore(&self) -> bool {
        let snapshot = self
            .read_snapshot(Tier::Session)
            .or_else(|| self.read_snapshot(Tier::Durable));

        match snapshot {
            Some(state) if state.is_authenticated => {
                let email = state.user.as_ref().map(|u| u.email.clone());
                tracing::info!(email = ?email, "Restored auth session");
                self.state.set(state);
                true
            }
            _ => false,
        }
    }

    /// The current user's id from the DURABLE tier snapshot.
    ///
    /// Deliberately reads persisted state rather than memory: this is
    /// the namespacing primitive for the per-user stores, and it must
    /// agree with what those stores will find after a restart.
    pub fn current_user_id(&self) -> Option<String> {
        self.read_snapshot(Tier::Durable)?.user?.id
    }

    /// The bearer token, from memory or the durable tier.
    pub fn token(&self) -> Option<String> {
        if let Some(token) = self.state.get().token {
            return Some(token);
        }
        match self.storage.read::<String>(Tier::Durable, keys::AUTH_TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    fn read_snapshot(&self, tier: Tier) -> Option<AuthState> {
        match self.storage.read::<AuthState>(tier, keys::AUTH) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, ?tier, "Ignoring unreadable auth snapshot");
                None
            }
        }
    }
}
