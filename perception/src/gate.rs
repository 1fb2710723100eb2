//! Session gate: decides, for a protected view, whether to render it or redirect to login.
//!
//! A gate starts in `Loading` and resolves on the first session notification it receives.
//! Once resolved it is terminal for the lifetime of the mount; a new mount starts over.

use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::identity::session::{AuthClient, SessionEvent, SessionSubscription};
use crate::routes::LOGIN_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// What the gate renders for its current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome<V> {
    /// Still waiting on the provider
    Placeholder,
    Render(V),
    /// Client-side redirect; the attempted destination is not remembered
    Redirect(&'static str),
}

pub struct SessionGate {
    mount_id: Uuid,
    state: GateState,
    subscription: SessionSubscription,
}

impl SessionGate {
    /// Mount the gate: subscribe to session changes and enter `Loading`.
    pub fn mount(client: &AuthClient) -> Self {
        let mount_id = Uuid::new_v4();
        debug!(%mount_id, "gate: mounted, waiting for session state");
        Self {
            mount_id,
            state: GateState::Loading,
            subscription: client.on_auth_state_changed(),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Wait for the first notification and settle the gate. Returns immediately once
    /// resolved. If the provider never notifies this never returns.
    pub async fn resolve(&mut self) -> GateState {
        if self.state != GateState::Loading {
            return self.state;
        }
        match self.subscription.next().await {
            Some(event) => self.settle(&event),
            // The auth instance is gone without ever notifying: nothing will arrive
            None => std::future::pending::<()>().await,
        }
        self.state
    }

    /// Like [`resolve`](Self::resolve), but gives up after `limit`, leaving the gate in
    /// `Loading`.
    pub async fn resolve_within(&mut self, limit: Duration) -> GateState {
        let mount_id = self.mount_id;
        match tokio::time::timeout(limit, self.resolve()).await {
            Ok(state) => state,
            Err(_) => {
                info!(%mount_id, "gate: no session notification within {:?}", limit);
                GateState::Loading
            }
        }
    }

    /// Render decision for the current state. `view` is only invoked when authenticated.
    pub fn outcome<V>(&self, view: impl FnOnce() -> V) -> GateOutcome<V> {
        match self.state {
            GateState::Loading => GateOutcome::Placeholder,
            GateState::Authenticated => GateOutcome::Render(view()),
            GateState::Unauthenticated => GateOutcome::Redirect(LOGIN_PATH),
        }
    }

    fn settle(&mut self, event: &SessionEvent) {
        self.state = match event {
            SessionEvent::SignedIn(_) => GateState::Authenticated,
            SessionEvent::SignedOut => GateState::Unauthenticated,
        };
        debug!(mount_id = %self.mount_id, state = ?self.state, "gate: resolved");
    }
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        debug!(mount_id = %self.mount_id, "gate: unmounted");
    }
}
