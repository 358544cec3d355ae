//! Session store: the single source of truth for who is logged in
//!
//! ```text
//!   restore() ──┐                    ┌── logout()
//!   login()   ──┼──► publish(state) ─┼── 401 event
//!   register()──┘        │           └── periodic rejection
//!                        ▼
//!              watch::Sender<AuthState> ──► guards, navigator
//!                        │
//!                        └── arms/cancels ValidityLoop on identity change
//! ```

use super::backend::AuthBackend;
use super::credential::Credential;
use super::model::{AuthState, Role, Session};
use super::storage::{clear_session, load_session, save_session, SessionStorage};
use super::validity::ValidityLoop;
use crate::api::types::{LoginResponse, RegisterRequest};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::http::{AuthEvent, AuthEventListener};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{watch, OnceCell};

/// Profile entry as persisted; the credential comes from the token entry
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProfile {
    username: String,
    #[serde(default)]
    roles: Vec<Role>,
    user_id: i64,
}

/// Validity loop together with the identity it was armed for
struct ArmedLoop {
    session: Session,
    task: ValidityLoop,
}

/// Process-wide session store
pub struct SessionStore {
    me: Weak<SessionStore>,
    backend: Arc<dyn AuthBackend>,
    storage: Arc<dyn SessionStorage>,
    validation_interval: Duration,
    expiry_margin: Duration,
    state: watch::Sender<AuthState>,
    restored: OnceCell<()>,
    /// Bumped on every published change
    generation: AtomicU64,
    validity: Mutex<Option<ArmedLoop>>,
}

impl SessionStore {
    /// Create a store in the `loading` state
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        storage: Arc<dyn SessionStorage>,
        config: &SessionConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(AuthState::loading());
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            backend,
            storage,
            validation_interval: config.validation_interval(),
            expiry_margin: config.expiry_margin(),
            state,
            restored: OnceCell::new(),
            generation: AtomicU64::new(0),
            validity: Mutex::new(None),
        })
    }

    /// Snapshot of the published state
    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Current session, if any
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// True while a periodic validation task is armed and running
    pub fn validity_armed(&self) -> bool {
        match self.validity.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|armed| !armed.task.is_finished()),
            Err(_) => false,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restore the persisted session, once per store.
    ///
    /// Concurrent and repeated calls wait for (or skip to) the single
    /// outcome. Ends with `loading == false`.
    pub async fn restore(&self) -> AuthState {
        self.restored.get_or_init(|| self.restore_inner()).await;
        self.current()
    }

    async fn restore_inner(&self) {
        let persisted = match load_session(self.storage.as_ref()) {
            Ok(Some(persisted)) => persisted,
            Ok(None) => {
                tracing::debug!("No persisted session");
                self.discard();
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session");
                self.discard();
                return;
            }
        };

        let credential = Credential::new(persisted.token);
        if !credential.is_usable(self.expiry_margin) {
            tracing::info!("Persisted credential malformed or about to expire, discarding");
            self.discard();
            return;
        }

        let profile: StoredProfile = match serde_json::from_str(&persisted.profile) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "Persisted profile unreadable, discarding");
                self.discard();
                return;
            }
        };

        let generation = self.generation.load(Ordering::SeqCst);
        let answer = self.backend.validate().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(username = %profile.username, "Session changed while restoring, keeping it");
            return;
        }

        match answer {
            Ok(true) => {
                let session =
                    Session::new(profile.username, profile.roles, profile.user_id, credential);
                tracing::info!(username = %session.username, "Session restored");
                self.publish(Some(session));
            }
            Ok(false) => {
                tracing::info!(username = %profile.username, "Persisted session rejected by backend");
                self.discard();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not re-validate persisted session, discarding");
                self.discard();
            }
        }
    }

    /// Authenticate and publish the new session.
    ///
    /// On failure the existing session (if any) is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let response = self.backend.login(username, password).await?;
        let session = self.establish(response)?;
        tracing::info!(username = %session.username, "Logged in");
        Ok(session)
    }

    /// Create an account and log it in the same way as `login`
    pub async fn register(&self, request: &RegisterRequest, role: Option<&str>) -> Result<Session> {
        let response = self.backend.register(request, role).await?;
        let session = self.establish(response)?;
        tracing::info!(username = %session.username, "Registered and logged in");
        Ok(session)
    }

    /// Clear persisted and in-memory session. Idempotent; no backend call.
    pub fn logout(&self) {
        if self.session().is_some() {
            tracing::info!("Logged out");
        }
        self.discard();
    }

    /// Ask the backend whether the current credential is still accepted.
    ///
    /// Never logs out by itself: a 401 is handled by the HTTP layer, which
    /// the store hears about through its listener.
    pub async fn check_remote(&self) -> Result<bool> {
        if self.session().is_none() {
            return Ok(false);
        }
        self.backend.validate().await
    }

    /// One tick of the validity loop; returns false when the loop should stop
    pub(crate) async fn periodic_check(&self) -> bool {
        let Some(checked) = self.session() else {
            return false;
        };

        match self.backend.validate().await {
            Ok(true) => true,
            Ok(false) => {
                let still_current = self
                    .session()
                    .is_some_and(|current| current.same_identity(&checked));
                if still_current {
                    tracing::warn!(username = %checked.username, "Session rejected by periodic validation, logging out");
                    self.discard();
                }
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Periodic validation could not reach backend, retrying next tick");
                true
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn establish(&self, response: LoginResponse) -> Result<Session> {
        let session = Session::new(
            response.username,
            response.roles.into_iter().map(Role::from),
            response.user_id,
            Credential::new(response.jwt_token),
        );
        save_session(self.storage.as_ref(), &session)?;
        // Later restore() calls are no-ops; one already running sees the
        // generation change and backs off
        let _ = self.restored.set(());
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Clear storage and publish "no session"
    fn discard(&self) {
        if let Err(e) = clear_session(self.storage.as_ref()) {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
        self.publish(None);
    }

    fn publish(&self, session: Option<Session>) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.sync_validity(session.as_ref());
        self.state.send_replace(AuthState {
            loading: false,
            session,
        });
    }

    /// Arm the loop for a new identity, cancel it when the session is gone,
    /// leave it running otherwise
    fn sync_validity(&self, session: Option<&Session>) {
        let mut validity = match self.validity.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match session {
            None => {
                if let Some(armed) = validity.take() {
                    armed.task.cancel();
                }
            }
            Some(session) => {
                let same = validity
                    .as_ref()
                    .is_some_and(|armed| armed.session.same_identity(session) && !armed.task.is_finished());
                if !same {
                    if let Some(armed) = validity.take() {
                        armed.task.cancel();
                    }
                    *validity = Some(ArmedLoop {
                        session: session.clone(),
                        task: ValidityLoop::spawn(self.me.clone(), self.validation_interval),
                    });
                }
            }
        }
    }
}

impl AuthEventListener for SessionStore {
    fn on_auth_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::Unauthorized { path } => {
                if self.session().is_some() {
                    tracing::warn!(%path, "Credential rejected, ending session");
                }
                // Storage was already cleared by the HTTP layer
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.sync_validity(None);
                self.state.send_modify(|state| state.session = None);
            }
        }
    }
}
