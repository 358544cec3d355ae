//! Top-level navigation
//!
//! Owns the current location, runs the route guard for each navigation and
//! turns 401 events raised by the HTTP layer into a redirect to `/login`.

use super::guard::{GuardState, RouteGuard};
use super::routes::{normalize, resolve, Access, Resolved, Screen, LOGIN_PATH};
use crate::error::{Error, Result};
use crate::http::{AuthEvent, AuthEventListener};
use crate::session::SessionStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Redirect hops allowed for a single navigation
const MAX_HOPS: usize = 8;

/// Listener recording 401 events for the navigator to act on
#[derive(Debug, Default)]
pub struct LoginRedirect {
    pending: AtomicUsize,
    received: AtomicUsize,
}

impl LoginRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume pending events; returns how many there were
    pub fn take(&self) -> usize {
        self.pending.swap(0, Ordering::SeqCst)
    }

    /// Total events received
    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }
}

impl AuthEventListener for LoginRedirect {
    fn on_auth_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::Unauthorized { .. } => {
                self.pending.fetch_add(1, Ordering::SeqCst);
                self.received.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

/// Result of a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The screen may render
    Rendered { screen: Screen, location: String },
    /// Role mismatch; show `notice` (first time only), then `acknowledge`
    Forbidden {
        notice: Option<&'static str>,
        redirect: &'static str,
    },
}

pub struct Navigator {
    store: Arc<SessionStore>,
    redirects: Arc<LoginRedirect>,
    location: String,
    guard: Option<RouteGuard>,
    return_to: Option<String>,
    history: Vec<String>,
}

impl Navigator {
    pub fn new(store: Arc<SessionStore>, redirects: Arc<LoginRedirect>) -> Self {
        Self {
            store,
            redirects,
            location: "/".to_string(),
            guard: None,
            return_to: None,
            history: Vec::new(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Every location entered, in order
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Location an unauthorized redirect came from
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }

    /// Navigate to `to`, re-validating the session once for the change
    pub async fn navigate(&mut self, to: &str) -> Result<Navigation> {
        self.enter(to);
        self.settle(true).await
    }

    /// Re-evaluate the current location after a store change (no re-validation)
    pub async fn refresh(&mut self) -> Result<Navigation> {
        self.settle(false).await
    }

    /// Dismiss a forbidden notice and go to the session's home screen
    pub async fn acknowledge(&mut self) -> Result<Navigation> {
        let target = self
            .guard
            .as_mut()
            .and_then(RouteGuard::acknowledge)
            .ok_or_else(|| Error::Session("No notice to acknowledge".to_string()))?;
        self.navigate(target).await
    }

    /// Leave the login screen after a successful login.
    ///
    /// Goes back to the remembered location when the new session may see
    /// it, otherwise to the session's home screen.
    pub async fn after_login(&mut self) -> Result<Navigation> {
        let session = self
            .store
            .session()
            .ok_or_else(|| Error::Session("Not logged in".to_string()))?;

        let target = self
            .return_to
            .take()
            .filter(|from| match resolve(from) {
                Resolved::Route(route) => {
                    route.screen != Screen::Login && route.access.permits(&session)
                }
                Resolved::Redirect(_) => false,
            })
            .unwrap_or_else(|| session.home_path().to_string());
        self.navigate(&target).await
    }

    fn enter(&mut self, to: &str) {
        tracing::debug!(from = %self.location, to, "Navigating");
        self.location = to.to_string();
        self.history.push(self.location.clone());
        self.guard = None;
    }

    /// Pending 401s move us to the login screen once, whatever their number
    fn apply_auth_redirect(&mut self) {
        if self.redirects.take() > 0 && normalize(&self.location) != LOGIN_PATH {
            tracing::info!(from = %self.location, "Session ended, returning to login");
            self.return_to = Some(self.location.clone());
            self.enter(LOGIN_PATH);
        }
    }

    async fn settle(&mut self, mut revalidate: bool) -> Result<Navigation> {
        for _ in 0..MAX_HOPS {
            self.apply_auth_redirect();

            let state = self.store.current();
            if state.loading {
                // Placeholder until the initial restore completes; the
                // restore already asked the backend for this navigation
                revalidate = false;
                self.store.restore().await;
                continue;
            }

            let route = match resolve(&self.location) {
                Resolved::Redirect(to) => {
                    self.enter(to);
                    continue;
                }
                Resolved::Route(route) => route,
            };

            if route.access == Access::Public {
                match &state.session {
                    Some(session) if session.home_path() != LOGIN_PATH => {
                        self.enter(session.home_path());
                        revalidate = true;
                        continue;
                    }
                    _ => {
                        return Ok(Navigation::Rendered {
                            screen: route.screen,
                            location: self.location.clone(),
                        })
                    }
                }
            }

            let location = self.location.clone();
            let guard = self
                .guard
                .get_or_insert_with(|| RouteGuard::new(route.access, location));

            if revalidate && state.session.is_some() {
                revalidate = false;
                guard.set_validating(true);
                let outcome = self.store.check_remote().await;
                guard.set_validating(false);
                match outcome {
                    Ok(true) => {}
                    Ok(false) => tracing::debug!("Navigation re-validation rejected"),
                    Err(e) => tracing::warn!(error = %e, "Navigation re-validation failed"),
                }
                continue;
            }

            match guard.evaluate(&state) {
                GuardState::Authorized => {
                    return Ok(Navigation::Rendered {
                        screen: route.screen,
                        location: self.location.clone(),
                    })
                }
                GuardState::UnauthorizedRedirect { to, from } => {
                    self.return_to = Some(from);
                    self.enter(to);
                }
                GuardState::Forbidden { notice, redirect } => {
                    return Ok(Navigation::Forbidden { notice, redirect })
                }
                GuardState::Loading | GuardState::Validating => {}
            }
        }

        Err(Error::Session(format!(
            "Too many redirects while navigating to {}",
            self.location
        )))
    }
}
