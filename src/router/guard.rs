//! Per-navigation access decision

use super::routes::{Access, LOGIN_PATH};
use crate::session::AuthState;

/// Text of the blocking notice shown on a role mismatch
pub const FORBIDDEN_NOTICE: &str =
    "You are not allowed to access this feature. Please contact your administrator.";

/// Guard decision for the current location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// Initial restore in flight; render a placeholder, decide nothing
    Loading,
    /// Re-validation for this navigation in flight
    Validating,
    /// Render the screen
    Authorized,
    /// No session: go to `to`, remembering `from`
    UnauthorizedRedirect { to: &'static str, from: String },
    /// Session lacks the role. `notice` is `Some` only the first time;
    /// `redirect` is the session's home screen.
    Forbidden {
        notice: Option<&'static str>,
        redirect: &'static str,
    },
}

/// Guard for one guarded location
#[derive(Debug)]
pub struct RouteGuard {
    access: Access,
    location: String,
    validating: bool,
    notice_shown: bool,
    pending_redirect: Option<&'static str>,
}

impl RouteGuard {
    pub fn new(access: Access, location: impl Into<String>) -> Self {
        Self {
            access,
            location: location.into(),
            validating: false,
            notice_shown: false,
            pending_redirect: None,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_validating(&mut self, validating: bool) {
        self.validating = validating;
    }

    /// Decide from the store's published state
    pub fn evaluate(&mut self, state: &AuthState) -> GuardState {
        if state.loading {
            return GuardState::Loading;
        }
        if self.validating {
            return GuardState::Validating;
        }

        let Some(session) = &state.session else {
            return GuardState::UnauthorizedRedirect {
                to: LOGIN_PATH,
                from: self.location.clone(),
            };
        };

        if self.access.permits(session) {
            self.pending_redirect = None;
            return GuardState::Authorized;
        }

        let redirect = session.home_path();
        self.pending_redirect = Some(redirect);
        let notice = if self.notice_shown {
            None
        } else {
            self.notice_shown = true;
            Some(FORBIDDEN_NOTICE)
        };
        GuardState::Forbidden { notice, redirect }
    }

    /// Dismiss the forbidden notice; yields where to go next
    pub fn acknowledge(&mut self) -> Option<&'static str> {
        self.pending_redirect.take()
    }
}
