//! Authentication events raised by the HTTP layer
//!
//! The client never navigates or touches UI state itself. It raises an
//! event and whoever cares (session store, navigator) subscribes.

/// Event raised by the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The backend rejected the credential on `path` (HTTP 401).
    /// Persisted storage has already been cleared when this is delivered.
    Unauthorized { path: String },
}

/// Subscriber to `AuthEvent`s.
///
/// Called synchronously from the request path, before the failing request
/// returns to its caller. Implementations must not block.
pub trait AuthEventListener: Send + Sync {
    fn on_auth_event(&self, event: &AuthEvent);
}
