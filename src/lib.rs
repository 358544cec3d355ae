//! Bank portal client
//!
//! Session lifecycle, role-gated navigation and self-service banking
//! screens on top of the bank's REST backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Navigator                            │
//! │   route table ─▶ route guard ─▶ screen (views::*)             │
//! └───────────────┬──────────────────────────────┬───────────────┘
//!                 │ restore / check               │ backend calls
//! ┌───────────────▼───────────────┐   ┌──────────▼───────────────┐
//! │         SessionStore          │   │   AuthService, Client-,   │
//! │  AuthState (watch), restore,  │   │   Account-, Transaction-  │
//! │  login/logout, ValidityLoop   │   │   Service                 │
//! └───────────────▲───────────────┘   └──────────┬───────────────┘
//!                 │ AuthEvent::Unauthorized       │
//! ┌───────────────┴───────────────────────────────▼──────────────┐
//! │   ApiClient: bearer credential, 401 ⇒ clear storage + notify  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`]: typed backend services and wire types
//! - [`http`]: request dispatch and 401 events
//! - [`session`]: credential, persisted session and the session store
//! - [`router`]: route table, guard and navigator
//! - [`views`]: screen state for the agent console, client dashboard and profile
//! - [`app`]: wiring of all of the above from a [`PortalConfig`]
//! - [`config`]: configuration management

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod session;
pub mod views;

#[cfg(test)]
mod testing;

pub use app::{PortalApp, PortalBuilder};
pub use config::PortalConfig;
pub use error::{Error, Result};
