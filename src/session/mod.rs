//! Session lifecycle
//!
//! - [`Credential`]: bearer token and its local expiry check
//! - [`Session`] / [`Role`]: who is logged in and what they may reach
//! - [`storage`]: the two persisted entries (`token`, `user`)
//! - [`SessionStore`]: restore, login, logout, published [`AuthState`]
//! - [`ValidityLoop`]: periodic remote re-validation owned by the store

mod backend;
mod credential;
mod model;
pub mod storage;
mod store;
mod validity;

pub use backend::AuthBackend;
pub use credential::{mask_token, Credential};
pub use model::{home_path, AuthState, Role, Session};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::SessionStore;
pub use validity::ValidityLoop;
