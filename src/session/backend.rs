//! Authentication calls the session store depends on

use crate::api::types::{LoginResponse, RegisterRequest};
use crate::error::Result;
use async_trait::async_trait;

/// Backend operations behind the session lifecycle
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange username/password for a credential
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse>;

    /// Create a user and log it in
    async fn register(&self, request: &RegisterRequest, role: Option<&str>) -> Result<LoginResponse>;

    /// `Ok(true)` if the stored credential is still accepted, `Ok(false)` if
    /// rejected, `Err` if the backend could not be asked
    async fn validate(&self) -> Result<bool>;
}
