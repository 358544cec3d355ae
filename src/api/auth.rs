//! Authentication service

use super::endpoints;
use super::types::{
    ChangePasswordRequest, ChangePasswordResponse, LoginRequest, LoginResponse, RegisterRequest,
};
use crate::error::{Error, Result};
use crate::http::{ApiClient, Auth};
use crate::session::AuthBackend;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::sync::Arc;

/// Login, registration, validation and account-level user operations
#[derive(Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token. Sent anonymously: a rejected login
    /// never ends an existing session.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        self.client
            .post_anonymous(endpoints::LOGIN, &LoginRequest { username, password })
            .await
    }

    /// Create a user, optionally with an explicit role
    pub async fn register(
        &self,
        request: &RegisterRequest,
        role: Option<&str>,
    ) -> Result<LoginResponse> {
        let path = match role {
            Some(role) => endpoints::register_with_role(role),
            None => endpoints::REGISTER.to_string(),
        };
        self.client.post_anonymous(&path, request).await
    }

    /// Ask the backend whether the stored credential is still accepted.
    ///
    /// `Ok(true)` only for HTTP 200. Any other answer is `Ok(false)`;
    /// `Err` means the backend could not be reached.
    pub async fn validate(&self) -> Result<bool> {
        match self
            .client
            .execute(Method::GET, endpoints::VALIDATE, &[], None, Auth::Bearer)
            .await
        {
            Ok(response) => Ok(response.status == StatusCode::OK),
            Err(Error::Unauthorized) | Err(Error::Backend { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<ChangePasswordResponse> {
        let response: Option<ChangePasswordResponse> = self
            .client
            .post(
                endpoints::CHANGE_PASSWORD,
                &ChangePasswordRequest {
                    current_password,
                    new_password,
                },
            )
            .await?;
        Ok(response.unwrap_or_default())
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        self.client.delete(&endpoints::delete_user(username)).await
    }
}

#[async_trait]
impl AuthBackend for AuthService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        AuthService::login(self, username, password).await
    }

    async fn register(&self, request: &RegisterRequest, role: Option<&str>) -> Result<LoginResponse> {
        AuthService::register(self, request, role).await
    }

    async fn validate(&self) -> Result<bool> {
        AuthService::validate(self).await
    }
}
