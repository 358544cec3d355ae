//! Profile screen: account details and password change

use super::forms::ChangePasswordForm;
use crate::api::types::UserDetails;
use crate::api::{AuthService, ClientService};
use crate::error::Result;
use crate::session::Session;

pub const PASSWORD_CHANGED: &str = "Password changed successfully";
const CHANGE_FAILED: &str = "Could not change the password. Check your current password.";

pub struct ProfileView {
    auth: AuthService,
    clients: ClientService,
    session: Session,
    details: Option<UserDetails>,
    details_error: Option<String>,
    error: Option<String>,
    success: Option<&'static str>,
}

impl ProfileView {
    pub fn new(auth: AuthService, clients: ClientService, session: Session) -> Self {
        Self {
            auth,
            clients,
            session,
            details: None,
            details_error: None,
            error: None,
            success: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn details(&self) -> Option<&UserDetails> {
        self.details.as_ref()
    }

    pub fn details_error(&self) -> Option<&str> {
        self.details_error.as_deref()
    }

    /// Inline error of the password form
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> Option<&'static str> {
        self.success
    }

    /// Fetch the user's details; a failure only affects the details panel
    pub async fn load(&mut self) {
        match self.clients.user_details(self.session.user_id).await {
            Ok(details) => {
                self.details = Some(details);
                self.details_error = None;
            }
            Err(e) => {
                tracing::warn!(user_id = self.session.user_id, error = %e, "Failed to load user details");
                self.details_error = Some("Failed to load user details".to_string());
            }
        }
    }

    /// Check and submit a password change; the form is cleared on success
    pub async fn change_password(&mut self, form: &mut ChangePasswordForm) -> Result<()> {
        self.error = None;
        self.success = None;

        if let Err(e) = form.validate() {
            self.error = Some(e.user_message(CHANGE_FAILED));
            return Err(e);
        }

        match self
            .auth
            .change_password(&form.current_password, &form.new_password)
            .await
        {
            Ok(_) => {
                tracing::info!(username = %self.session.username, "Password changed");
                self.success = Some(PASSWORD_CHANGED);
                *form = ChangePasswordForm::default();
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.user_message(CHANGE_FAILED));
                Err(e)
            }
        }
    }
}
