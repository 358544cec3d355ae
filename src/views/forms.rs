//! Form input checks run before anything is sent to the backend
//!
//! Each form turns raw text fields into a typed request or an
//! `Error::Validation` carrying the message to show next to the form.

use crate::api::types::{
    AccountStatus, BankAccount, CreateBankAccountRequest, CreateClientRequest, TransferRequest,
};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum length of a new password
pub const MIN_PASSWORD_LEN: usize = 6;
/// Smallest transferable amount
pub const MIN_TRANSFER: f64 = 0.01;

fn invalid(message: &str) -> Error {
    Error::Validation(message.to_string())
}

fn required(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(invalid(message))
    } else {
        Ok(())
    }
}

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<()> {
        required(&self.username, "Username is required")?;
        required(&self.password, "Password is required")
    }
}

// =============================================================================
// Change password
// =============================================================================

#[derive(Debug, Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl ChangePasswordForm {
    pub fn validate(&self) -> Result<()> {
        if self.current_password.is_empty() {
            return Err(invalid("Please enter your current password"));
        }
        if self.new_password.is_empty() {
            return Err(invalid("Please enter a new password"));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid("The new password must be at least 6 characters long"));
        }
        if self.new_password != self.confirm_password {
            return Err(invalid("Passwords do not match"));
        }
        if self.current_password == self.new_password {
            return Err(invalid("The new password must differ from the current one"));
        }
        Ok(())
    }
}

// =============================================================================
// Transfer
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct TransferForm {
    pub source_rib: String,
    pub destination_rib: String,
    pub amount: String,
    pub motif: String,
}

impl TransferForm {
    /// Check the form against the selected source account
    pub fn validate(&self, source: Option<&BankAccount>) -> Result<TransferRequest> {
        required(&self.source_rib, "Please select a source account")?;
        required(&self.destination_rib, "Destination RIB is required")?;
        required(&self.motif, "Motif is required")?;

        let amount = parse_amount(&self.amount).ok_or_else(|| invalid("Amount must be a number"))?;
        if amount < MIN_TRANSFER {
            return Err(invalid("Amount must be at least 0.01"));
        }

        let source = source
            .filter(|account| account.rib == self.source_rib.trim())
            .ok_or_else(|| invalid("Please select a source account"))?;
        if source.account_status != AccountStatus::Opened {
            return Err(invalid("The bank account must not be blocked or closed"));
        }
        if source.amount < amount {
            return Err(invalid(
                "The account balance must be greater than the transfer amount",
            ));
        }

        Ok(TransferRequest {
            source_rib: self.source_rib.trim().to_string(),
            destination_rib: self.destination_rib.trim().to_string(),
            amount,
            motif: self.motif.trim().to_string(),
        })
    }
}

// =============================================================================
// Create customer
// =============================================================================

#[derive(Debug, Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct CreateCustomerForm {
    pub username: String,
    pub password: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub birthdate: String,
    pub postal_address: String,
    pub identity_ref: String,
}

impl CreateCustomerForm {
    pub fn validate(&self) -> Result<CreateClientRequest> {
        required(&self.username, "Username is required")?;
        required(&self.password, "Password is required")?;
        required(&self.email, "Email is required")?;
        required(&self.firstname, "First name is required")?;
        required(&self.lastname, "Last name is required")?;
        required(&self.birthdate, "Birth date is required")?;
        required(&self.postal_address, "Postal address is required")?;
        required(&self.identity_ref, "Identity reference is required")?;

        if !is_valid_email(&self.email) {
            return Err(invalid("Email address is not valid"));
        }
        let birthdate = NaiveDate::parse_from_str(self.birthdate.trim(), "%Y-%m-%d")
            .map_err(|_| invalid("Birth date must be formatted YYYY-MM-DD"))?;

        Ok(CreateClientRequest {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            email: self.email.trim().to_string(),
            role: "CLIENT".to_string(),
            firstname: self.firstname.trim().to_string(),
            lastname: self.lastname.trim().to_string(),
            birthdate,
            postal_address: self.postal_address.trim().to_string(),
            identity_ref: self.identity_ref.trim().to_string(),
        })
    }
}

// =============================================================================
// Create bank account
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct CreateAccountForm {
    pub rib: String,
    /// Initial balance; blank means zero
    pub amount: String,
}

impl CreateAccountForm {
    pub fn validate(&self, customer_id: i64) -> Result<CreateBankAccountRequest> {
        required(&self.rib, "RIB is required")?;
        let amount = if self.amount.trim().is_empty() {
            0.0
        } else {
            parse_amount(&self.amount).ok_or_else(|| invalid("Initial amount must be a number"))?
        };
        if amount < 0.0 {
            return Err(invalid("Initial amount cannot be negative"));
        }

        Ok(CreateBankAccountRequest {
            rib: self.rib.trim().to_string(),
            amount,
            customer_id,
        })
    }
}
