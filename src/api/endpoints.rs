//! Backend paths, relative to the configured base URL

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const VALIDATE: &str = "/auth/validate";
pub const CHANGE_PASSWORD: &str = "/auth/change-password";

pub fn register_with_role(role: &str) -> String {
    format!("/auth/register/{}", role)
}

pub fn delete_user(username: &str) -> String {
    format!("/auth/users/{}", username)
}

pub const CLIENTS_CREATE: &str = "/clients/create-client";
pub const CLIENTS_ALL: &str = "/clients";
pub const CLIENTS_PAGINATED: &str = "/clients/clients";

pub fn client_by_id(id: i64) -> String {
    format!("/clients/{}", id)
}

/// Also the DELETE path for a customer
pub fn client_by_user_id(user_id: i64) -> String {
    format!("/clients/user/{}", user_id)
}

pub fn user_details(user_id: i64) -> String {
    format!("/clients/user/{}/details", user_id)
}

pub const ACCOUNTS: &str = "/accounts";

/// Also the DELETE path for an account
pub fn account_by_id(id: i64) -> String {
    format!("/accounts/{}", id)
}

pub fn account_by_rib(rib: &str) -> String {
    format!("/accounts/rib/{}", rib)
}

pub fn accounts_by_customer(customer_id: i64) -> String {
    format!("/accounts/customer/{}", customer_id)
}

pub fn account_status(id: i64) -> String {
    format!("/accounts/{}/status", id)
}

pub const TRANSFER: &str = "/transactions/transfer";

pub fn transactions_by_account(account_id: i64) -> String {
    format!("/transactions/account/{}", account_id)
}

pub fn transactions_by_rib(rib: &str) -> String {
    format!("/transactions/rib/{}", rib)
}
