//! Backend wire types
//!
//! JSON is camelCase on the wire. Response shapes that vary between backend
//! versions are normalized here, once, so callers see a single field.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// =============================================================================
// Authentication
// =============================================================================

/// POST /auth/login body
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful login or registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub user_id: i64,
    pub jwt_token: String,
}

/// POST /auth/register body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// POST /auth/change-password body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: bool,
}

// =============================================================================
// Customers
// =============================================================================

/// Customer record (listing entries also carry account hints)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub postal_address: Option<String>,
    #[serde(default)]
    pub identity_ref: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub rib: Option<String>,
    #[serde(default)]
    pub has_bank_account: bool,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }

    /// Two-letter avatar initials
    pub fn initials(&self) -> String {
        self.firstname
            .chars()
            .next()
            .into_iter()
            .chain(self.lastname.chars().next())
            .collect()
    }
}

/// GET /clients/user/{userId}/details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub postal_address: Option<String>,
    #[serde(default)]
    pub identity_ref: Option<String>,
}

/// POST /clients/create-client body (user and customer fields together)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: String,
    pub firstname: String,
    pub lastname: String,
    pub birthdate: NaiveDate,
    pub postal_address: String,
    pub identity_ref: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCreationResponse {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Accounts
// =============================================================================

/// Bank account status; unknown values read as `Suspended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Opened,
    Closed,
    #[serde(other)]
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Opened => "OPENED",
            AccountStatus::Closed => "CLOSED",
            AccountStatus::Suspended => "SUSPENDED",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            AccountStatus::Opened => "Open",
            AccountStatus::Closed => "Closed",
            AccountStatus::Suspended => "Blocked",
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPENED" => Ok(AccountStatus::Opened),
            "CLOSED" => Ok(AccountStatus::Closed),
            "SUSPENDED" => Ok(AccountStatus::Suspended),
            other => Err(crate::Error::Validation(format!(
                "Unknown account status '{}': expected OPENED, CLOSED or SUSPENDED",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: i64,
    pub rib: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, deserialize_with = "de_datetime")]
    pub created_at: Option<NaiveDateTime>,
    pub account_status: AccountStatus,
    #[serde(default)]
    pub customer_id: Option<i64>,
}

/// POST /accounts body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBankAccountRequest {
    pub rib: String,
    pub amount: f64,
    pub customer_id: i64,
}

// =============================================================================
// Transactions
// =============================================================================

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Credit,
    Debit,
}

/// Normalized transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTransaction")]
pub struct Transaction {
    pub id: Option<i64>,
    pub rib: Option<String>,
    pub kind: TransactionKind,
    pub amount: f64,
    pub label: String,
    pub date: Option<NaiveDateTime>,
    pub related_rib: Option<String>,
    pub motif: Option<String>,
}

impl Transaction {
    pub fn is_credit(&self) -> bool {
        self.kind == TransactionKind::Credit
    }

    /// Amount with its direction applied
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Credit => self.amount,
            TransactionKind::Debit => -self.amount,
        }
    }
}

/// Label used when the backend sends neither description nor motif
pub const DEFAULT_TRANSACTION_LABEL: &str = "Bank operation";

/// Every field name the transaction services have used
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    rib: Option<String>,
    #[serde(default)]
    transaction_type: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    operation_type: Option<String>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    motif: Option<String>,
    #[serde(default, deserialize_with = "de_datetime")]
    transaction_date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "de_datetime")]
    date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "de_datetime")]
    created_at: Option<NaiveDateTime>,
    #[serde(default)]
    related_rib: Option<String>,
}

impl From<RawTransaction> for Transaction {
    fn from(raw: RawTransaction) -> Self {
        let is_credit = [&raw.transaction_type, &raw.kind, &raw.operation_type]
            .iter()
            .any(|field| field.as_deref() == Some("CREDIT"));

        let label = [&raw.description, &raw.motif]
            .iter()
            .filter_map(|field| field.as_deref())
            .find(|text| !text.is_empty())
            .unwrap_or(DEFAULT_TRANSACTION_LABEL)
            .to_string();

        Self {
            id: raw.id,
            rib: raw.rib,
            kind: if is_credit {
                TransactionKind::Credit
            } else {
                TransactionKind::Debit
            },
            amount: raw.amount.unwrap_or(0.0),
            label,
            date: raw.transaction_date.or(raw.date).or(raw.created_at),
            related_rib: raw.related_rib,
            motif: raw.motif,
        }
    }
}

/// POST /transactions/transfer body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub source_rib: String,
    pub destination_rib: String,
    pub amount: f64,
    pub motif: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub debit_transaction: Option<Transaction>,
    #[serde(default)]
    pub credit_transaction: Option<Transaction>,
    #[serde(default)]
    pub new_source_balance: Option<f64>,
    #[serde(default)]
    pub new_destination_balance: Option<f64>,
}

// =============================================================================
// Pagination
// =============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

impl std::str::FromStr for SortDir {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDir::Asc),
            "DESC" => Ok(SortDir::Desc),
            other => Err(crate::Error::Validation(format!(
                "Unknown sort direction '{}': expected ASC or DESC",
                other
            ))),
        }
    }
}

/// Page, size and sort of a listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort_by: String,
    pub sort_dir: SortDir,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            sort_by: "id".to_string(),
            sort_dir: SortDir::Asc,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            ..Default::default()
        }
    }

    /// `page`, `size`, `sortBy`, `sortDir` query pairs
    pub fn sorted_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
            ("sortBy", self.sort_by.clone()),
            ("sortDir", self.sort_dir.as_str().to_string()),
        ]
    }

    /// `page`, `size` query pairs (transaction listings are not sortable)
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
        ]
    }
}

/// Paginated envelope as sent by the backend
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct RawPage<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub pageable: Option<Pageable>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pageable {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Fill page number/size from the envelope, falling back to the request
    pub fn from_raw(raw: RawPage<T>, request: &PageRequest) -> Self {
        let pageable = raw.pageable.as_ref();
        Self {
            page_number: pageable
                .and_then(|p| p.page_number)
                .unwrap_or(request.page),
            page_size: pageable
                .and_then(|p| p.page_size)
                .unwrap_or(request.size),
            content: raw.content,
            total_elements: raw.total_elements,
            total_pages: raw.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Accept `2024-01-05T10:30:00[.fff]`, RFC 3339, or a bare date
fn de_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_datetime))
}

pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
