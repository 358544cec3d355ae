//! Backend service functions
//!
//! | Service              | Prefix          |
//! |----------------------|-----------------|
//! | [`AuthService`]        | `/auth`         |
//! | [`ClientService`]      | `/clients`      |
//! | [`AccountService`]     | `/accounts`     |
//! | [`TransactionService`] | `/transactions` |

mod accounts;
mod auth;
mod clients;
pub mod endpoints;
mod transactions;
pub mod types;

pub use accounts::AccountService;
pub use auth::AuthService;
pub use clients::ClientService;
pub use transactions::TransactionService;
pub use types::{
    AccountStatus, BankAccount, ChangePasswordResponse, ClientCreationResponse,
    CreateBankAccountRequest, CreateClientRequest, Customer, LoginResponse, Page, PageRequest,
    RegisterRequest, SortDir, Transaction, TransactionKind, TransferRequest, TransferResponse,
    UserDetails,
};
