//! Screen state behind the routed screens
//!
//! Views own the data a screen shows (lists, selection, inline errors) and
//! run its backend calls. They never touch the session directly: a 401 seen
//! by any call reaches the session through the HTTP client's listeners.

mod console;
mod dashboard;
pub mod forms;
pub mod pagination;
mod profile;
mod sequence;

pub use console::AgentConsole;
pub use dashboard::{ClientDashboard, TRANSFER_NOT_REFRESHED};
pub use forms::{
    ChangePasswordForm, CreateAccountForm, CreateCustomerForm, LoginForm, TransferForm,
};
pub use pagination::{page_window, ListState, PageItem, PAGE_SIZES};
pub use profile::{ProfileView, PASSWORD_CHANGED};
pub use sequence::{RequestSequencer, Ticket};
