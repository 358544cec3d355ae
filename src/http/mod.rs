//! HTTP client wrapper for the backend services
//!
//! Attaches the stored bearer credential to every request and turns a 401
//! into a process-wide `AuthEvent` instead of a direct navigation.

mod client;
mod events;

pub use client::{extract_message, ApiClient, ApiResponse, Auth};
pub use events::{AuthEvent, AuthEventListener};
