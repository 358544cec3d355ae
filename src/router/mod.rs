//! Route table, route guard and navigator

pub mod guard;
mod navigator;
pub mod routes;

pub use guard::{GuardState, RouteGuard, FORBIDDEN_NOTICE};
pub use navigator::{LoginRedirect, Navigation, Navigator};
pub use routes::{resolve, Access, Resolved, Route, Screen, LOGIN_PATH};
