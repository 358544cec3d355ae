//! Route table
//!
//! | Path          | Screen            | Access                  |
//! |---------------|-------------------|-------------------------|
//! | `/login`      | login             | public (sessions bounce to their home) |
//! | `/profile`    | profile           | any session             |
//! | `/agent/*`    | agent console     | `AGENT_GUICHET`         |
//! | `/client/*`   | client dashboard  | `CLIENT`                |
//! | anything else | redirect `/login` |                         |

use crate::session::{Role, Session};

pub const LOGIN_PATH: &str = "/login";

/// Screen a route renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Profile,
    AgentConsole,
    ClientDashboard,
}

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Login => "Sign in",
            Screen::Profile => "My profile",
            Screen::AgentConsole => "Customer management",
            Screen::ClientDashboard => "My accounts",
        }
    }
}

/// Who may reach a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reachable without a session
    Public,
    /// Any session; an empty role list means the same
    Roles(&'static [Role]),
}

impl Access {
    /// True if `session` satisfies the route's role requirement
    pub fn permits(&self, session: &Session) -> bool {
        match self {
            Access::Public => true,
            Access::Roles([]) => true,
            Access::Roles(allowed) => session.has_any_role(allowed),
        }
    }
}

const ANY_SESSION: &[Role] = &[];
const AGENT_ONLY: &[Role] = &[Role::AgentGuichet];
const CLIENT_ONLY: &[Role] = &[Role::Client];

/// A matched route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub screen: Screen,
    pub access: Access,
}

/// Outcome of matching a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Route(Route),
    Redirect(&'static str),
}

/// Path without query, fragment or trailing slash
pub fn normalize(location: &str) -> &str {
    let end = location.find(|c| c == '?' || c == '#').unwrap_or(location.len());
    let path = &location[..end];
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn resolve(location: &str) -> Resolved {
    let path = normalize(location);
    let route = |screen, access| Resolved::Route(Route { screen, access });

    if path == LOGIN_PATH {
        route(Screen::Login, Access::Public)
    } else if path == "/profile" {
        route(Screen::Profile, Access::Roles(ANY_SESSION))
    } else if under(path, "/agent") {
        route(Screen::AgentConsole, Access::Roles(AGENT_ONLY))
    } else if under(path, "/client") {
        route(Screen::ClientDashboard, Access::Roles(CLIENT_ONLY))
    } else {
        Resolved::Redirect(LOGIN_PATH)
    }
}
