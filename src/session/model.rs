//! Session, role and published auth state

use super::credential::Credential;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Access-level tag gating screen access
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Bank staff (`AGENT_GUICHET`)
    AgentGuichet,
    /// Account holder (`CLIENT`)
    Client,
    /// Any role the backend issues that this portal has no screen for
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::AgentGuichet => "AGENT_GUICHET",
            Role::Client => "CLIENT",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        match name.as_str() {
            "AGENT_GUICHET" => Role::AgentGuichet,
            "CLIENT" => Role::Client,
            _ => Role::Other(name),
        }
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role::from(name.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Home screen for a role set: agents first, then clients, else login
pub fn home_path(roles: &BTreeSet<Role>) -> &'static str {
    if roles.contains(&Role::AgentGuichet) {
        "/agent"
    } else if roles.contains(&Role::Client) {
        "/client"
    } else {
        "/login"
    }
}

/// Who is currently logged in.
///
/// Serialized form is the persisted profile entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    pub user_id: i64,
    pub token: Credential,
}

impl Session {
    pub fn new(
        username: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
        user_id: i64,
        token: Credential,
    ) -> Self {
        Self {
            username: username.into(),
            roles: roles.into_iter().collect(),
            user_id,
            token,
        }
    }

    /// True if the session holds at least one of `allowed`
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.iter().any(|role| self.roles.contains(role))
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Home screen for this session's roles
    pub fn home_path(&self) -> &'static str {
        home_path(&self.roles)
    }

    /// Same login: user, username and credential all match
    pub fn same_identity(&self, other: &Session) -> bool {
        self.user_id == other.user_id
            && self.username == other.username
            && self.token == other.token
    }
}

/// State published by the session store
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    /// Initial restore still in flight
    pub loading: bool,
    /// Current session, if any
    pub session: Option<Session>,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            session: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}
