use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A capability over a single document.
///
/// `All` is its own kind: granting it does not add Read, Update or Delete
/// entries, and revoking Read does not touch an `All` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Read,
    Update,
    Delete,
    All,
}

impl PermissionKind {
    /// Kinds in the order a grant batch is processed.
    pub const ORDERED: [PermissionKind; 4] = [
        PermissionKind::Read,
        PermissionKind::Update,
        PermissionKind::Delete,
        PermissionKind::All,
    ];

    /// Key used for this kind inside a `users`/`roles` grant object.
    pub fn param_key(&self) -> &'static str {
        match self {
            PermissionKind::Read => "read",
            PermissionKind::Update => "write",
            PermissionKind::Delete => "delete",
            PermissionKind::All => "all",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::Read => write!(f, "read"),
            PermissionKind::Update => write!(f, "update"),
            PermissionKind::Delete => write!(f, "delete"),
            PermissionKind::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Role,
}

impl PrincipalKind {
    /// Users are always processed before roles.
    pub const ORDERED: [PrincipalKind; 2] = [PrincipalKind::User, PrincipalKind::Role];

    pub fn param_key(&self) -> &'static str {
        match self {
            PrincipalKind::User => "users",
            PrincipalKind::Role => "roles",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "user"),
            PrincipalKind::Role => write!(f, "role"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantAction {
    Grant,
    Revoke,
}

impl fmt::Display for GrantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantAction::Grant => write!(f, "grant"),
            GrantAction::Revoke => write!(f, "revoke"),
        }
    }
}

/// One grant or revoke of one permission kind for one principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantStep {
    pub action: GrantAction,
    pub principal: PrincipalKind,
    pub permission: PermissionKind,
    pub name: String,
}

impl GrantStep {
    pub fn new(
        action: GrantAction,
        principal: PrincipalKind,
        permission: PermissionKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            action,
            principal,
            permission,
            name: name.into(),
        }
    }
}

impl fmt::Display for GrantStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} to {} '{}'",
            self.action, self.permission, self.principal, self.name
        )
    }
}

/// External document identifier, always a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(input: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(input).map(Self)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal record reference handed out by the store when an id resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub cluster: u32,
    pub position: u64,
}

impl RecordId {
    pub fn new(cluster: u32, position: u64) -> Self {
        Self { cluster, position }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

/// The principal a command runs on behalf of.
///
/// Authentication happens upstream; by the time a `Caller` exists the session
/// layer has already vouched for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    username: String,
    #[serde(default)]
    roles: Vec<String>,
}

impl Caller {
    pub fn new(username: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    #[inline]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
