use crate::core::{PrincipalKind, StoreError, StoreResult};
use std::collections::{BTreeSet, HashMap};

/// A registered user and the roles it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    username: String,
    roles: BTreeSet<String>,
}

impl UserAccount {
    pub fn new(username: String, roles: BTreeSet<String>) -> Self {
        Self { username, roles }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Users and roles that document grants may name
///
/// Not synchronized on its own: the store keeps it behind the same lock as
/// the documents so a grant sees a consistent view of both.
#[derive(Debug, Clone)]
pub struct PrincipalRegistry {
    users: HashMap<String, UserAccount>,
    roles: BTreeSet<String>,
}

impl PrincipalRegistry {
    pub const DEFAULT_ADMIN_USERNAME: &'static str = "admin";
    pub const REGISTERED_ROLE: &'static str = "registered";

    /// Registry with the admin role, the `registered` role and an admin user
    pub fn new(admin_role: &str) -> Self {
        let mut roles = BTreeSet::new();
        roles.insert(admin_role.to_string());
        roles.insert(Self::REGISTERED_ROLE.to_string());

        let mut users = HashMap::new();
        users.insert(
            Self::DEFAULT_ADMIN_USERNAME.to_string(),
            UserAccount::new(
                Self::DEFAULT_ADMIN_USERNAME.to_string(),
                BTreeSet::from([admin_role.to_string()]),
            ),
        );

        Self { users, roles }
    }

    pub fn create_role(&mut self, name: &str) -> StoreResult<()> {
        Self::validate_name(name)?;

        if !self.roles.insert(name.to_string()) {
            return Err(StoreError::DuplicatePrincipal(format!("role '{}'", name)));
        }
        Ok(())
    }

    pub fn create_user(&mut self, username: &str, roles: &[String]) -> StoreResult<()> {
        Self::validate_name(username)?;

        if self.users.contains_key(username) {
            return Err(StoreError::DuplicatePrincipal(format!("user '{}'", username)));
        }

        if let Some(missing) = roles.iter().find(|r| !self.roles.contains(*r)) {
            return Err(StoreError::RoleNotFound(missing.clone()));
        }

        let account = UserAccount::new(username.to_string(), roles.iter().cloned().collect());
        self.users.insert(username.to_string(), account);
        Ok(())
    }

    pub fn get_user(&self, username: &str) -> StoreResult<&UserAccount> {
        self.users
            .get(username)
            .ok_or_else(|| StoreError::UserNotFound(username.to_string()))
    }

    pub fn user_exists(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn role_exists(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Fail with the kind-specific not-found error when `name` is unknown
    pub fn ensure_exists(&self, kind: PrincipalKind, name: &str) -> StoreResult<()> {
        match kind {
            PrincipalKind::User if !self.user_exists(name) => {
                Err(StoreError::UserNotFound(name.to_string()))
            }
            PrincipalKind::Role if !self.role_exists(name) => {
                Err(StoreError::RoleNotFound(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn validate_name(name: &str) -> StoreResult<()> {
        if name.is_empty() {
            return Err(StoreError::InvalidPrincipal("Name cannot be empty".into()));
        }

        if name.len() > 50 {
            return Err(StoreError::InvalidPrincipal(
                "Name too long (max 50 characters)".into(),
            ));
        }

        if name.chars().any(char::is_whitespace) {
            return Err(StoreError::InvalidPrincipal(format!(
                "Name cannot contain whitespace: '{}'",
                name
            )));
        }

        Ok(())
    }
}

impl Default for PrincipalRegistry {
    fn default() -> Self {
        Self::new(crate::storage::StoreConfig::DEFAULT_ADMIN_ROLE)
    }
}
