use crate::core::{Caller, PermissionKind, PrincipalKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Users and roles holding one permission kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grantees {
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub users: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub roles: BTreeSet<String>,
}

impl Grantees {
    fn set(&self, kind: PrincipalKind) -> &BTreeSet<String> {
        match kind {
            PrincipalKind::User => &self.users,
            PrincipalKind::Role => &self.roles,
        }
    }

    fn set_mut(&mut self, kind: PrincipalKind) -> &mut BTreeSet<String> {
        match kind {
            PrincipalKind::User => &mut self.users,
            PrincipalKind::Role => &mut self.roles,
        }
    }

    fn is_empty(&self) -> bool {
        self.users.is_empty() && self.roles.is_empty()
    }
}

/// Per-document access control list
///
/// Empty entries are pruned on revoke, so granting and then revoking the
/// same permission leaves an ACL equal to the one before the grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Acl {
    #[serde(flatten)]
    grants: BTreeMap<PermissionKind, Grantees>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the entry was not present before
    pub fn grant(&mut self, permission: PermissionKind, kind: PrincipalKind, name: &str) -> bool {
        self.grants
            .entry(permission)
            .or_default()
            .set_mut(kind)
            .insert(name.to_string())
    }

    /// Returns `true` if the entry was present
    pub fn revoke(&mut self, permission: PermissionKind, kind: PrincipalKind, name: &str) -> bool {
        let Some(grantees) = self.grants.get_mut(&permission) else {
            return false;
        };

        let removed = grantees.set_mut(kind).remove(name);
        if grantees.is_empty() {
            self.grants.remove(&permission);
        }
        removed
    }

    /// Whether this exact entry exists; `All` does not imply the others here
    pub fn holds(&self, permission: PermissionKind, kind: PrincipalKind, name: &str) -> bool {
        self.grants
            .get(&permission)
            .is_some_and(|g| g.set(kind).contains(name))
    }

    /// Whether `caller` may exercise `permission`, directly, via a role, or via `All`
    pub fn allows(&self, caller: &Caller, permission: PermissionKind) -> bool {
        [permission, PermissionKind::All].iter().any(|p| {
            self.holds(*p, PrincipalKind::User, caller.username())
                || caller
                    .roles()
                    .iter()
                    .any(|role| self.holds(*p, PrincipalKind::Role, role))
        })
    }

    pub fn grantees(&self, permission: PermissionKind) -> Option<&Grantees> {
        self.grants.get(&permission)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
