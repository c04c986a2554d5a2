//! Ownership and role authorization.
//!
//! The authorizer is a pair of pure predicates over an explicit
//! [`Principal`] and the current entity state. It never errors; callers
//! treat `false` as a hard stop and reject the request before any store is
//! touched.

use serde::{Deserialize, Serialize};

use crate::models::Owned;

/// The authenticated caller: identity plus group memberships.
///
/// Threaded explicitly through every service call rather than looked up from
/// ambient context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }

    /// The unauthenticated principal. Holds no groups, matches no owner.
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            groups: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

/// Role classes gating each operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleClass {
    Channel,
    Property,
    Tag,
    Admin,
}

impl std::fmt::Display for RoleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel => write!(f, "channel"),
            Self::Property => write!(f, "property"),
            Self::Tag => write!(f, "tag"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Maps group memberships to role classes and decides per-entity ownership.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationService {
    channel_groups: Vec<String>,
    property_groups: Vec<String>,
    tag_groups: Vec<String>,
    admin_groups: Vec<String>,
}

impl AuthorizationService {
    pub fn new(
        channel_groups: Vec<String>,
        property_groups: Vec<String>,
        tag_groups: Vec<String>,
        admin_groups: Vec<String>,
    ) -> Self {
        Self {
            channel_groups,
            property_groups,
            tag_groups,
            admin_groups,
        }
    }

    /// True iff the principal holds a group membership mapped to the
    /// required role class. Admin groups satisfy every class.
    pub fn is_authorized_role(&self, principal: &Principal, role: RoleClass) -> bool {
        if self.in_any(principal, &self.admin_groups) {
            return true;
        }
        let groups = match role {
            RoleClass::Channel => &self.channel_groups,
            RoleClass::Property => &self.property_groups,
            RoleClass::Tag => &self.tag_groups,
            RoleClass::Admin => return false,
        };
        self.in_any(principal, groups)
    }

    /// True iff the principal's identity or one of its groups equals the
    /// entity owner, or the principal holds an admin group.
    pub fn is_authorized_owner<E: Owned>(&self, principal: &Principal, entity: &E) -> bool {
        if self.in_any(principal, &self.admin_groups) {
            return true;
        }
        let owner = entity.owner();
        if owner.is_empty() {
            return false;
        }
        principal.name == owner || principal.groups.iter().any(|g| g == owner)
    }

    fn in_any(&self, principal: &Principal, groups: &[String]) -> bool {
        groups.iter().any(|g| principal.groups.contains(g))
    }
}
