//! # Identity and Roles
//!
//! The identity provider itself (registration, login, token issuance) lives
//! at the API boundary; the core only consumes an [`Identity`] and checks
//! role capabilities explicitly before touching the ledger or orchestrator.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storefront roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Seller,
    Buyer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Seller => "Seller",
            Role::Buyer => "Buyer",
        }
    }

    /// Parse a role name as submitted at registration
    pub fn from_name(name: &str) -> Option<Role> {
        match name {
            "Admin" => Some(Role::Admin),
            "Seller" => Some(Role::Seller),
            "Buyer" => Some(Role::Buyer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authenticated identity, as established by the API boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }
}

/// Capability check: the identity must hold exactly `required`.
///
/// Called once at the request boundary before invoking ledger or
/// orchestrator operations; the ledger itself stays role-agnostic.
pub fn require_role(identity: &Identity, required: Role) -> StoreResult<&Identity> {
    if identity.role == required {
        Ok(identity)
    } else {
        Err(StoreError::Permission { required })
    }
}

/// Capability check: the identity must hold one of `allowed`.
pub fn require_any<'a>(identity: &'a Identity, allowed: &[Role]) -> StoreResult<&'a Identity> {
    if allowed.contains(&identity.role) {
        Ok(identity)
    } else {
        Err(StoreError::Permission {
            required: allowed.first().copied().unwrap_or(Role::Admin),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buyer() -> Identity {
        Identity::new(Uuid::new_v4(), "alice", Role::Buyer)
    }

    #[test]
    fn test_require_role() {
        let id = buyer();
        assert!(require_role(&id, Role::Buyer).is_ok());

        let err = require_role(&id, Role::Seller).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Permission {
                required: Role::Seller
            }
        ));
    }

    #[test]
    fn test_require_any() {
        let id = Identity::new(Uuid::new_v4(), "bob", Role::Seller);
        assert!(require_any(&id, &[Role::Admin, Role::Seller]).is_ok());
        assert!(require_any(&id, &[Role::Buyer]).is_err());
    }

    #[test]
    fn test_role_from_name() {
        assert_eq!(Role::from_name("Buyer"), Some(Role::Buyer));
        assert_eq!(Role::from_name("buyer"), None);
        assert_eq!(Role::from_name("Root"), None);
    }
}
