//! # Identity Provider
//!
//! Registration, login, and signed identity tokens. The core never sees
//! any of this — it only receives an [`Identity`] after the extractor has
//! verified the bearer token, and role checks happen explicitly per
//! handler via `require_role`.
//!
//! Tokens are HMAC-SHA256 signed claims with a 30-minute default expiry,
//! carried in the `Authorization: Bearer` header.

use crate::handlers::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use store_core::{Identity, Role, StoreError, StoreResult};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// User directory
// =============================================================================

/// A registered user
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    password_digest: String,
    salt: String,
}

/// In-process registry of users, keyed by username
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, UserRecord>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user with the given role
    pub fn register(&mut self, username: &str, password: &str, role: Role) -> StoreResult<Identity> {
        let username = username.trim();
        if username.is_empty() {
            return Err(StoreError::Validation("username is required".into()));
        }
        if password.len() < 8 {
            return Err(StoreError::Validation(
                "password must be at least 8 characters".into(),
            ));
        }
        if self.users.contains_key(username) {
            return Err(StoreError::Validation(format!(
                "username already taken: {}",
                username
            )));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            role,
            password_digest: digest_password(&salt, password),
            salt,
        };
        let identity = Identity::new(record.id, username, role);
        self.users.insert(username.to_string(), record);
        Ok(identity)
    }

    /// Check credentials; `None` for unknown users or wrong passwords
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Identity> {
        let record = self.users.get(username.trim())?;
        let candidate = digest_password(&record.salt, password);
        if candidate == record.password_digest {
            Some(Identity::new(record.id, &record.username, record.role))
        } else {
            None
        }
    }
}

fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Signed tokens
// =============================================================================

/// Claims carried by an identity token
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    user_id: Uuid,
    username: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Mints and verifies signed identity tokens
#[derive(Debug, Clone)]
pub struct TokenSigner {
    secret: String,
    ttl_minutes: i64,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_minutes,
        }
    }

    /// Issue a token for an authenticated identity
    pub fn mint(&self, identity: &Identity) -> StoreResult<String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            user_id: identity.user_id,
            username: identity.username.clone(),
            role: identity.role,
            iat: now,
            exp: now + self.ttl_minutes * 60,
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let encoded = hex::encode(&payload);
        Ok(format!("{}.{}", encoded, self.sign(&encoded)))
    }

    /// Verify a token and recover the identity. Tampered, malformed, or
    /// expired tokens all fail the same way.
    pub fn verify(&self, token: &str) -> StoreResult<Identity> {
        let denied = || StoreError::Permission {
            required: Role::Buyer,
        };

        let (encoded, signature) = token.split_once('.').ok_or_else(denied)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(encoded.as_bytes());
        let sig_bytes = hex::decode(signature).map_err(|_| denied())?;
        mac.verify_slice(&sig_bytes).map_err(|_| denied())?;

        let payload = hex::decode(encoded).map_err(|_| denied())?;
        let claims: TokenClaims = serde_json::from_slice(&payload).map_err(|_| denied())?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(denied());
        }

        Ok(Identity::new(claims.user_id, claims.username, claims.role))
    }

    fn sign(&self, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller, extracted from the `Authorization` header
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError(StoreError::Permission {
                required: Role::Buyer,
            }))?;

        let identity = state.tokens.verify(token).map_err(ApiError)?;
        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", 30)
    }

    #[test]
    fn test_register_and_authenticate() {
        let mut users = UserDirectory::new();
        let identity = users.register("alice", "hunter2hunter2", Role::Buyer).unwrap();
        assert_eq!(identity.role, Role::Buyer);

        let authed = users.authenticate("alice", "hunter2hunter2").unwrap();
        assert_eq!(authed.user_id, identity.user_id);

        assert!(users.authenticate("alice", "wrong-password").is_none());
        assert!(users.authenticate("mallory", "hunter2hunter2").is_none());
    }

    #[test]
    fn test_register_validation() {
        let mut users = UserDirectory::new();
        assert!(users.register("", "hunter2hunter2", Role::Buyer).is_err());
        assert!(users.register("bob", "short", Role::Buyer).is_err());

        users.register("bob", "hunter2hunter2", Role::Seller).unwrap();
        let err = users
            .register("bob", "hunter2hunter2", Role::Buyer)
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_token_roundtrip() {
        let signer = signer();
        let identity = Identity::new(Uuid::new_v4(), "alice", Role::Buyer);

        let token = signer.mint(&identity).unwrap();
        let verified = signer.verify(&token).unwrap();

        assert_eq!(verified.user_id, identity.user_id);
        assert_eq!(verified.username, "alice");
        assert_eq!(verified.role, Role::Buyer);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let signer = signer();
        let identity = Identity::new(Uuid::new_v4(), "alice", Role::Buyer);
        let token = signer.mint(&identity).unwrap();

        let mut tampered = token.clone();
        tampered.replace_range(0..2, "ff");
        assert!(signer.verify(&tampered).is_err());

        assert!(signer.verify("not-a-token").is_err());
        assert!(signer.verify("").is_err());

        // a token signed with a different secret never verifies
        let other = TokenSigner::new("other-secret", 30);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = TokenSigner::new("test-secret", -1);
        let identity = Identity::new(Uuid::new_v4(), "alice", Role::Buyer);
        let token = signer.mint(&identity).unwrap();
        assert!(signer.verify(&token).is_err());
    }
}
