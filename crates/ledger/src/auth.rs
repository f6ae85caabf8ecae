use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheSnapshot;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    SubAdmin,
    Unauthenticated,
}

impl Role {
    pub fn is_authenticated(self) -> bool {
        self != Role::Unauthenticated
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("invalid or missing password")]
    Unauthenticated,
    #[error("super-admin privileges required")]
    Forbidden,
}

/// Classifies credentials against the static super-admin secret and the
/// sub-admin secret held in the current cache snapshot.
#[derive(Clone)]
pub struct AuthResolver {
    admin_password: String,
}

impl AuthResolver {
    pub fn new(admin_password: impl Into<String>) -> Self {
        Self {
            admin_password: admin_password.into(),
        }
    }

    pub fn resolve(&self, credential: Option<&str>, snapshot: &CacheSnapshot) -> Role {
        let Some(credential) = credential else {
            return Role::Unauthenticated;
        };
        if !self.admin_password.is_empty() && secrets_match(credential, &self.admin_password) {
            return Role::SuperAdmin;
        }
        match snapshot.sub_password() {
            Some(secret) if secrets_match(credential, secret) => Role::SubAdmin,
            _ => Role::Unauthenticated,
        }
    }
}

pub fn require_authenticated(role: Role) -> Result<Role, AccessError> {
    if role.is_authenticated() {
        Ok(role)
    } else {
        Err(AccessError::Unauthenticated)
    }
}

/// Only the top tier passes. A recognised sub-admin is forbidden rather than
/// unauthenticated.
pub fn require_super_admin(role: Role) -> Result<(), AccessError> {
    match role {
        Role::SuperAdmin => Ok(()),
        Role::SubAdmin => Err(AccessError::Forbidden),
        Role::Unauthenticated => Err(AccessError::Unauthenticated),
    }
}

/// Constant-time for equal-length inputs; a length mismatch returns early.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = presented.as_bytes();
    let b = expected.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
