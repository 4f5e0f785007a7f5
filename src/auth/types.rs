//! Auth domain types: roles, principals, credentials and token claims.

use crate::error::AppError;
use crate::query::{Record, Scalar};
use crate::resource::FieldKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Normal,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Normal, Role::Admin, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("role must be one of NORMAL, ADMIN, SUPER_ADMIN, got {:?}", s)))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part of a user the policy engine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
    pub enabled: bool,
}

impl Principal {
    pub fn from_record(record: &Record) -> Result<Self, AppError> {
        let id = record
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| AppError::Internal("user record without id".into()))?;
        let role = record
            .get("role")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Internal(format!("user {} has no role", id)))?
            .parse()?;
        let enabled = record.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false);
        Ok(Principal { id, role, enabled })
    }
}

/// Login bookkeeping and the stored password digest of one user.
#[derive(Debug, Clone)]
pub struct Credential {
    pub principal_id: i64,
    pub email_address: String,
    pub password_hash: String,
    pub login_attempts: u32,
    pub last_login_attempt_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn from_record(record: &Record) -> Result<Self, AppError> {
        let text = |name: &str| {
            record
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| AppError::Internal(format!("user record without {}", name)))
        };
        let principal_id = record
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| AppError::Internal("user record without id".into()))?;
        let last = record.get("last_login_attempt_at").cloned().unwrap_or_default();
        let last_login_attempt_at = match Scalar::from_json(FieldKind::DateTime, "last_login_attempt_at", &last)? {
            Scalar::DateTime(at) => Some(at),
            _ => None,
        };
        Ok(Credential {
            principal_id,
            email_address: text("email_address")?,
            password_hash: text("password_hash")?,
            login_attempts: record
                .get("login_attempts")
                .and_then(|v| v.as_i64())
                .unwrap_or(0)
                .clamp(0, u32::MAX as i64) as u32,
            last_login_attempt_at,
        })
    }
}

/// Who is making a request, as carried by a valid token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub id: i64,
    pub display_name: String,
    pub role: Role,
}

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    /// Unique per token so two logins in the same second never share a digest.
    pub jti: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
