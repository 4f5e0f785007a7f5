//! Access policy: pure decisions over principals. Nothing here touches a store.

pub mod resource;
pub mod user;

pub use resource::can_mutate;
pub use user::{can_create, can_delete, can_read, can_update, list_scope, ListScope, UserPatch};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny(reason.into())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// `Deny` becomes `Forbidden`.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::warn!(%reason, "policy denied");
                Err(AppError::Forbidden(reason))
            }
        }
    }
}
