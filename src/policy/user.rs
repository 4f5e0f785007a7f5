//! The users resource decision table. `actor` is the requester, freshly
//! loaded; `target` is the addressed user.

use super::Decision;
use crate::auth::{Principal, Role};

/// Which fields an update body carries; only presence matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub role: bool,
    pub password: bool,
    pub enabled: bool,
}

/// Rows a list request may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    OnlySelf(i64),
    Roles(Vec<Role>),
    All,
}

fn disabled(actor: &Principal) -> Option<Decision> {
    (!actor.enabled).then(|| Decision::deny("Your account is disabled"))
}

pub fn can_create(actor: &Principal, target_role: Role) -> Decision {
    if let Some(d) = disabled(actor) {
        return d;
    }
    match actor.role {
        Role::Normal => Decision::deny("NORMAL users cannot create users"),
        Role::Admin if target_role != Role::Normal => Decision::deny("ADMINs can only create NORMAL users"),
        Role::Admin | Role::SuperAdmin => Decision::Allow,
    }
}

pub fn list_scope(actor: &Principal) -> ListScope {
    match actor.role {
        Role::Normal => ListScope::OnlySelf(actor.id),
        Role::Admin => ListScope::Roles(vec![Role::Normal, Role::Admin]),
        Role::SuperAdmin => ListScope::All,
    }
}

pub fn can_read(actor: &Principal, target: &Principal) -> Decision {
    if actor.id == target.id {
        return Decision::Allow;
    }
    match actor.role {
        Role::Normal => Decision::deny("NORMAL users can only view their own account"),
        Role::Admin if target.role == Role::SuperAdmin => Decision::deny("ADMINs cannot view SUPER_ADMIN users"),
        Role::Admin | Role::SuperAdmin => Decision::Allow,
    }
}

pub fn can_update(actor: &Principal, target: &Principal, patch: UserPatch) -> Decision {
    if let Some(d) = disabled(actor) {
        return d;
    }
    if patch.role {
        return Decision::deny("User roles cannot be changed");
    }
    if patch.password {
        return Decision::deny("Passwords cannot be changed through this endpoint");
    }
    let is_self = actor.id == target.id;
    if is_self && patch.enabled {
        return Decision::deny("You cannot enable or disable your own account");
    }
    match actor.role {
        Role::Normal if !is_self => Decision::deny("NORMAL users can only update their own account"),
        Role::Normal => Decision::Allow,
        Role::Admin if !is_self && target.role != Role::Normal => {
            Decision::deny("ADMINs can only update NORMAL users")
        }
        // ADMINs may edit NORMAL users but not toggle them.
        Role::Admin if patch.enabled => Decision::deny("ADMINs cannot enable or disable users"),
        Role::Admin => Decision::Allow,
        Role::SuperAdmin if !is_self && target.role == Role::SuperAdmin => {
            Decision::deny("SUPER_ADMINs cannot update other SUPER_ADMIN users")
        }
        Role::SuperAdmin => Decision::Allow,
    }
}

pub fn can_delete(actor: &Principal, target: &Principal) -> Decision {
    if let Some(d) = disabled(actor) {
        return d;
    }
    if actor.id == target.id {
        return Decision::deny("You cannot delete your own account");
    }
    match actor.role {
        Role::Normal => Decision::deny("NORMAL users cannot delete users"),
        Role::Admin if target.role != Role::Normal => Decision::deny("ADMINs can only delete NORMAL users"),
        Role::SuperAdmin if target.role == Role::SuperAdmin => {
            Decision::deny("SUPER_ADMINs cannot delete other SUPER_ADMIN users")
        }
        Role::Admin | Role::SuperAdmin => Decision::Allow,
    }
}
