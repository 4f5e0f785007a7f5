//! Catalog resources: any authenticated principal reads, privileged ones write.

use super::Decision;
use crate::auth::{Principal, Role};
use crate::resource::TableDef;

/// Create, update or delete on a catalog table.
pub fn can_mutate(actor: &Principal, table: &TableDef) -> Decision {
    if !actor.enabled {
        return Decision::deny("Your account is disabled");
    }
    match actor.role {
        Role::Normal => Decision::deny(format!("NORMAL users cannot modify {}", table.path)),
        Role::Admin | Role::SuperAdmin => Decision::Allow,
    }
}
