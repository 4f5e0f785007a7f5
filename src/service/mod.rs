//! Services: generic CRUD, integrity checks, request validation and users.

mod crud;
mod guard;
mod users;
mod validation;

pub use crud::Repository;
pub use guard::IntegrityGuard;
pub use users::{UserService, MIN_PASSWORD_LENGTH};
pub use validation::{body_to_map, RequestValidator};
