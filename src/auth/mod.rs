//! Authentication: password hashing, tokens, lockout and the login state machine.

pub mod lockout;
pub mod password;
pub mod service;
pub mod token;
pub mod types;

pub use lockout::{lock_state, LockState, LOCK_WINDOW_MINUTES, MAX_LOGIN_ATTEMPTS};
pub use password::PasswordHasher;
pub use service::{bearer_token, AuthService, LoginOutcome, LOCKED_OUT, NO_TOKEN};
pub use token::{token_digest, TokenIssuer};
pub use types::{AuthContext, Claims, Credential, IssuedToken, Principal, Role};
