//! Login lockout: too many failures inside a trailing window lock the account
//! until the window has passed since the last failure.

use chrono::{DateTime, Duration, Utc};

pub const MAX_LOGIN_ATTEMPTS: u32 = 5;
pub const LOCK_WINDOW_MINUTES: i64 = 10;

pub fn lock_window() -> Duration {
    Duration::minutes(LOCK_WINDOW_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Active,
    Locked { until: DateTime<Utc> },
}

pub fn lock_state(attempts: u32, last_attempt: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LockState {
    match last_attempt {
        Some(last) if attempts >= MAX_LOGIN_ATTEMPTS && now - last < lock_window() => LockState::Locked {
            until: last + lock_window(),
        },
        _ => LockState::Active,
    }
}
