use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::auth::Role;

pub const DEFAULT_COOLDOWN_SECONDS: u64 = 600;

const MINUTE_MS: i64 = 60_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ThrottleDecision {
    Allowed,
    Blocked { remaining_minutes: u64 },
}

/// One timestamp for the whole process, shared by every sub-admin credential.
pub struct WriteThrottle {
    last_write_ms: Mutex<Option<i64>>,
    cooldown_ms: i64,
}

impl WriteThrottle {
    pub fn new(cooldown_seconds: u64) -> Self {
        Self {
            last_write_ms: Mutex::new(None),
            cooldown_ms: (cooldown_seconds as i64).saturating_mul(1000),
        }
    }

    pub fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    pub fn check(&self, role: Role, now_ms: i64) -> ThrottleDecision {
        if role != Role::SubAdmin {
            return ThrottleDecision::Allowed;
        }
        let Some(last) = *self.last_write_ms.lock() else {
            return ThrottleDecision::Allowed;
        };
        let elapsed = now_ms - last;
        if elapsed >= self.cooldown_ms {
            return ThrottleDecision::Allowed;
        }
        let remaining = self.cooldown_ms - elapsed;
        ThrottleDecision::Blocked {
            remaining_minutes: ((remaining + MINUTE_MS - 1) / MINUTE_MS) as u64,
        }
    }

    /// Call only after the guarded write has succeeded.
    pub fn record_write(&self, role: Role, now_ms: i64) {
        if role == Role::SubAdmin {
            *self.last_write_ms.lock() = Some(now_ms);
        }
    }
}

impl Default for WriteThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_SECONDS)
    }
}
