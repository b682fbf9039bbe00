//! The single scheduled re-evaluation

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A pending wake-up for the active domain.
///
/// Only the most recent schedule is live. Each new one bumps `generation`,
/// and a wake-up whose generation is no longer current is ignored when it
/// arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledWakeUp {
    pub generation: u64,
    pub domain: String,
    pub delay_ms: u64,
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduledWakeUp {
    /// Instant at which the wake-up is due
    pub fn due_at(&self) -> DateTime<Utc> {
        i64::try_from(self.delay_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|delay| self.scheduled_at.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Milliseconds left until the wake-up is due, zero once it has passed
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.due_at() - now).num_milliseconds()).unwrap_or(0)
    }
}
