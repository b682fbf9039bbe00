//! Per-domain countdown snapshots and the state machine over them
//!
//! A [`TimedSite`] stores only two kinds of countdown plus the instant they
//! were last accurate:
//!
//! ```text
//!  pending disruptions (ascending)      lockdown
//!  [d0, d1, ..., dn]                    L
//!   |              |                    |
//!   |              +-- end of the unblock window
//!   +-- first interrupt
//!
//!  Unblocked --(d0 reached)--> UnblockedInterrupt --(dn reached)--> Lockdown --(L reached)--> Blocked
//! ```
//!
//! The state is never stored. It is a pure function of the snapshot and
//! `now`, so replaying a query at the same instant always agrees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SiteState;

/// Countdown state for one monitored domain.
///
/// All durations are milliseconds. `pending_disruptions` is kept sorted
/// ascending; the lockdown carry-over in [`update`](Self::update) relies on
/// elapsed time depleting that list from the front.
///
/// Call [`update`](Self::update) for a freshly observed `now` before
/// trusting [`calculate_current_state`](Self::calculate_current_state) or
/// [`time_until_next_event`](Self::time_until_next_event) at that instant.
/// Queried against an older snapshot, both measure the full gap since
/// `last_update`, and a later `update` over the same gap counts that time
/// again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TimedSiteRecord")]
pub struct TimedSite {
    domain: String,
    pending_disruptions: Vec<u64>,
    #[serde(rename = "lockdownRemaining")]
    lockdown_remaining_ms: u64,
    last_update: Option<DateTime<Utc>>,
}

/// Stored shape, normalized into a [`TimedSite`] on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedSiteRecord {
    domain: String,
    #[serde(default)]
    pending_disruptions: Vec<u64>,
    #[serde(default)]
    lockdown_remaining: u64,
    #[serde(default)]
    last_update: Option<DateTime<Utc>>,
}

impl From<TimedSiteRecord> for TimedSite {
    fn from(record: TimedSiteRecord) -> Self {
        let mut site = TimedSite::new(
            record.domain,
            record.pending_disruptions,
            record.lockdown_remaining,
        );
        site.last_update = record.last_update;
        site
    }
}

impl TimedSite {
    /// Create a site with no `last_update`; its first update sees zero
    /// elapsed time.
    pub fn new(domain: impl Into<String>, mut pending_disruptions: Vec<u64>, lockdown_ms: u64) -> Self {
        pending_disruptions.sort_unstable();
        Self {
            domain: domain.into(),
            pending_disruptions,
            lockdown_remaining_ms: lockdown_ms,
            last_update: None,
        }
    }

    /// Stamp the snapshot as accurate at `at`.
    pub fn with_last_update(mut self, at: DateTime<Utc>) -> Self {
        self.last_update = Some(at);
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn pending_disruptions(&self) -> &[u64] {
        &self.pending_disruptions
    }

    pub fn lockdown_remaining_ms(&self) -> u64 {
        self.lockdown_remaining_ms
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Milliseconds between the snapshot and `now`. Zero when the site was
    /// never updated or `now` lies before the snapshot.
    fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        match self.last_update {
            Some(last) => u64::try_from((now - last).num_milliseconds()).unwrap_or(0),
            None => 0,
        }
    }

    /// Apply the time elapsed since the last snapshot.
    ///
    /// While `was_active`, elapsed time first depletes every pending
    /// disruption. Only what is left over after the largest depletion counts
    /// against the lockdown, so the same stretch of time never drains both
    /// the unblock window and the cooldown. Depleted entries stay in place;
    /// popping them is up to the caller.
    pub fn update(&mut self, was_active: bool, now: DateTime<Utc>) {
        let elapsed = self.elapsed_ms(now);

        let mut max_subtracted = 0;
        if was_active {
            for remaining in self.pending_disruptions.iter_mut() {
                let subtracted = (*remaining).min(elapsed);
                *remaining -= subtracted;
                max_subtracted = max_subtracted.max(subtracted);
            }
        }

        if self.lockdown_remaining_ms > 0 {
            let leftover = elapsed - max_subtracted;
            self.lockdown_remaining_ms -= leftover.min(self.lockdown_remaining_ms);
        }

        self.last_update = Some(now);
    }

    /// Derive the lifecycle state at `now` without touching the snapshot.
    ///
    /// `now` may be hypothetical, which makes this usable as a preview.
    pub fn calculate_current_state(&self, now: DateTime<Utc>) -> SiteState {
        let delta = self.elapsed_ms(now);

        let initial_interrupt_remaining = self
            .pending_disruptions
            .first()
            .map_or(0, |first| first.saturating_sub(delta));
        let final_disruption_remaining = self
            .pending_disruptions
            .last()
            .map_or(0, |last| last.saturating_sub(delta));
        let lockdown_remaining = self.lockdown_remaining_ms.saturating_sub(delta);

        if final_disruption_remaining > 0 {
            if initial_interrupt_remaining == 0 {
                SiteState::UnblockedInterrupt
            } else {
                SiteState::Unblocked
            }
        } else if lockdown_remaining > 0 {
            SiteState::Lockdown
        } else {
            SiteState::Blocked
        }
    }

    /// Milliseconds until the next instant at which the derived state can
    /// change. Zero means nothing is scheduled: the site is blocked until
    /// something resets it.
    pub fn time_until_next_event(&self, now: DateTime<Utc>) -> u64 {
        let delta = self.elapsed_ms(now);

        self.pending_disruptions
            .iter()
            .map(|remaining| remaining.saturating_sub(delta))
            .find(|&remaining| remaining > 0)
            .unwrap_or_else(|| self.lockdown_remaining_ms.saturating_sub(delta))
    }

    /// Remove the soonest disruption, fired or not.
    pub fn pop_disruption(&mut self) -> Option<u64> {
        if self.pending_disruptions.is_empty() {
            None
        } else {
            Some(self.pending_disruptions.remove(0))
        }
    }

    /// Remove every disruption that has already run down to zero. Returns
    /// how many were removed.
    pub fn pop_depleted_disruptions(&mut self) -> usize {
        let depleted = self
            .pending_disruptions
            .iter()
            .take_while(|&&remaining| remaining == 0)
            .count();
        self.pending_disruptions.drain(..depleted);
        depleted
    }
}
