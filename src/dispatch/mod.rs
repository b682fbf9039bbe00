//! Event dispatch module
//!
//! Turns tab events into timer updates, derived states and policy actions.

pub mod reactor;
pub mod session;

pub use reactor::{PolicyAction, PolicyReactor};
pub use session::{TabEvent, TabSession};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::SiteError,
    state::{SiteState, TimedSite},
    store::SiteStore,
};

/// Result of evaluating one domain after an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationOutcome {
    pub domain: String,
    /// `None` when the domain has no site record
    pub state: Option<SiteState>,
    #[serde(flatten)]
    pub action: PolicyAction,
    /// Delay until the state can next change; `None` when nothing is scheduled
    pub next_event_ms: Option<u64>,
}

impl NavigationOutcome {
    fn unmonitored(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            state: None,
            action: PolicyAction::Allow,
            next_event_ms: None,
        }
    }
}

/// A stored site together with what it looks like at a given instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSnapshot {
    pub site: TimedSite,
    pub state: SiteState,
    pub next_event_ms: u64,
}

impl SiteSnapshot {
    /// Preview `site` at `now` without applying the elapsed time.
    pub fn preview(site: TimedSite, now: DateTime<Utc>) -> Self {
        Self {
            state: site.calculate_current_state(now),
            next_event_ms: site.time_until_next_event(now),
            site,
        }
    }
}

/// Applies tab events to the store.
///
/// Events for the same session must be handed over one at a time; the
/// caller's session lock provides that ordering.
pub struct Dispatcher {
    store: Arc<dyn SiteStore>,
    reactor: PolicyReactor,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn SiteStore>, reactor: PolicyReactor) -> Self {
        Self { store, reactor }
    }

    pub fn store(&self) -> &Arc<dyn SiteStore> {
        &self.store
    }

    pub fn reactor(&self) -> &PolicyReactor {
        &self.reactor
    }

    /// Handle a navigation observed at `now`.
    ///
    /// The domain being left is charged the time it was in front. The new
    /// domain is updated first and only then evaluated, so its state is
    /// measured against a fresh snapshot.
    pub fn handle_event(&self, event: &TabEvent, now: DateTime<Utc>) -> Result<NavigationOutcome, SiteError> {
        if !event.is_repeat() {
            if let Some(previous) = event.previous_domain.as_deref() {
                if let Some(mut site) = self.store.get(previous)? {
                    site.update(true, now);
                    debug!("Charged active time to {}", previous);
                    self.store.put(site)?;
                }
            }
        }

        match self.store.get(&event.new_domain)? {
            Some(mut site) => {
                site.update(event.is_repeat(), now);
                self.evaluate(site, &event.new_url, now)
            }
            None => {
                debug!("{} is not monitored", event.new_domain);
                Ok(NavigationOutcome::unmonitored(&event.new_domain))
            }
        }
    }

    /// Re-derive the state of whatever the session has in front.
    ///
    /// Returns `None` when no tab is active or the active domain is not
    /// monitored.
    pub fn reevaluate(&self, session: &TabSession, now: DateTime<Utc>) -> Result<Option<NavigationOutcome>, SiteError> {
        let (Some(domain), Some(url)) = (session.current_domain(), session.current_url()) else {
            return Ok(None);
        };

        match self.store.get(domain)? {
            Some(mut site) => {
                site.update(true, now);
                self.evaluate(site, url, now).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Derive state and action from an already updated site, pop the
    /// disruptions the action has just dealt with, and store the result.
    fn evaluate(&self, mut site: TimedSite, url: &str, now: DateTime<Utc>) -> Result<NavigationOutcome, SiteError> {
        let state = site.calculate_current_state(now);
        let action = self.reactor.react(state, url);

        let popped = site.pop_depleted_disruptions();
        if popped > 0 {
            debug!("Popped {} depleted disruptions for {}", popped, site.domain());
        }

        let next_event_ms = site.time_until_next_event(now);
        debug!(
            "{} is {} (next event in {}ms, lockdown {}ms)",
            site.domain(),
            state,
            next_event_ms,
            site.lockdown_remaining_ms()
        );

        let domain = site.domain().to_string();
        self.store.put(site)?;

        Ok(NavigationOutcome {
            domain,
            state: Some(state),
            action,
            next_event_ms: (next_event_ms > 0).then_some(next_event_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::store::MemoryStore;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        base() + Duration::milliseconds(ms)
    }

    fn dispatcher(sites: Vec<TimedSite>) -> Dispatcher {
        let store: Arc<dyn SiteStore> = Arc::new(MemoryStore::from_sites(sites));
        let reactor = PolicyReactor::new("http://127.0.0.1:20554/blocked").unwrap();
        Dispatcher::new(store, reactor)
    }

    fn navigate(dispatcher: &Dispatcher, session: &mut TabSession, url: &str, now: DateTime<Utc>) -> NavigationOutcome {
        let event = session.observe(url).unwrap();
        dispatcher.handle_event(&event, now).unwrap()
    }

    #[test]
    fn test_unmonitored_domain_is_allowed() {
        let dispatcher = dispatcher(vec![]);
        let mut session = TabSession::new();
        let outcome = navigate(&dispatcher, &mut session, "https://docs.example/", at(0));
        assert_eq!(outcome.state, None);
        assert_eq!(outcome.action, PolicyAction::Allow);
        assert_eq!(outcome.next_event_ms, None);
        assert!(dispatcher.store().get("docs.example").unwrap().is_none());
    }

    #[test]
    fn test_unblock_window_only_runs_while_viewed() {
        let site = TimedSite::new("video.example", vec![5000, 10000], 0).with_last_update(at(0));
        let dispatcher = dispatcher(vec![site]);
        let mut session = TabSession::new();

        let outcome = navigate(&dispatcher, &mut session, "https://video.example/a", at(0));
        assert_eq!(outcome.state, Some(SiteState::Unblocked));
        assert_eq!(outcome.next_event_ms, Some(5000));

        // 2s on the site, then away for a minute.
        navigate(&dispatcher, &mut session, "https://docs.example/", at(2000));
        let outcome = navigate(&dispatcher, &mut session, "https://video.example/b", at(62_000));
        assert_eq!(outcome.state, Some(SiteState::Unblocked));
        assert_eq!(outcome.next_event_ms, Some(3000));

        let stored = dispatcher.store().get("video.example").unwrap().unwrap();
        assert_eq!(stored.pending_disruptions(), &[3000, 8000]);
    }

    #[test]
    fn test_interrupt_fires_once_per_disruption() {
        let site = TimedSite::new("video.example", vec![5000, 10000], 0).with_last_update(at(0));
        let dispatcher = dispatcher(vec![site]);
        let mut session = TabSession::new();

        navigate(&dispatcher, &mut session, "https://video.example/", at(0));
        let outcome = navigate(&dispatcher, &mut session, "https://video.example/next", at(6000));
        assert_eq!(outcome.state, Some(SiteState::UnblockedInterrupt));
        assert_eq!(outcome.action, PolicyAction::Interrupt);
        assert_eq!(outcome.next_event_ms, Some(4000));

        let outcome = navigate(&dispatcher, &mut session, "https://video.example/again", at(7000));
        assert_eq!(outcome.state, Some(SiteState::Unblocked));
        assert_eq!(outcome.action, PolicyAction::Allow);
    }

    #[test]
    fn test_window_end_rolls_into_lockdown_then_block() {
        let site = TimedSite::new("video.example", vec![1000], 10_000).with_last_update(at(0));
        let dispatcher = dispatcher(vec![site]);
        let mut session = TabSession::new();

        navigate(&dispatcher, &mut session, "https://video.example/", at(0));
        let outcome = navigate(&dispatcher, &mut session, "https://video.example/", at(3000));
        assert_eq!(outcome.state, Some(SiteState::Lockdown));
        assert!(matches!(outcome.action, PolicyAction::Redirect { .. }));
        // 1000ms of window, 2000ms already spent in lockdown.
        assert_eq!(outcome.next_event_ms, Some(8000));

        let stored = dispatcher.store().get("video.example").unwrap().unwrap();
        assert!(stored.pending_disruptions().is_empty());

        // Lockdown keeps running while the user is elsewhere.
        navigate(&dispatcher, &mut session, "https://docs.example/", at(3000));
        let outcome = navigate(&dispatcher, &mut session, "https://video.example/", at(20_000));
        assert_eq!(outcome.state, Some(SiteState::Blocked));
        assert_eq!(outcome.next_event_ms, None);
    }

    #[test]
    fn test_reevaluate_uses_active_tab() {
        let site = TimedSite::new("video.example", vec![5000], 0).with_last_update(at(0));
        let dispatcher = dispatcher(vec![site]);
        let mut session = TabSession::new();
        assert_eq!(dispatcher.reevaluate(&session, at(0)).unwrap(), None);

        navigate(&dispatcher, &mut session, "https://video.example/watch", at(0));
        let outcome = dispatcher.reevaluate(&session, at(5000)).unwrap().unwrap();
        assert_eq!(outcome.state, Some(SiteState::Blocked));
        assert_eq!(
            outcome.action,
            PolicyAction::Redirect {
                to: "http://127.0.0.1:20554/blocked?url=https%3A%2F%2Fvideo.example%2Fwatch".to_string()
            }
        );
    }

    #[test]
    fn test_outcome_serialization_flattens_action() {
        let outcome = NavigationOutcome {
            domain: "video.example".to_string(),
            state: Some(SiteState::UnblockedInterrupt),
            action: PolicyAction::Interrupt,
            next_event_ms: Some(4000),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "domain": "video.example",
                "state": "UNBLOCKED_INTERRUPT",
                "action": "interrupt",
                "nextEventMs": 4000,
            })
        );
    }
}
