//! Main application state management

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::{Clock, ScheduledWakeUp, TimedSite};
use crate::{
    dispatch::{Dispatcher, NavigationOutcome, PolicyReactor, SiteSnapshot, TabSession},
    error::SiteError,
    store::SiteStore,
};

/// Shared state behind the HTTP handlers and the wake-up task
pub struct AppState {
    /// Time source for every countdown computation
    pub clock: Arc<dyn Clock>,
    dispatcher: Dispatcher,
    /// Active tab; its lock also serializes event handling
    session: Mutex<TabSession>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_outcome: Arc<Mutex<Option<NavigationOutcome>>>,
    pub last_outcome_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Every evaluated outcome, from navigations and wake-ups alike
    pub outcome_tx: broadcast::Sender<NavigationOutcome>,
    /// The one pending wake-up, if any
    pub wake_up_tx: watch::Sender<Option<ScheduledWakeUp>>,
    /// Keep the receiver alive to prevent channel closure
    pub _wake_up_rx: watch::Receiver<Option<ScheduledWakeUp>>,
    wake_up_generation: AtomicU64,
}

impl AppState {
    pub fn new(
        port: u16,
        host: String,
        store: Arc<dyn SiteStore>,
        reactor: PolicyReactor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (outcome_tx, _) = broadcast::channel(100);
        let (wake_up_tx, wake_up_rx) = watch::channel(None);

        Self {
            clock,
            dispatcher: Dispatcher::new(store, reactor),
            session: Mutex::new(TabSession::new()),
            start_time: Instant::now(),
            port,
            host,
            last_outcome: Arc::new(Mutex::new(None)),
            last_outcome_time: Arc::new(Mutex::new(None)),
            outcome_tx,
            wake_up_tx,
            _wake_up_rx: wake_up_rx,
            wake_up_generation: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn SiteStore> {
        self.dispatcher.store()
    }

    pub fn block_page(&self) -> &str {
        self.dispatcher.reactor().block_page()
    }

    /// Handle a navigation to `url` in the active tab.
    ///
    /// The session only moves to the new tab once the event has been
    /// dispatched; on error the previous tab stays active.
    pub fn navigate(&self, url: &str) -> Result<NavigationOutcome, SiteError> {
        let mut session = self.session.lock()
            .map_err(|_| SiteError::LockPoisoned("tab session"))?;

        let mut next = session.clone();
        let event = next.observe(url)?;
        debug!("Tab event: {:?} -> {}", event.previous_domain, event.new_domain);

        let outcome = self.dispatcher.handle_event(&event, self.clock.now())?;
        *session = next;
        self.publish(&outcome);
        Ok(outcome)
    }

    /// Handle a wake-up delivered by the timer task.
    ///
    /// A wake-up superseded by a later schedule is a no-op. Otherwise the
    /// active domain is re-derived; the wake-up itself never implies a
    /// transition.
    pub fn handle_wake_up(&self, wake_up: &ScheduledWakeUp) -> Result<Option<NavigationOutcome>, SiteError> {
        let session = self.session.lock()
            .map_err(|_| SiteError::LockPoisoned("tab session"))?;

        if wake_up.generation != self.wake_up_generation.load(Ordering::SeqCst) {
            debug!("Ignoring stale wake-up {} for {}", wake_up.generation, wake_up.domain);
            return Ok(None);
        }

        let outcome = self.dispatcher.reevaluate(&session, self.clock.now())?;

        match &outcome {
            Some(outcome) => {
                info!("Wake-up re-evaluated {} as {:?}", outcome.domain, outcome.state);
                self.publish(outcome);
            }
            None => self.schedule_wake_up(None),
        }

        Ok(outcome)
    }

    /// Register a domain for blocking, or reset an existing record.
    ///
    /// Resetting the domain in the active tab re-derives its state so the
    /// pending wake-up follows the new countdowns.
    pub fn register_site(&self, domain: &str, disruptions_ms: Vec<u64>, lockdown_ms: u64) -> Result<TimedSite, SiteError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(SiteError::EmptyDomain);
        }

        let site = TimedSite::new(domain, disruptions_ms, lockdown_ms)
            .with_last_update(self.clock.now());
        info!(
            "Registering {} with disruptions {:?}ms and {}ms lockdown",
            site.domain(),
            site.pending_disruptions(),
            site.lockdown_remaining_ms()
        );
        let session = self.session.lock()
            .map_err(|_| SiteError::LockPoisoned("tab session"))?;
        self.store().put(site.clone())?;

        if session.current_domain() == Some(site.domain()) {
            if let Some(outcome) = self.dispatcher.reevaluate(&session, self.clock.now())? {
                debug!("Re-evaluated active domain {} after reset", outcome.domain);
                self.publish(&outcome);
            }
        }

        Ok(site)
    }

    /// Preview one site at the current time
    pub fn site_snapshot(&self, domain: &str) -> Result<Option<SiteSnapshot>, SiteError> {
        let now = self.clock.now();
        Ok(self.store().get(domain)?.map(|site| SiteSnapshot::preview(site, now)))
    }

    /// Preview every site at the current time
    pub fn site_snapshots(&self) -> Result<Vec<SiteSnapshot>, SiteError> {
        let now = self.clock.now();
        Ok(self.store().list()?
            .into_iter()
            .map(|site| SiteSnapshot::preview(site, now))
            .collect())
    }

    pub fn active_domain(&self) -> Result<Option<String>, SiteError> {
        self.session.lock()
            .map(|session| session.current_domain().map(str::to_string))
            .map_err(|_| SiteError::LockPoisoned("tab session"))
    }

    pub fn pending_wake_up(&self) -> Option<ScheduledWakeUp> {
        self.wake_up_tx.borrow().clone()
    }

    /// Record an outcome, notify listeners and reschedule the wake-up.
    /// Called with the session lock held so schedules land in event order.
    fn publish(&self, outcome: &NavigationOutcome) {
        if let Ok(mut last_outcome) = self.last_outcome.lock() {
            *last_outcome = Some(outcome.clone());
        }
        if let Ok(mut last_time) = self.last_outcome_time.lock() {
            *last_time = Some(self.clock.now());
        }

        // No receivers is normal when nothing is listening.
        let _ = self.outcome_tx.send(outcome.clone());

        let wake_up = outcome.next_event_ms.map(|delay_ms| (outcome.domain.clone(), delay_ms));
        self.schedule_wake_up(wake_up);
    }

    /// Replace the pending wake-up. `None` cancels it.
    fn schedule_wake_up(&self, wake_up: Option<(String, u64)>) {
        let generation = self.wake_up_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let scheduled = wake_up.map(|(domain, delay_ms)| {
            debug!("Scheduling wake-up {} for {} in {}ms", generation, domain, delay_ms);
            ScheduledWakeUp {
                generation,
                domain,
                delay_ms,
                scheduled_at: self.clock.now(),
            }
        });

        if let Err(e) = self.wake_up_tx.send(scheduled) {
            warn!("Failed to schedule wake-up: {}", e);
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last outcome information
    pub fn get_last_outcome(&self) -> (Option<NavigationOutcome>, Option<DateTime<Utc>>) {
        let last_outcome = self.last_outcome.lock().ok().and_then(|o| o.clone());
        let last_outcome_time = self.last_outcome_time.lock().ok().and_then(|t| *t);
        (last_outcome, last_outcome_time)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use std::sync::atomic::AtomicBool;

    use crate::{
        dispatch::PolicyAction,
        state::{ManualClock, SiteState},
        store::MemoryStore,
    };

    /// Memory store that can be switched into failing every call
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl FailingStore {
        fn check(&self) -> Result<(), SiteError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(SiteError::LockPoisoned("site store"))
            } else {
                Ok(())
            }
        }
    }

    impl SiteStore for FailingStore {
        fn get(&self, domain: &str) -> Result<Option<TimedSite>, SiteError> {
            self.check()?;
            self.inner.get(domain)
        }

        fn put(&self, site: TimedSite) -> Result<(), SiteError> {
            self.check()?;
            self.inner.put(site)
        }

        fn list(&self) -> Result<Vec<TimedSite>, SiteError> {
            self.check()?;
            self.inner.list()
        }
    }

    fn app() -> (AppState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()));
        let state = AppState::new(
            20554,
            "127.0.0.1".to_string(),
            Arc::new(MemoryStore::new()),
            PolicyReactor::new("http://127.0.0.1:20554/blocked").unwrap(),
            clock.clone(),
        );
        (state, clock)
    }

    #[test]
    fn test_register_rejects_empty_domain() {
        let (state, _) = app();
        assert!(matches!(state.register_site("  ", vec![], 0), Err(SiteError::EmptyDomain)));
    }

    #[test]
    fn test_navigation_schedules_next_event() {
        let (state, _) = app();
        state.register_site("video.example", vec![10_000, 5000], 0).unwrap();

        let outcome = state.navigate("https://video.example/").unwrap();
        assert_eq!(outcome.state, Some(SiteState::Unblocked));

        let wake_up = state.pending_wake_up().unwrap();
        assert_eq!(wake_up.domain, "video.example");
        assert_eq!(wake_up.delay_ms, 5000);
        assert_eq!(state.active_domain().unwrap().as_deref(), Some("video.example"));
        assert_eq!(state.get_last_outcome().0, Some(outcome));
    }

    #[test]
    fn test_navigating_away_cancels_wake_up() {
        let (state, _) = app();
        state.register_site("video.example", vec![5000], 0).unwrap();
        state.navigate("https://video.example/").unwrap();
        assert!(state.pending_wake_up().is_some());

        state.navigate("https://docs.example/").unwrap();
        assert_eq!(state.pending_wake_up(), None);
    }

    #[test]
    fn test_stale_wake_up_is_ignored() {
        let (state, clock) = app();
        state.register_site("video.example", vec![5000, 10_000], 0).unwrap();
        state.navigate("https://video.example/").unwrap();
        let stale = state.pending_wake_up().unwrap();

        clock.advance(Duration::milliseconds(1000));
        state.navigate("https://video.example/next").unwrap();
        assert_eq!(state.handle_wake_up(&stale).unwrap(), None);

        let current = state.pending_wake_up().unwrap();
        assert_eq!(current.delay_ms, 4000);
        clock.advance(Duration::milliseconds(4000));
        let outcome = state.handle_wake_up(&current).unwrap().unwrap();
        assert_eq!(outcome.action, PolicyAction::Interrupt);
        assert_eq!(state.pending_wake_up().unwrap().delay_ms, 5000);
    }

    #[test]
    fn test_snapshots_preview_without_mutating() {
        let (state, clock) = app();
        state.register_site("video.example", vec![], 3000).unwrap();
        clock.advance(Duration::milliseconds(1000));

        let snapshot = state.site_snapshot("video.example").unwrap().unwrap();
        assert_eq!(snapshot.state, SiteState::Lockdown);
        assert_eq!(snapshot.next_event_ms, 2000);
        assert_eq!(snapshot.site.lockdown_remaining_ms(), 3000);
        assert!(state.site_snapshot("missing.example").unwrap().is_none());
        assert_eq!(state.site_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn test_reset_of_active_domain_reschedules_wake_up() {
        let (state, _) = app();
        state.register_site("video.example", vec![60_000], 0).unwrap();
        state.navigate("https://video.example/").unwrap();
        assert_eq!(state.pending_wake_up().unwrap().delay_ms, 60_000);

        state.register_site("video.example", vec![1000, 2000], 0).unwrap();
        let wake_up = state.pending_wake_up().unwrap();
        assert_eq!(wake_up.domain, "video.example");
        assert_eq!(wake_up.delay_ms, 1000);
        assert_eq!(state.get_last_outcome().0.unwrap().state, Some(SiteState::Unblocked));
    }

    #[test]
    fn test_reset_of_blocked_active_domain_arms_wake_up() {
        let (state, _) = app();
        state.register_site("video.example", vec![], 0).unwrap();
        let outcome = state.navigate("https://video.example/").unwrap();
        assert_eq!(outcome.state, Some(SiteState::Blocked));
        assert_eq!(state.pending_wake_up(), None);

        state.register_site("video.example", vec![1000], 0).unwrap();
        assert_eq!(state.pending_wake_up().unwrap().delay_ms, 1000);
    }

    #[test]
    fn test_registering_inactive_domain_keeps_wake_up() {
        let (state, _) = app();
        state.register_site("video.example", vec![5000], 0).unwrap();
        state.navigate("https://video.example/").unwrap();
        let armed = state.pending_wake_up().unwrap();

        state.register_site("news.example", vec![1000], 0).unwrap();
        assert_eq!(state.pending_wake_up(), Some(armed));
    }

    #[test]
    fn test_last_outcome_time_uses_injected_clock() {
        let (state, clock) = app();
        clock.advance(Duration::milliseconds(2500));
        state.navigate("https://docs.example/").unwrap();
        assert_eq!(state.get_last_outcome().1, Some(clock.now()));
    }

    #[test]
    fn test_failed_dispatch_keeps_previous_tab() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()));
        let store = Arc::new(FailingStore::default());
        let state = AppState::new(
            20554,
            "127.0.0.1".to_string(),
            store.clone(),
            PolicyReactor::new("http://127.0.0.1:20554/blocked").unwrap(),
            clock.clone(),
        );
        state.register_site("video.example", vec![5000], 0).unwrap();
        state.navigate("https://video.example/").unwrap();
        let armed = state.pending_wake_up().unwrap();

        store.failing.store(true, Ordering::SeqCst);
        assert!(state.navigate("https://docs.example/").is_err());
        assert_eq!(state.active_domain().unwrap().as_deref(), Some("video.example"));
        assert_eq!(state.pending_wake_up(), Some(armed));

        store.failing.store(false, Ordering::SeqCst);
        let outcome = state.navigate("https://docs.example/").unwrap();
        assert_eq!(outcome.domain, "docs.example");
        assert_eq!(state.active_domain().unwrap().as_deref(), Some("docs.example"));
    }
}
