//! State management module
//! 
//! This module contains the per-domain countdown entity, the lifecycle state
//! derived from it, the injected clock and the shared application state.

pub mod app_state;
pub mod clock;
pub mod site_state;
pub mod timed_site;
pub mod wake_up;

// Re-export main types
pub use app_state::AppState;
pub use clock::{Clock, ManualClock, SystemClock};
pub use site_state::SiteState;
pub use timed_site::TimedSite;
pub use wake_up::ScheduledWakeUp;
