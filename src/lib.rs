//! Site Lockdown - Per-domain unblock, interrupt and lockdown timers
//! 
//! This library tracks a decaying countdown state machine for every monitored
//! domain, derives whether the domain is unblocked, due for an interrupt, in
//! lockdown or blocked, and schedules a single wake-up for the next point at
//! which that answer can change.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod state;
pub mod store;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::SiteError;
pub use state::{AppState, SiteState, TimedSite};
pub use utils::signals::shutdown_signal;
