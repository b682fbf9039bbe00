//! Background tasks module
//! 
//! This module contains background tasks that run alongside the HTTP server.

pub mod wake_up_timer;

// Re-export main functions
pub use wake_up_timer::wake_up_timer_task;
