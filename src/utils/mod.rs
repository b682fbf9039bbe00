//! Utility functions module
//! 
//! This module contains utility functions used throughout the application.

pub mod domain;
pub mod signals;

// Re-export main functions
pub use domain::domain_of;
pub use signals::shutdown_signal;
