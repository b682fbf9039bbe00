//! Record store module
//! 
//! Keyed access to [`TimedSite`] records. The core only ever sees resolved
//! snapshots; how records are kept is up to the implementation.

pub mod memory;

pub use memory::MemoryStore;

use crate::{error::SiteError, state::TimedSite};

/// Domain-keyed get/put over site records.
pub trait SiteStore: Send + Sync {
    /// Look up the record for `domain`. Absent domains are `Ok(None)`.
    fn get(&self, domain: &str) -> Result<Option<TimedSite>, SiteError>;

    /// Replace the record with the same domain, or append a new one.
    fn put(&self, site: TimedSite) -> Result<(), SiteError>;

    fn list(&self) -> Result<Vec<TimedSite>, SiteError>;
}
