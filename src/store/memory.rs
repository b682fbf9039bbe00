//! In-process site store

use std::{path::Path, sync::Mutex};

use tracing::{debug, info};

use super::SiteStore;
use crate::{error::SiteError, state::TimedSite};

/// Site records held in memory, in registration order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sites: Mutex<Vec<TimedSite>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records. Later records win over earlier
    /// ones with the same domain.
    pub fn from_sites(sites: impl IntoIterator<Item = TimedSite>) -> Self {
        let mut records: Vec<TimedSite> = Vec::new();
        for site in sites {
            upsert(&mut records, site);
        }
        Self {
            sites: Mutex::new(records),
        }
    }

    /// Seed a store from a JSON array of site records.
    pub fn load_json(path: &Path) -> Result<Self, SiteError> {
        let contents = std::fs::read_to_string(path)?;
        let sites: Vec<TimedSite> = serde_json::from_str(&contents)?;
        info!("Loaded {} site records from {}", sites.len(), path.display());
        Ok(Self::from_sites(sites))
    }
}

fn upsert(records: &mut Vec<TimedSite>, site: TimedSite) {
    match records.iter().position(|s| s.domain() == site.domain()) {
        Some(index) => records[index] = site,
        None => records.push(site),
    }
}

impl SiteStore for MemoryStore {
    fn get(&self, domain: &str) -> Result<Option<TimedSite>, SiteError> {
        let sites = self.sites.lock()
            .map_err(|_| SiteError::LockPoisoned("site store"))?;
        Ok(sites.iter().find(|s| s.domain() == domain).cloned())
    }

    fn put(&self, site: TimedSite) -> Result<(), SiteError> {
        let mut sites = self.sites.lock()
            .map_err(|_| SiteError::LockPoisoned("site store"))?;
        debug!("Storing site record for {}", site.domain());
        upsert(&mut sites, site);
        Ok(())
    }

    fn list(&self) -> Result<Vec<TimedSite>, SiteError> {
        self.sites.lock()
            .map(|sites| sites.clone())
            .map_err(|_| SiteError::LockPoisoned("site store"))
    }
}
