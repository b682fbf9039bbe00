//! Lifecycle state derived from a site's countdowns

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a monitored domain currently sits in its unblock/lockdown cycle.
///
/// Never stored. Always recomputed from a [`TimedSite`](super::TimedSite)
/// snapshot and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteState {
    /// Inside the unblock window, no disruption threshold crossed yet
    Unblocked,
    /// Still inside the unblock window, but the first disruption is due
    UnblockedInterrupt,
    /// Unblock window over, mandatory cooldown still running
    Lockdown,
    /// No countdown remains
    Blocked,
}

impl SiteState {
    pub fn as_str(self) -> &'static str {
        match self {
            SiteState::Unblocked => "UNBLOCKED",
            SiteState::UnblockedInterrupt => "UNBLOCKED_INTERRUPT",
            SiteState::Lockdown => "LOCKDOWN",
            SiteState::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&SiteState::UnblockedInterrupt).unwrap();
        assert_eq!(json, "\"UNBLOCKED_INTERRUPT\"");
        assert_eq!(SiteState::Lockdown.to_string(), "LOCKDOWN");
    }
}
