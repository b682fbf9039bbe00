//! Tab event source: which domain is currently in front

use serde::{Deserialize, Serialize};

use crate::{error::SiteError, utils::domain_of};

/// One navigation or tab activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabEvent {
    /// Domain that was active before this event, if any
    pub previous_domain: Option<String>,
    pub new_domain: String,
    pub new_url: String,
}

impl TabEvent {
    /// The same domain was already active, so the time since its last
    /// update was spent viewing it.
    pub fn is_repeat(&self) -> bool {
        self.previous_domain.as_deref() == Some(self.new_domain.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveTab {
    domain: String,
    url: String,
}

/// Tracks the active tab across events.
///
/// Until [`observe`](Self::observe) returns, the session still reports the
/// previous domain as current.
#[derive(Debug, Clone, Default)]
pub struct TabSession {
    active: Option<ActiveTab>,
}

impl TabSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_domain(&self) -> Option<&str> {
        self.active.as_ref().map(|tab| tab.domain.as_str())
    }

    pub fn current_url(&self) -> Option<&str> {
        self.active.as_ref().map(|tab| tab.url.as_str())
    }

    /// Record a navigation to `url` and describe it as a [`TabEvent`].
    pub fn observe(&mut self, url: &str) -> Result<TabEvent, SiteError> {
        let new_domain = domain_of(url)?;
        let previous = self.active.replace(ActiveTab {
            domain: new_domain.clone(),
            url: url.to_string(),
        });

        Ok(TabEvent {
            previous_domain: previous.map(|tab| tab.domain),
            new_domain,
            new_url: url.to_string(),
        })
    }
}
