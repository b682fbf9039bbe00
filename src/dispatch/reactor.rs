//! Policy reactor: derived state to user-facing action

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::SiteError, state::SiteState};

/// What the extension should do with the tab that was just evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PolicyAction {
    /// Send the tab to the block page. `to` carries the original URL in
    /// its `url` query parameter so it can be restored later.
    Redirect { to: String },
    /// Show the interrupt prompt
    Interrupt,
    /// Leave the tab alone
    Allow,
}

#[derive(Debug, Clone)]
pub struct PolicyReactor {
    block_page: Url,
}

impl PolicyReactor {
    pub fn new(block_page: &str) -> Result<Self, SiteError> {
        let block_page = Url::parse(block_page).map_err(|source| SiteError::InvalidUrl {
            url: block_page.to_string(),
            source,
        })?;
        Ok(Self { block_page })
    }

    pub fn block_page(&self) -> &str {
        self.block_page.as_str()
    }

    pub fn react(&self, state: SiteState, original_url: &str) -> PolicyAction {
        match state {
            SiteState::Blocked | SiteState::Lockdown => PolicyAction::Redirect {
                to: self.redirect_url(original_url),
            },
            SiteState::UnblockedInterrupt => PolicyAction::Interrupt,
            SiteState::Unblocked => PolicyAction::Allow,
        }
    }

    fn redirect_url(&self, original_url: &str) -> String {
        let mut target = self.block_page.clone();
        target.query_pairs_mut().append_pair("url", original_url);
        target.into()
    }
}
