//! URL to domain key mapping

use url::Url;

use crate::error::SiteError;

/// Extract the host a site record is keyed by, e.g. `www.example.com`.
pub fn domain_of(url: &str) -> Result<String, SiteError> {
    let parsed = Url::parse(url).map_err(|source| SiteError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    parsed
        .host_str()
        .map(|host| host.to_string())
        .ok_or_else(|| SiteError::MissingHost(url.to_string()))
}
