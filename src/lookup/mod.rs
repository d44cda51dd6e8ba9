pub mod github;

use thiserror::Error;

use crate::config::{LookupProvider, Settings};
use crate::flake::LockedRef;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, LookupError>;

pub trait VersionLookup: Send + Sync {
    fn id(&self) -> &'static str;

    fn version_for(&self, locked: &LockedRef) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl VersionLookup for NoLookup {
    fn id(&self) -> &'static str {
        "none"
    }

    fn version_for(&self, _locked: &LockedRef) -> Result<Option<String>> {
        Ok(None)
    }
}

/// A CLI token wins over the configured one. Without any token the
/// remote lookup is never selected.
pub fn lookup_for(settings: &Settings, token: Option<&str>) -> Result<Box<dyn VersionLookup>> {
    let token = token
        .or(settings.github.token.as_deref())
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match (settings.lookup.provider, token) {
        (LookupProvider::None, _) | (_, None) => Ok(Box::new(NoLookup)),
        (LookupProvider::Auto | LookupProvider::Github, Some(token)) => {
            let client = github::GitHubTagLookup::new(
                settings.github.host.as_deref().unwrap_or_default(),
                token,
                settings.github.max_pages,
                std::time::Duration::from_secs(settings.github.timeout_secs),
            )?;
            Ok(Box::new(client))
        }
    }
}
