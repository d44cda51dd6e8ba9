use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde_json::Value;

use crate::flake::LockedRef;
use crate::lookup::{LookupError, Result, VersionLookup};

const TAGS_PER_PAGE: usize = 100;

type CacheKey = (String, String, String);

#[derive(Debug)]
pub struct GitHubTagLookup {
    pub host: String,
    token: String,
    max_pages: u32,
    client: Client,
    cache: Mutex<HashMap<CacheKey, Option<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    sha: String,
}

impl GitHubTagLookup {
    pub fn new(
        host: impl Into<String>,
        token: impl Into<String>,
        max_pages: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LookupError::Client)?;
        Ok(Self {
            host: normalize_host(&host.into()),
            token: token.into(),
            max_pages: max_pages.max(1),
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path.trim_start_matches('/'))
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.api_url(path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "flakedot")
            .send()
            .map_err(|source| LookupError::Http {
                url: url.clone(),
                source,
            })?;

        parse_json_response(response)
    }

    fn tags_at_rev(&self, owner: &str, repo: &str, rev: &str) -> Result<Vec<String>> {
        let path = format!("/repos/{}/{}/tags", encode_path(owner), encode_path(repo));
        collect_tags_at_rev(rev, self.max_pages, |page| {
            let response = self.get_json(
                &path,
                &[
                    ("per_page", TAGS_PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ],
            )?;
            parse_tags(&response).ok_or_else(|| LookupError::Malformed {
                url: self.api_url(&path),
                message: "expected an array of tags".to_string(),
            })
        })
    }

    fn cached(&self, key: &CacheKey) -> Option<Option<String>> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
    }

    fn remember(&self, key: CacheKey, version: Option<String>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, version);
        }
    }
}

impl VersionLookup for GitHubTagLookup {
    fn id(&self) -> &'static str {
        "github"
    }

    fn version_for(&self, locked: &LockedRef) -> Result<Option<String>> {
        if locked.kind != "github" {
            return Ok(None);
        }
        let (Some(owner), Some(repo), Some(rev)) = (
            locked.owner.as_deref(),
            locked.repo.as_deref(),
            locked.rev.as_deref(),
        ) else {
            return Ok(None);
        };

        let key = (owner.to_string(), repo.to_string(), rev.to_string());
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let version = latest_tag(self.tags_at_rev(owner, repo, rev)?);
        self.remember(key, version.clone());
        Ok(version)
    }
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return "https://api.github.com".to_string();
    }

    if trimmed == "github.com" || trimmed == "api.github.com" {
        return "https://api.github.com".to_string();
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        if trimmed.ends_with("/api/v3") || trimmed.ends_with("/api") {
            return trimmed.to_string();
        }
        if trimmed.starts_with("https://api.") || trimmed.starts_with("http://api.") {
            return trimmed.to_string();
        }
        return format!("{trimmed}/api/v3");
    }

    if trimmed.starts_with("api.") {
        return format!("https://{trimmed}");
    }

    format!("https://{trimmed}/api/v3")
}

fn parse_json_response(response: Response) -> Result<Value> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().map_err(|source| LookupError::Http {
        url: url.clone(),
        source,
    })?;

    if !status.is_success() {
        return Err(LookupError::Status {
            url,
            status,
            body: body.trim().to_string(),
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|err| LookupError::Malformed {
        url,
        message: err.to_string(),
    })
}

fn parse_tags(value: &Value) -> Option<Vec<Tag>> {
    let tags = value
        .as_array()?
        .iter()
        .filter_map(|tag| {
            let name = tag.get("name")?.as_str()?;
            let sha = tag.get("commit")?.get("sha")?.as_str()?;
            Some(Tag {
                name: name.to_string(),
                sha: sha.to_string(),
            })
        })
        .collect();
    Some(tags)
}

/// Pages are fetched until one comes back short or `max_pages` is reached.
fn collect_tags_at_rev<F>(rev: &str, max_pages: u32, mut fetch_page: F) -> Result<Vec<String>>
where
    F: FnMut(u32) -> Result<Vec<Tag>>,
{
    let mut matching = Vec::new();
    for page in 1..=max_pages {
        let tags = fetch_page(page)?;
        let exhausted = tags.len() < TAGS_PER_PAGE;
        matching.extend(tags_on_rev(tags, rev));
        if exhausted {
            break;
        }
    }
    Ok(matching)
}

fn tags_on_rev(tags: Vec<Tag>, rev: &str) -> Vec<String> {
    tags.into_iter()
        .filter(|tag| tag.sha.eq_ignore_ascii_case(rev))
        .map(|tag| tag.name)
        .collect()
}

fn latest_tag(tags: Vec<String>) -> Option<String> {
    let newest = tags
        .iter()
        .filter_map(|name| {
            let trimmed = name.trim_start_matches(['v', 'V']);
            semver::Version::parse(trimmed)
                .ok()
                .map(|version| (version, name))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, name)| name.clone());
    newest.or_else(|| tags.into_iter().next())
}

fn encode_path(value: &str) -> String {
    let mut encoded = String::new();
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push('%');
            encoded.push_str(&format!("{:02X}", byte));
        }
    }
    encoded
}
