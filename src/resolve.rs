use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::cache::HandleCache;
use crate::constants::{CHANNEL_PAGE_BASE, HTTP_TIMEOUT, SCRAPE_USER_AGENT};
use crate::core::{ChannelId, SourceError};
use crate::sources::DataApi;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("'{0}' does not look like a channel id, URL, or @handle")]
    InputFormat(String),
    #[error("could not resolve '{0}' to a channel id")]
    Resolution(String),
}

/// A classified channel reference. Everything except `Canonical` needs a
/// network lookup to become an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Canonical(ChannelId),
    /// Bare or URL-embedded handle, stored without the `@`.
    Handle(String),
    /// Legacy `/user/<name>` path segment.
    Username(String),
    /// Syntactically valid URL matching no known shape; scraped directly.
    Page(Url),
}

impl Reference {
    fn cache_key(&self) -> String {
        match self {
            Reference::Canonical(id) => id.to_string(),
            Reference::Handle(handle) => format!("@{}", handle.to_lowercase()),
            Reference::Username(name) => format!("user:{}", name.to_lowercase()),
            Reference::Page(url) => format!("url:{url}"),
        }
    }
}

/// Classify a raw reference without touching the network. First match wins:
/// canonical id, then URL path shapes, then bare handle.
pub fn classify(raw: &str) -> Result<Reference, ResolveError> {
    let trimmed = raw.trim();
    if let Some(id) = ChannelId::parse(trimmed) {
        return Ok(Reference::Canonical(id));
    }

    if let Ok(url) = Url::parse(trimmed) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(classify_url(url));
        }
    }

    if let Some(handle) = trimmed.strip_prefix('@') {
        if is_handle(handle) {
            return Ok(Reference::Handle(handle.to_string()));
        }
    }

    Err(ResolveError::InputFormat(trimmed.to_string()))
}

fn classify_url(url: Url) -> Reference {
    let path = url.path();

    if let Some(rest) = path.strip_prefix("/channel/") {
        let segment = rest.split('/').next().unwrap_or_default();
        if let Some(id) = ChannelId::parse(segment) {
            return Reference::Canonical(id);
        }
    }
    if let Some(rest) = path.strip_prefix("/@") {
        let segment = rest.split('/').next().unwrap_or_default();
        if is_handle(segment) {
            return Reference::Handle(segment.to_string());
        }
    }
    if let Some(rest) = path.strip_prefix("/user/") {
        let segment = rest.split('/').next().unwrap_or_default();
        if is_username(segment) {
            return Reference::Username(segment.to_string());
        }
    }

    Reference::Page(url)
}

fn is_handle(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

fn is_username(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-'))
}

/// Pull every channel reference out of a free-form blob: `@handles`, bare
/// canonical ids, and the two common profile-URL shapes. Deduplicates
/// case-insensitively, preserving first-seen order.
pub fn extract_tokens(text: &str) -> Vec<Reference> {
    let handle_pattern = Regex::new(r"@([A-Za-z0-9._-]+)").expect("valid pattern");
    let id_pattern = Regex::new(r"\b(UC[0-9A-Za-z_-]{22})\b").expect("valid pattern");
    let url_id_pattern =
        Regex::new(r"(?i)youtube\.com/channel/(UC[0-9A-Za-z_-]{22})").expect("valid pattern");
    let url_handle_pattern =
        Regex::new(r"(?i)youtube\.com/@([A-Za-z0-9._-]+)").expect("valid pattern");

    let mut seen = std::collections::HashSet::new();
    let mut tokens = Vec::new();
    let mut push = |token: Reference| {
        if seen.insert(token.cache_key()) {
            tokens.push(token);
        }
    };

    for capture in handle_pattern.captures_iter(text) {
        push(Reference::Handle(capture[1].to_string()));
    }
    for capture in id_pattern.captures_iter(text) {
        if let Some(id) = ChannelId::parse(&capture[1]) {
            push(Reference::Canonical(id));
        }
    }
    for capture in url_id_pattern.captures_iter(text) {
        if let Some(id) = ChannelId::parse(&capture[1]) {
            push(Reference::Canonical(id));
        }
    }
    for capture in url_handle_pattern.captures_iter(text) {
        push(Reference::Handle(capture[1].to_string()));
    }

    tokens
}

/// One way of turning a non-canonical reference into an id. `Ok(None)` means
/// the strategy does not apply to (or found nothing for) this reference;
/// errors fall through to the next strategy in the chain.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, reference: &Reference) -> Result<Option<ChannelId>, SourceError>;
}

/// `channels.list` by handle or legacy username; one quota unit.
struct ApiLookup {
    api: DataApi,
}

#[async_trait]
impl LookupStrategy for ApiLookup {
    fn name(&self) -> &'static str {
        "channels.list"
    }

    async fn lookup(&self, reference: &Reference) -> Result<Option<ChannelId>, SourceError> {
        match reference {
            Reference::Handle(handle) => self.api.channel_for_handle(handle).await,
            Reference::Username(name) => self.api.channel_for_username(name).await,
            _ => Ok(None),
        }
    }
}

/// Full-text search fallback; costly, so it sits behind the direct lookup.
struct SearchLookup {
    api: DataApi,
}

#[async_trait]
impl LookupStrategy for SearchLookup {
    fn name(&self) -> &'static str {
        "search.list"
    }

    async fn lookup(&self, reference: &Reference) -> Result<Option<ChannelId>, SourceError> {
        let query = match reference {
            Reference::Handle(handle) => format!("@{handle}"),
            Reference::Username(name) => name.clone(),
            _ => return Ok(None),
        };
        self.api.search_channel(&query).await
    }
}

/// Fetches the profile page and extracts the embedded canonical id. The only
/// strategy that can serve an arbitrary page URL, and the whole chain when no
/// API key is configured.
struct ScrapeLookup {
    http: Client,
    embedded_id: Regex,
}

impl ScrapeLookup {
    fn new() -> Self {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            embedded_id: Regex::new(r#""channelId":"(UC[0-9A-Za-z_-]{22})""#)
                .expect("valid pattern"),
        }
    }

    fn page_url(reference: &Reference) -> Option<String> {
        match reference {
            Reference::Handle(handle) => Some(format!("{CHANNEL_PAGE_BASE}/@{handle}")),
            Reference::Username(name) => Some(format!("{CHANNEL_PAGE_BASE}/user/{name}")),
            Reference::Page(url) => Some(url.to_string()),
            Reference::Canonical(_) => None,
        }
    }
}

#[async_trait]
impl LookupStrategy for ScrapeLookup {
    fn name(&self) -> &'static str {
        "page-scrape"
    }

    async fn lookup(&self, reference: &Reference) -> Result<Option<ChannelId>, SourceError> {
        let Some(page_url) = Self::page_url(reference) else {
            return Ok(None);
        };
        let response = self
            .http
            .get(&page_url)
            .header("User-Agent", SCRAPE_USER_AGENT)
            .header("Accept", "text/html")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: "page-scrape",
                status,
            });
        }
        let html = response.text().await?;
        Ok(self
            .embedded_id
            .captures(&html)
            .and_then(|capture| ChannelId::parse(&capture[1])))
    }
}

/// Translates raw channel references into canonical ids, consulting the
/// permanent handle cache before walking the lookup chain.
pub struct Resolver {
    strategies: Vec<Box<dyn LookupStrategy>>,
    handles: HandleCache,
}

impl Resolver {
    pub fn new(api: Option<DataApi>, handles: HandleCache) -> Self {
        let mut strategies: Vec<Box<dyn LookupStrategy>> = Vec::new();
        if let Some(api) = api {
            strategies.push(Box::new(ApiLookup { api: api.clone() }));
            strategies.push(Box::new(SearchLookup { api }));
        }
        strategies.push(Box::new(ScrapeLookup::new()));
        Self { strategies, handles }
    }

    /// Build a resolver over an explicit strategy chain, for callers that
    /// need something other than the configured default.
    #[allow(dead_code)]
    pub fn with_strategies(
        strategies: Vec<Box<dyn LookupStrategy>>,
        handles: HandleCache,
    ) -> Self {
        Self { strategies, handles }
    }

    pub async fn resolve(&self, raw: &str) -> Result<ChannelId, ResolveError> {
        match classify(raw)? {
            Reference::Canonical(id) => Ok(id),
            reference => self.resolve_remote(&reference, raw.trim()).await,
        }
    }

    async fn resolve_remote(
        &self,
        reference: &Reference,
        raw: &str,
    ) -> Result<ChannelId, ResolveError> {
        let key = reference.cache_key();
        if let Some(id) = self.handles.get(&key) {
            debug!("handle cache hit for {key}");
            return Ok(id);
        }

        for strategy in &self.strategies {
            match strategy.lookup(reference).await {
                Ok(Some(id)) => {
                    self.handles.put(&key, id.clone());
                    return Ok(id);
                }
                Ok(None) => {}
                Err(err) => {
                    debug!("{} lookup failed for '{}': {}", strategy.name(), raw, err);
                }
            }
        }
        Err(ResolveError::Resolution(raw.to_string()))
    }

    /// Resolve every reference found in a free-form blob, skipping the ones
    /// that fail and deduplicating the result.
    pub async fn resolve_all(&self, text: &str) -> Vec<ChannelId> {
        let mut ids = Vec::new();
        for token in extract_tokens(text) {
            let resolved = match &token {
                Reference::Canonical(id) => Some(id.clone()),
                other => match self.resolve_remote(other, &other.cache_key()).await {
                    Ok(id) => Some(id),
                    Err(err) => {
                        warn!("{err}");
                        None
                    }
                },
            };
            if let Some(id) = resolved {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}
