//! Two memo stores with deliberately different eviction: a short-TTL cache
//! for upstream response bodies and a process-lifetime cache for resolved
//! handles.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::ChannelId;

/// Cache key for an upstream query, derived from the exact request URL.
pub fn response_key(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

struct TimedEntry {
    body: String,
    stored_at: Instant,
}

/// Expiring key→body memo for identical upstream queries. Expiry is
/// evaluated lazily on read; there is no background sweep.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, TimedEntry>>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                debug!("response cache hit");
                Some(entry.body.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, body: String) {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            TimedEntry {
                body,
                stored_at: Instant::now(),
            },
        );
    }
}

/// Unbounded, non-expiring map from a normalized reference token to its
/// resolved channel id. Resolution is idempotent, so entries stay valid for
/// the process lifetime.
#[derive(Clone, Default)]
pub struct HandleCache {
    entries: Arc<Mutex<HashMap<String, ChannelId>>>,
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &str) -> Option<ChannelId> {
        self.entries.lock().unwrap().get(token).cloned()
    }

    pub fn put(&self, token: &str, id: ChannelId) {
        self.entries.lock().unwrap().insert(token.to_string(), id);
    }
}
