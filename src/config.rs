use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use std::{env, fs::File, path::Path};

use crate::constants::{
    DEFAULT_DAILY_QUOTA, DEFAULT_RESPONSE_TTL, DEFAULT_VIDEOS_PER_CHANNEL, MAX_RESULTS_CAP,
    OVERALL_FEED_CAP,
};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Defaults {
    pub videos_per_channel: Option<usize>,
    pub overall_cap: Option<usize>,
    /// Humantime form, e.g. "45s".
    pub response_ttl: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Root {
    pub defaults: Option<Defaults>,
    pub low_quota: Option<bool>,
    pub daily_quota: Option<u32>,
    /// Seed lists: name → raw channel references, resolved at startup.
    pub lists: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub videos_per_channel: usize,
    pub overall_cap: usize,
    pub response_ttl: Duration,
    pub low_quota: bool,
    pub daily_quota: u32,
    pub lists: HashMap<String, Vec<String>>,
}

impl AppConfig {
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let root = match path {
            Some(p) => Some(Self::read_yaml(Path::new(p))?),
            None => {
                let mut found = None;
                for candidate in ["tubefeed.yaml", "tubefeed.yml"] {
                    let path = Path::new(candidate);
                    if path.exists() {
                        found = Some(Self::read_yaml(path)?);
                        break;
                    }
                }
                found
            }
        };
        Self::from_root(root)
    }

    fn read_yaml(path: &Path) -> anyhow::Result<Root> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(serde_yaml::from_reader(file)?)
    }

    fn from_root(root: Option<Root>) -> anyhow::Result<Self> {
        let r = root.unwrap_or_default();
        let defaults = r.defaults.unwrap_or_default();

        let api_key = env::var("YOUTUBE_API_KEY").ok().filter(|k| !k.is_empty());

        let videos_per_channel = env::var("VIDEOS_PER_CHANNEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(defaults.videos_per_channel)
            .unwrap_or(DEFAULT_VIDEOS_PER_CHANNEL);

        let low_quota = env::var("LOW_QUOTA_MODE")
            .ok()
            .map(|v| v != "false" && v != "0")
            .or(r.low_quota)
            .unwrap_or(false);

        let response_ttl = match env::var("TUBEFEED_RESPONSE_TTL")
            .ok()
            .or(defaults.response_ttl)
        {
            Some(raw) => humantime::parse_duration(&raw)
                .with_context(|| format!("invalid response TTL '{raw}'"))?,
            None => DEFAULT_RESPONSE_TTL,
        };

        Ok(Self {
            api_key,
            videos_per_channel: clamp_per_channel(videos_per_channel),
            overall_cap: defaults.overall_cap.unwrap_or(OVERALL_FEED_CAP),
            response_ttl,
            low_quota,
            daily_quota: r.daily_quota.unwrap_or(DEFAULT_DAILY_QUOTA),
            lists: r.lists.unwrap_or_default(),
        })
    }
}

/// The upstream listing endpoints reject anything over 50; zero is treated
/// as "one page of nothing" and bumped to 1.
pub fn clamp_per_channel(requested: usize) -> usize {
    requested.clamp(1, MAX_RESULTS_CAP)
}
