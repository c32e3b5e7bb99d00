//! Shared constants for the tubefeed engine.

use std::time::Duration;

pub const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const FEED_URL_BASE: &str = "https://www.youtube.com/feeds/videos.xml";
pub const OEMBED_URL: &str = "https://www.youtube.com/oembed";
pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch";
pub const CHANNEL_PAGE_BASE: &str = "https://www.youtube.com";

/// User agent sent on page scrapes; profile pages serve a stripped document
/// without the embedded channel id to unknown clients.
pub const SCRAPE_USER_AGENT: &str = "Mozilla/5.0";

pub const DEFAULT_VIDEOS_PER_CHANNEL: usize = 20;

/// Upstream hard cap on a single listing request.
pub const MAX_RESULTS_CAP: usize = 50;

/// Bound on a merged aggregation, independent of the per-channel limit.
pub const OVERALL_FEED_CAP: usize = 200;

pub const DEFAULT_RESPONSE_TTL: Duration = Duration::from_secs(45);

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Unit costs per metadata-API endpoint, as billed against the daily quota.
pub const UNITS_CHANNELS_LIST: u32 = 1;
pub const UNITS_PLAYLIST_ITEMS: u32 = 1;
pub const UNITS_VIDEOS_LIST: u32 = 1;
pub const UNITS_SEARCH_LIST: u32 = 100;

pub const DEFAULT_DAILY_QUOTA: u32 = 10_000;

/// Longest description carried on a record.
pub const DESCRIPTION_LIMIT: usize = 200;
