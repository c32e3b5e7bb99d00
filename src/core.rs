use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::constants::DESCRIPTION_LIMIT;

/// Canonical channel identifier: 24 characters, fixed `UC` prefix, the rest
/// drawn from `[0-9A-Za-z_-]`. The only identifier the rest of the system
/// trusts; once validated it is never transformed again.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.len() == 24
            && trimmed.starts_with("UC")
            && trimmed
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            Some(Self(trimmed.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized upload record, the one shape every source maps into.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    /// Composite `yt:<channelId>:<videoId>`, unique within one aggregation.
    pub id: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub channel_title: Option<String>,
}

pub fn composite_id(channel: &ChannelId, video_id: &str) -> String {
    format!("yt:{}:{}", channel, video_id)
}

/// Clamp a description to [`DESCRIPTION_LIMIT`] characters without splitting
/// a code point.
pub fn clip_description(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    Some(raw.chars().take(DESCRIPTION_LIMIT).collect())
}

/// Upstream timestamps arrive as RFC 3339 text; anything unparseable maps to
/// `None` rather than failing the record.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("daily metadata-API quota exhausted")]
    QuotaExhausted,
    #[error("video {0} not found")]
    NotFound(String),
    #[error("{0} cannot serve this request")]
    Unsupported(&'static str),
    #[error("unreadable response: {0}")]
    Parse(String),
}

/// An upstream provider of a channel's recent uploads. Implementations must
/// map missing optional upstream fields to `None`, never to an error.
#[async_trait]
pub trait UploadSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Most-recent-first, at most `min(max_results, 50)` records.
    async fn fetch_uploads(
        &self,
        channel: &ChannelId,
        max_results: usize,
    ) -> Result<Vec<VideoRecord>, SourceError>;

    /// Single-item lookup for an already-known video id.
    async fn video_meta(&self, video_id: &str) -> Result<VideoRecord, SourceError> {
        let _ = video_id;
        Err(SourceError::Unsupported(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_ids() {
        let id = ChannelId::parse("UCXuqSBlHAE6Xw-yeJA0Tunw").unwrap();
        assert_eq!(id.as_str(), "UCXuqSBlHAE6Xw-yeJA0Tunw");
        assert!(ChannelId::parse("  UCXuqSBlHAE6Xw-yeJA0Tunw  ").is_some());
    }

    #[test]
    fn rejects_near_misses() {
        assert!(ChannelId::parse("UCXuqSBlHAE6Xw-yeJA0Tun").is_none());
        assert!(ChannelId::parse("UDXuqSBlHAE6Xw-yeJA0Tunw").is_none());
        assert!(ChannelId::parse("UCXuqSBlHAE6Xw yeJA0Tunw").is_none());
        assert!(ChannelId::parse("@techlinked").is_none());
        assert!(ChannelId::parse("").is_none());
    }

    #[test]
    fn composite_ids_carry_both_parts() {
        let channel = ChannelId::parse("UCXuqSBlHAE6Xw-yeJA0Tunw").unwrap();
        assert_eq!(
            composite_id(&channel, "dQw4w9WgXcQ"),
            "yt:UCXuqSBlHAE6Xw-yeJA0Tunw:dQw4w9WgXcQ"
        );
    }

    #[test]
    fn clips_long_descriptions_on_char_boundaries() {
        let long = "é".repeat(500);
        let clipped = clip_description(&long).unwrap();
        assert_eq!(clipped.chars().count(), 200);
        assert!(clip_description("").is_none());
        assert_eq!(clip_description("short"), Some("short".to_string()));
    }
}
