use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::cache::{response_key, ResponseCache};
use crate::constants::{FEED_URL_BASE, HTTP_TIMEOUT, MAX_RESULTS_CAP};
use crate::core::{
    clip_description, composite_id, parse_timestamp, ChannelId, SourceError, UploadSource,
    VideoRecord,
};

/// Low-cost upload source: one unauthenticated request per channel against
/// the public syndication feed. The feed carries at most the ~15 most recent
/// entries and no view counts or durations, but costs no quota.
pub struct FeedSource {
    http: Client,
    cache: ResponseCache,
}

impl FeedSource {
    pub fn new(cache: ResponseCache) -> Self {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self { http, cache }
    }
}

#[async_trait]
impl UploadSource for FeedSource {
    fn name(&self) -> &'static str {
        "syndication-feed"
    }

    async fn fetch_uploads(
        &self,
        channel: &ChannelId,
        max_results: usize,
    ) -> Result<Vec<VideoRecord>, SourceError> {
        let url = format!("{FEED_URL_BASE}?channel_id={channel}");
        let key = response_key(&url);

        let body = match self.cache.get(&key) {
            Some(body) => body,
            None => {
                let response = self.http.get(&url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(SourceError::Status {
                        endpoint: "videos.xml",
                        status,
                    });
                }
                let body = response.text().await?;
                self.cache.put(&key, body.clone());
                body
            }
        };

        let feed = parse_feed(&body)?;
        Ok(entries_to_records(
            channel,
            feed.entries,
            max_results.min(MAX_RESULTS_CAP),
        ))
    }
}

fn parse_feed(xml: &str) -> Result<Feed, SourceError> {
    quick_xml::de::from_str(xml).map_err(|e| SourceError::Parse(e.to_string()))
}

fn entries_to_records(channel: &ChannelId, entries: Vec<Entry>, limit: usize) -> Vec<VideoRecord> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let video_id = entry.video_id?;
            let media = entry.media.unwrap_or_default();
            Some(VideoRecord {
                id: composite_id(channel, &video_id),
                title: entry.title.unwrap_or_default(),
                published_at: entry.published.as_deref().and_then(parse_timestamp),
                thumbnail_url: media.thumbnail.and_then(|thumb| thumb.url),
                description: media.description.as_deref().and_then(clip_description),
                channel_title: entry.author.and_then(|author| author.name),
            })
        })
        .take(limit)
        .collect()
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    author: Option<Author>,
    #[serde(rename = "group")]
    media: Option<MediaGroup>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MediaGroup {
    #[serde(rename = "thumbnail")]
    thumbnail: Option<MediaThumbnail>,
    #[serde(rename = "description")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaThumbnail {
    #[serde(rename = "@url")]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015"
      xmlns:media="http://search.yahoo.com/mrss/"
      xmlns="http://www.w3.org/2005/Atom">
  <title>Example Channel</title>
  <author><name>Example Channel</name></author>
  <entry>
    <id>yt:video:aaa11111111</id>
    <yt:videoId>aaa11111111</yt:videoId>
    <yt:channelId>UCXuqSBlHAE6Xw-yeJA0Tunw</yt:channelId>
    <title>Newest upload</title>
    <author><name>Example Channel</name></author>
    <published>2024-06-02T10:00:00+00:00</published>
    <media:group>
      <media:title>Newest upload</media:title>
      <media:thumbnail url="https://i4.ytimg.com/vi/aaa11111111/hqdefault.jpg" width="480" height="360"/>
      <media:description>A description of the newest upload.</media:description>
    </media:group>
  </entry>
  <entry>
    <id>yt:video:bbb22222222</id>
    <yt:videoId>bbb22222222</yt:videoId>
    <title>Older upload</title>
    <published>2024-06-01T09:00:00+00:00</published>
  </entry>
  <entry>
    <title>Entry with no video id</title>
  </entry>
</feed>"#;

    fn channel() -> ChannelId {
        ChannelId::parse("UCXuqSBlHAE6Xw-yeJA0Tunw").unwrap()
    }

    #[test]
    fn parses_a_typical_feed() {
        let feed = parse_feed(SAMPLE_FEED).unwrap();
        let records = entries_to_records(&channel(), feed.entries, 50);

        assert_eq!(records.len(), 2, "entry without a video id is dropped");
        assert_eq!(records[0].id, "yt:UCXuqSBlHAE6Xw-yeJA0Tunw:aaa11111111");
        assert_eq!(records[0].title, "Newest upload");
        assert_eq!(
            records[0].thumbnail_url.as_deref(),
            Some("https://i4.ytimg.com/vi/aaa11111111/hqdefault.jpg")
        );
        assert_eq!(records[0].channel_title.as_deref(), Some("Example Channel"));
        assert!(records[0].published_at.is_some());

        assert_eq!(records[1].title, "Older upload");
        assert!(records[1].thumbnail_url.is_none());
        assert!(records[1].description.is_none());
    }

    #[test]
    fn records_keep_feed_order_and_honor_the_limit() {
        let feed = parse_feed(SAMPLE_FEED).unwrap();
        let records = entries_to_records(&channel(), feed.entries, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "yt:UCXuqSBlHAE6Xw-yeJA0Tunw:aaa11111111");
    }

    #[test]
    fn empty_feed_yields_no_records() {
        let xml = r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom"><title>Quiet</title></feed>"#;
        let feed = parse_feed(xml).unwrap();
        assert!(entries_to_records(&channel(), feed.entries, 50).is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error_not_a_panic() {
        assert!(matches!(
            parse_feed("this is not xml"),
            Err(SourceError::Parse(_))
        ));
    }
}
