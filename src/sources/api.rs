use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::cache::{response_key, ResponseCache};
use crate::constants::{
    DATA_API_BASE, HTTP_TIMEOUT, MAX_RESULTS_CAP, UNITS_CHANNELS_LIST, UNITS_PLAYLIST_ITEMS,
    UNITS_SEARCH_LIST, UNITS_VIDEOS_LIST,
};
use crate::core::{
    clip_description, composite_id, parse_timestamp, ChannelId, SourceError, UploadSource,
    VideoRecord,
};
use crate::quota::QuotaMeter;

/// Key-authenticated client for the metadata API. Every call memoizes its
/// exact query URL in the short-TTL response cache and charges the quota
/// meter before going to the network; a cache hit costs nothing.
#[derive(Clone)]
pub struct DataApi {
    http: Client,
    api_key: String,
    cache: ResponseCache,
    quota: QuotaMeter,
}

impl DataApi {
    pub fn new(api_key: String, cache: ResponseCache, quota: QuotaMeter) -> Self {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            api_key,
            cache,
            quota,
        }
    }

    async fn get(
        &self,
        path: &str,
        endpoint: &'static str,
        units: u32,
        params: &[(&str, &str)],
    ) -> Result<String, SourceError> {
        let mut url = Url::parse(&format!("{DATA_API_BASE}/{path}"))
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        for (name, value) in params {
            url.query_pairs_mut().append_pair(name, value);
        }
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let key = response_key(url.as_str());
        if let Some(body) = self.cache.get(&key) {
            return Ok(body);
        }
        if !self.quota.try_charge(endpoint, units) {
            return Err(SourceError::QuotaExhausted);
        }

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { endpoint, status });
        }
        let body = response.text().await?;
        self.cache.put(&key, body.clone());
        Ok(body)
    }

    pub async fn channel_for_handle(&self, handle: &str) -> Result<Option<ChannelId>, SourceError> {
        let body = self
            .get(
                "channels",
                "channels.list",
                UNITS_CHANNELS_LIST,
                &[("part", "id"), ("forHandle", handle)],
            )
            .await?;
        let parsed: ChannelListResponse = decode(&body)?;
        Ok(parsed
            .items
            .into_iter()
            .next()
            .and_then(|item| ChannelId::parse(&item.id)))
    }

    pub async fn channel_for_username(
        &self,
        username: &str,
    ) -> Result<Option<ChannelId>, SourceError> {
        let body = self
            .get(
                "channels",
                "channels.list",
                UNITS_CHANNELS_LIST,
                &[("part", "id"), ("forUsername", username)],
            )
            .await?;
        let parsed: ChannelListResponse = decode(&body)?;
        Ok(parsed
            .items
            .into_iter()
            .next()
            .and_then(|item| ChannelId::parse(&item.id)))
    }

    /// Full-text channel search; by far the costliest lookup, so callers
    /// keep it behind the direct handle lookup.
    pub async fn search_channel(&self, query: &str) -> Result<Option<ChannelId>, SourceError> {
        let body = self
            .get(
                "search",
                "search.list",
                UNITS_SEARCH_LIST,
                &[
                    ("part", "snippet"),
                    ("q", query),
                    ("type", "channel"),
                    ("maxResults", "1"),
                ],
            )
            .await?;
        let parsed: SearchListResponse = decode(&body)?;
        Ok(parsed
            .items
            .into_iter()
            .next()
            .and_then(|item| item.id.channel_id)
            .and_then(|raw| ChannelId::parse(&raw)))
    }

    async fn uploads_playlist(&self, channel: &ChannelId) -> Result<Option<String>, SourceError> {
        let body = self
            .get(
                "channels",
                "channels.list",
                UNITS_CHANNELS_LIST,
                &[("part", "contentDetails"), ("id", channel.as_str())],
            )
            .await?;
        let parsed: ChannelListResponse = decode(&body)?;
        Ok(parsed
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details)
            .and_then(|details| details.related_playlists)
            .and_then(|playlists| playlists.uploads))
    }
}

/// Rich-metadata upload source: resolves the channel's uploads playlist,
/// then pages through it.
pub struct DataApiSource {
    api: DataApi,
}

impl DataApiSource {
    pub fn new(api: DataApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl UploadSource for DataApiSource {
    fn name(&self) -> &'static str {
        "data-api"
    }

    async fn fetch_uploads(
        &self,
        channel: &ChannelId,
        max_results: usize,
    ) -> Result<Vec<VideoRecord>, SourceError> {
        let Some(playlist) = self.api.uploads_playlist(channel).await? else {
            return Ok(Vec::new());
        };
        let limit = max_results.min(MAX_RESULTS_CAP);
        let body = self
            .api
            .get(
                "playlistItems",
                "playlistItems.list",
                UNITS_PLAYLIST_ITEMS,
                &[
                    ("part", "snippet"),
                    ("playlistId", &playlist),
                    ("maxResults", &limit.to_string()),
                ],
            )
            .await?;
        let parsed: PlaylistItemsResponse = decode(&body)?;
        Ok(playlist_items_to_records(channel, parsed.items, limit))
    }

    async fn video_meta(&self, video_id: &str) -> Result<VideoRecord, SourceError> {
        let body = self
            .api
            .get(
                "videos",
                "videos.list",
                UNITS_VIDEOS_LIST,
                &[("part", "snippet"), ("id", video_id)],
            )
            .await?;
        let parsed: VideoListResponse = decode(&body)?;
        let item = parsed
            .items
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(video_id.to_string()))?;
        Ok(video_item_to_record(item))
    }
}

fn decode<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))
}

fn playlist_items_to_records(
    channel: &ChannelId,
    items: Vec<PlaylistItem>,
    limit: usize,
) -> Vec<VideoRecord> {
    items
        .into_iter()
        .filter_map(|item| item.snippet)
        .filter_map(|snippet| {
            let video_id = snippet.resource_id.as_ref()?.video_id.clone()?;
            Some(VideoRecord {
                id: composite_id(channel, &video_id),
                title: snippet.title.unwrap_or_default(),
                published_at: snippet.published_at.as_deref().and_then(parse_timestamp),
                thumbnail_url: best_thumbnail(snippet.thumbnails),
                description: snippet.description.as_deref().and_then(clip_description),
                channel_title: snippet.channel_title,
            })
        })
        .take(limit)
        .collect()
}

fn video_item_to_record(item: VideoItem) -> VideoRecord {
    let video_id = item.id;
    let snippet = item.snippet.unwrap_or_default();
    let id = match snippet.channel_id.as_deref().and_then(ChannelId::parse) {
        Some(channel) => composite_id(&channel, &video_id),
        None => format!("yt:{video_id}"),
    };
    VideoRecord {
        id,
        title: snippet.title.unwrap_or_default(),
        published_at: snippet.published_at.as_deref().and_then(parse_timestamp),
        thumbnail_url: best_thumbnail(snippet.thumbnails),
        description: snippet.description.as_deref().and_then(clip_description),
        channel_title: snippet.channel_title,
    }
}

/// Largest useful rendition first.
fn best_thumbnail(thumbnails: Option<HashMap<String, Thumbnail>>) -> Option<String> {
    let mut thumbnails = thumbnails?;
    for key in ["high", "medium", "default"] {
        if let Some(thumb) = thumbnails.remove(key) {
            return Some(thumb.url);
        }
    }
    None
}

#[derive(Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Deserialize)]
struct ChannelItem {
    #[serde(default)]
    id: String,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Deserialize)]
struct ContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Deserialize)]
struct SearchItemId {
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    snippet: Option<PlaylistSnippet>,
}

#[derive(Deserialize)]
struct PlaylistSnippet {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    thumbnails: Option<HashMap<String, Thumbnail>>,
    #[serde(rename = "resourceId")]
    resource_id: Option<ResourceId>,
}

#[derive(Deserialize)]
struct ResourceId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    #[serde(default)]
    id: String,
    snippet: Option<VideoSnippet>,
}

#[derive(Deserialize, Default)]
struct VideoSnippet {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    thumbnails: Option<HashMap<String, Thumbnail>>,
}
