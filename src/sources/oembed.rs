use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::constants::{HTTP_TIMEOUT, OEMBED_URL, WATCH_URL_BASE};
use crate::core::{ChannelId, SourceError, UploadSource, VideoRecord};

/// Single-item fallback: resolves one already-known video id through the
/// unauthenticated oEmbed endpoint. Listing a channel's uploads is beyond
/// what the endpoint offers.
pub struct OEmbedSource {
    http: Client,
}

impl OEmbedSource {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self { http }
    }
}

impl Default for OEmbedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadSource for OEmbedSource {
    fn name(&self) -> &'static str {
        "oembed"
    }

    async fn fetch_uploads(
        &self,
        _channel: &ChannelId,
        _max_results: usize,
    ) -> Result<Vec<VideoRecord>, SourceError> {
        Err(SourceError::Unsupported(self.name()))
    }

    async fn video_meta(&self, video_id: &str) -> Result<VideoRecord, SourceError> {
        let watch_url = format!("{WATCH_URL_BASE}?v={video_id}");
        let mut url = Url::parse(OEMBED_URL).expect("constant oEmbed endpoint");
        url.query_pairs_mut()
            .append_pair("url", &watch_url)
            .append_pair("format", "json");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        // 404 for unknown ids, 401 when embedding is disabled; either way
        // there is no record to hand back.
        if status == StatusCode::NOT_FOUND || status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::NotFound(video_id.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: "oembed",
                status,
            });
        }

        let payload: OEmbedResponse = response.json().await?;
        Ok(oembed_to_record(video_id, payload))
    }
}

fn oembed_to_record(video_id: &str, payload: OEmbedResponse) -> VideoRecord {
    VideoRecord {
        id: format!("yt:{video_id}"),
        title: payload
            .title
            .unwrap_or_else(|| video_id.to_string()),
        published_at: None,
        thumbnail_url: payload.thumbnail_url,
        description: None,
        channel_title: payload.author_name,
    }
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
}
