mod api;
mod feed;
mod oembed;

pub use api::{DataApi, DataApiSource};
pub use feed::FeedSource;
pub use oembed::OEmbedSource;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::core::{ChannelId, SourceError, UploadSource, VideoRecord};

/// An explicit, ordered fallback chain over the interchangeable sources.
/// `Unsupported` falls through silently; a real failure is logged and the
/// next source tried; the last error surfaces only when every source fails.
pub struct SourceChain {
    sources: Vec<Box<dyn UploadSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn UploadSource>>) -> Self {
        Self { sources }
    }

    /// Quota-aware selection: the rich metadata API leads only when a key is
    /// configured and low-quota mode is off; the free syndication feed leads
    /// otherwise. The single-item fallback always closes the chain.
    pub fn from_parts(api: Option<DataApi>, cache: ResponseCache, low_quota: bool) -> Self {
        let mut sources: Vec<Box<dyn UploadSource>> = Vec::new();
        match api {
            Some(api) if !low_quota => {
                sources.push(Box::new(DataApiSource::new(api)));
                sources.push(Box::new(FeedSource::new(cache)));
            }
            Some(api) => {
                sources.push(Box::new(FeedSource::new(cache)));
                sources.push(Box::new(DataApiSource::new(api)));
            }
            None => sources.push(Box::new(FeedSource::new(cache))),
        }
        sources.push(Box::new(OEmbedSource::new()));
        Self { sources }
    }
}

#[async_trait]
impl UploadSource for SourceChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn fetch_uploads(
        &self,
        channel: &ChannelId,
        max_results: usize,
    ) -> Result<Vec<VideoRecord>, SourceError> {
        let mut last_error = None;
        for source in &self.sources {
            match source.fetch_uploads(channel, max_results).await {
                Ok(records) => {
                    debug!("{} served {} records for {}", source.name(), records.len(), channel);
                    return Ok(records);
                }
                Err(SourceError::Unsupported(_)) => {}
                Err(err) => {
                    warn!("{} failed for {}: {}", source.name(), channel, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or(SourceError::Unsupported(self.name())))
    }

    async fn video_meta(&self, video_id: &str) -> Result<VideoRecord, SourceError> {
        let mut last_error = None;
        for source in &self.sources {
            match source.video_meta(video_id).await {
                Ok(record) => return Ok(record),
                Err(SourceError::Unsupported(_)) => {}
                Err(err) => {
                    warn!("{} meta lookup failed for {}: {}", source.name(), video_id, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or(SourceError::Unsupported(self.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::composite_id;

    struct StaticSource(usize);

    #[async_trait]
    impl UploadSource for StaticSource {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn fetch_uploads(
            &self,
            channel: &ChannelId,
            max_results: usize,
        ) -> Result<Vec<VideoRecord>, SourceError> {
            Ok((0..self.0.min(max_results))
                .map(|n| VideoRecord {
                    id: composite_id(channel, &format!("vid{n:08}")),
                    title: format!("video {n}"),
                    published_at: None,
                    thumbnail_url: None,
                    description: None,
                    channel_title: None,
                })
                .collect())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl UploadSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn fetch_uploads(
            &self,
            _channel: &ChannelId,
            _max_results: usize,
        ) -> Result<Vec<VideoRecord>, SourceError> {
            Err(SourceError::QuotaExhausted)
        }
    }

    struct NoListing;

    #[async_trait]
    impl UploadSource for NoListing {
        fn name(&self) -> &'static str {
            "no-listing"
        }

        async fn fetch_uploads(
            &self,
            _channel: &ChannelId,
            _max_results: usize,
        ) -> Result<Vec<VideoRecord>, SourceError> {
            Err(SourceError::Unsupported(self.name()))
        }
    }

    fn channel() -> ChannelId {
        ChannelId::parse("UCXuqSBlHAE6Xw-yeJA0Tunw").unwrap()
    }

    #[tokio::test]
    async fn falls_through_failures_to_the_next_source() {
        let chain = SourceChain::new(vec![
            Box::new(BrokenSource),
            Box::new(NoListing),
            Box::new(StaticSource(3)),
        ]);
        let records = chain.fetch_uploads(&channel(), 10).await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn legitimate_empty_results_do_not_fall_through() {
        let chain = SourceChain::new(vec![Box::new(StaticSource(0)), Box::new(StaticSource(5))]);
        let records = chain.fetch_uploads(&channel(), 10).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn surfaces_the_last_real_error_when_all_fail() {
        let chain = SourceChain::new(vec![Box::new(NoListing), Box::new(BrokenSource)]);
        let err = chain.fetch_uploads(&channel(), 10).await.unwrap_err();
        assert!(matches!(err, SourceError::QuotaExhausted));
    }

    #[tokio::test]
    async fn meta_falls_through_unsupported_sources() {
        let chain = SourceChain::new(vec![Box::new(NoListing), Box::new(BrokenSource)]);
        // Neither stub implements video_meta, so the default Unsupported
        // answer falls all the way through.
        let err = chain.video_meta("aaa11111111").await.unwrap_err();
        assert!(matches!(err, SourceError::Unsupported(_)));
    }
}
