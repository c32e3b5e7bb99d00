use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::{ChannelId, UploadSource, VideoRecord};

/// One channel that contributed nothing because its fetch failed. Carried on
/// the result so callers can tell "legitimately empty" from "skipped"
/// without reading logs.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelFailure {
    pub channel: ChannelId,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct Aggregation {
    pub records: Vec<VideoRecord>,
    pub failed: Vec<ChannelFailure>,
}

/// Merges recent uploads across a set of channels. Fetches are serial; a
/// failing channel is recorded and skipped, never fatal.
pub struct Aggregator {
    source: Arc<dyn UploadSource>,
    overall_cap: usize,
}

impl Aggregator {
    pub fn new(source: Arc<dyn UploadSource>, overall_cap: usize) -> Self {
        Self {
            source,
            overall_cap,
        }
    }

    pub async fn aggregate<'a>(
        &self,
        channels: impl IntoIterator<Item = &'a ChannelId>,
        per_channel_limit: usize,
    ) -> Aggregation {
        let mut records = Vec::new();
        let mut failed = Vec::new();

        for channel in channels {
            match self.source.fetch_uploads(channel, per_channel_limit).await {
                Ok(batch) => {
                    debug!("{} contributed {} records", channel, batch.len());
                    records.extend(batch);
                }
                Err(err) => {
                    warn!("skipping {}: {}", channel, err);
                    failed.push(ChannelFailure {
                        channel: channel.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        // Stable sort: equal timestamps keep per-channel fetch order, and a
        // missing timestamp sorts as oldest.
        records.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        records.truncate(self.overall_cap);

        Aggregation { records, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{composite_id, SourceError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use time::macros::datetime;
    use time::OffsetDateTime;

    struct ScriptedSource {
        uploads: HashMap<ChannelId, Vec<VideoRecord>>,
    }

    #[async_trait]
    impl UploadSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_uploads(
            &self,
            channel: &ChannelId,
            max_results: usize,
        ) -> Result<Vec<VideoRecord>, SourceError> {
            match self.uploads.get(channel) {
                Some(records) => Ok(records.iter().take(max_results).cloned().collect()),
                None => Err(SourceError::Status {
                    endpoint: "scripted",
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                }),
            }
        }
    }

    fn channel_a() -> ChannelId {
        ChannelId::parse("UCAAAAAAAAAAAAAAAAAAAAAA").unwrap()
    }

    fn channel_b() -> ChannelId {
        ChannelId::parse("UCBBBBBBBBBBBBBBBBBBBBBB").unwrap()
    }

    fn record(
        channel: &ChannelId,
        video: &str,
        published_at: Option<OffsetDateTime>,
    ) -> VideoRecord {
        VideoRecord {
            id: composite_id(channel, video),
            title: video.to_string(),
            published_at,
            thumbnail_url: None,
            description: None,
            channel_title: None,
        }
    }

    fn aggregator(uploads: HashMap<ChannelId, Vec<VideoRecord>>, cap: usize) -> Aggregator {
        Aggregator::new(Arc::new(ScriptedSource { uploads }), cap)
    }

    #[tokio::test]
    async fn one_bad_channel_does_not_blank_the_result() {
        let a = channel_a();
        let uploads = HashMap::from([(
            a.clone(),
            vec![
                record(&a, "vid00000001", Some(datetime!(2024-06-03 10:00 UTC))),
                record(&a, "vid00000002", Some(datetime!(2024-06-02 10:00 UTC))),
                record(&a, "vid00000003", Some(datetime!(2024-06-01 10:00 UTC))),
            ],
        )]);
        let result = aggregator(uploads, 200)
            .aggregate([&a, &channel_b()], 10)
            .await;

        assert_eq!(result.records.len(), 3);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].channel, channel_b());
    }

    #[tokio::test]
    async fn merged_records_sort_newest_first_with_missing_timestamps_last() {
        let a = channel_a();
        let b = channel_b();
        let uploads = HashMap::from([
            (
                a.clone(),
                vec![
                    record(&a, "vid00000001", Some(datetime!(2024-06-01 10:00 UTC))),
                    record(&a, "vid00000002", None),
                ],
            ),
            (
                b.clone(),
                vec![record(&b, "vid00000003", Some(datetime!(2024-06-02 10:00 UTC)))],
            ),
        ]);
        let result = aggregator(uploads, 200).aggregate([&a, &b], 10).await;

        let order: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "yt:UCBBBBBBBBBBBBBBBBBBBBBB:vid00000003",
                "yt:UCAAAAAAAAAAAAAAAAAAAAAA:vid00000001",
                "yt:UCAAAAAAAAAAAAAAAAAAAAAA:vid00000002",
            ]
        );
        assert!(result.failed.is_empty());
    }

    #[tokio::test]
    async fn equal_timestamps_keep_per_channel_fetch_order() {
        let a = channel_a();
        let b = channel_b();
        let same = datetime!(2024-06-02 10:00 UTC);
        let uploads = HashMap::from([
            (a.clone(), vec![record(&a, "vid00000001", Some(same))]),
            (b.clone(), vec![record(&b, "vid00000002", Some(same))]),
        ]);
        let result = aggregator(uploads, 200).aggregate([&a, &b], 10).await;

        assert_eq!(
            result.records[0].id,
            "yt:UCAAAAAAAAAAAAAAAAAAAAAA:vid00000001"
        );
        assert_eq!(
            result.records[1].id,
            "yt:UCBBBBBBBBBBBBBBBBBBBBBB:vid00000002"
        );
    }

    #[tokio::test]
    async fn result_is_bounded_by_the_overall_cap() {
        let a = channel_a();
        let records: Vec<VideoRecord> = (0..10)
            .map(|n| {
                record(
                    &a,
                    &format!("vid{n:08}"),
                    Some(datetime!(2024-06-01 00:00 UTC) + time::Duration::hours(n)),
                )
            })
            .collect();
        let uploads = HashMap::from([(a.clone(), records)]);
        let result = aggregator(uploads, 4).aggregate([&a], 10).await;

        assert_eq!(result.records.len(), 4);
        // Newest survive the cut.
        assert_eq!(result.records[0].id, "yt:UCAAAAAAAAAAAAAAAAAAAAAA:vid00000009");
    }

    #[tokio::test]
    async fn per_channel_limit_is_honored() {
        let a = channel_a();
        let records: Vec<VideoRecord> = (0..10)
            .map(|n| record(&a, &format!("vid{n:08}"), None))
            .collect();
        let uploads = HashMap::from([(a.clone(), records)]);
        let result = aggregator(uploads, 200).aggregate([&a], 3).await;
        assert_eq!(result.records.len(), 3);
    }
}
