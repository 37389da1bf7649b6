use crate::core::keystore::{ApiKey, Credentials};
use crate::core::model::{VideoRecord, VideoType, efficiency_ratio};
use crate::core::youtube::{Count, DataApi, Endpoint, count_or_zero};
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SEARCH_PAGE_SIZE: u32 = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub keyword: String,
    pub kind: VideoType,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>, kind: VideoType) -> Self {
        Self {
            keyword: keyword.into(),
            kind,
        }
    }
}

/// What to do when the batched channel lookup itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelPolicy {
    /// Abort the whole search; no partial results.
    #[default]
    Abort,
    /// Log the failure and treat every channel as having one subscriber.
    Degrade,
}

/// Search, then statistics, then channel subscribers. Returns records in
/// the order of the statistics response; ranking is left to the caller.
#[derive(Clone)]
pub struct SearchService {
    api: Arc<dyn DataApi>,
    channel_policy: ChannelPolicy,
}

impl SearchService {
    pub fn new(api: Arc<dyn DataApi>) -> Self {
        Self {
            api,
            channel_policy: ChannelPolicy::default(),
        }
    }

    pub fn with_channel_policy(mut self, policy: ChannelPolicy) -> Self {
        self.channel_policy = policy;
        self
    }

    pub async fn search(
        &self,
        credentials: &Credentials,
        query: &SearchQuery,
    ) -> Result<Vec<VideoRecord>> {
        let key = credentials.youtube()?;
        let keyword = query.keyword.trim();
        if keyword.is_empty() {
            return Err(Error::custom("Search keyword cannot be empty"));
        }

        let ids = self.search_ids(key, keyword, query.kind).await?;
        if ids.is_empty() {
            info!(keyword, "search returned no videos");
            return Ok(Vec::new());
        }

        let records = self.enrich(key, &ids).await?;
        info!(keyword, count = records.len(), "search complete");
        Ok(records)
    }

    /// Statistics and subscriber lookup for a single video.
    pub async fn fetch_video(
        &self,
        credentials: &Credentials,
        video_id: &str,
    ) -> Result<Option<VideoRecord>> {
        let key = credentials.youtube()?;
        let records = self.enrich(key, &[video_id.to_string()]).await?;
        Ok(records.into_iter().next())
    }

    async fn search_ids(
        &self,
        key: &ApiKey,
        keyword: &str,
        kind: VideoType,
    ) -> Result<Vec<String>> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("maxResults", SEARCH_PAGE_SIZE.to_string()),
            ("q", keyword.to_string()),
            ("type", "video".to_string()),
        ];
        if let Some(duration) = kind.duration_filter() {
            params.push(("videoDuration", duration.to_string()));
        }

        let body = self.api.get(Endpoint::Search, key, &params).await?;
        let ids = video_ids(body)?;
        debug!(count = ids.len(), "search stage");
        Ok(ids)
    }

    async fn enrich(&self, key: &ApiKey, ids: &[String]) -> Result<Vec<VideoRecord>> {
        let params = [
            ("part", "statistics,snippet".to_string()),
            ("id", ids.join(",")),
        ];
        let body = self.api.get(Endpoint::Videos, key, &params).await?;
        let videos = parse_items::<VideoItem>(body, "videos")?;
        debug!(count = videos.len(), "statistics stage");
        if videos.is_empty() {
            return Ok(Vec::new());
        }

        let channel_ids = distinct_channels(&videos);
        let subscribers = match self.subscribers(key, &channel_ids).await {
            Ok(subscribers) => subscribers,
            Err(e) if self.channel_policy == ChannelPolicy::Degrade => {
                warn!(error = %e, "channel lookup failed, assuming one subscriber per channel");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };

        Ok(build_records(videos, &subscribers))
    }

    async fn subscribers(
        &self,
        key: &ApiKey,
        channel_ids: &[String],
    ) -> Result<HashMap<String, u64>> {
        if channel_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let params = [
            ("part", "statistics".to_string()),
            ("id", channel_ids.join(",")),
        ];
        let body = self.api.get(Endpoint::Channels, key, &params).await?;
        let channels = parse_items::<ChannelItem>(body, "channels")?;
        debug!(requested = channel_ids.len(), returned = channels.len(), "channel stage");

        Ok(channels
            .into_iter()
            .filter_map(|channel| {
                let count = channel.statistics.subscriber_count.as_ref()?.value()?;
                Some((channel.id, count))
            })
            .collect())
    }
}

// -- Wire shapes

#[derive(Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: Option<SearchItemId>,
}

#[derive(Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VideoSnippet {
    title: String,
    channel_title: String,
    channel_id: String,
    published_at: String,
    thumbnails: Thumbnails,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best_url(&self) -> String {
        [&self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|thumb| thumb.url.clone())
            .next()
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VideoStatistics {
    view_count: Option<Count>,
    comment_count: Option<Count>,
}

#[derive(Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    statistics: ChannelStatistics,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ChannelStatistics {
    subscriber_count: Option<Count>,
}

// -- Normalization

fn parse_items<T: for<'de> Deserialize<'de>>(body: Value, what: &str) -> Result<Vec<T>> {
    let list: ItemList<T> = serde_json::from_value(body)
        .map_err(|e| Error::parse(format!("malformed {what} response: {e}")))?;
    Ok(list.items)
}

fn video_ids(body: Value) -> Result<Vec<String>> {
    Ok(parse_items::<SearchItem>(body, "search")?
        .into_iter()
        .filter_map(|item| item.id?.video_id)
        .filter(|id| !id.is_empty())
        .collect())
}

fn distinct_channels(videos: &[VideoItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    videos
        .iter()
        .map(|video| video.snippet.channel_id.as_str())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

fn build_records(videos: Vec<VideoItem>, subscribers: &HashMap<String, u64>) -> Vec<VideoRecord> {
    videos
        .into_iter()
        .map(|video| {
            let view_count = count_or_zero(video.statistics.view_count.as_ref());
            let subscriber_count = subscribers
                .get(&video.snippet.channel_id)
                .copied()
                .unwrap_or(1)
                .max(1);

            VideoRecord {
                thumbnail: video.snippet.thumbnails.best_url(),
                title: html_escape::decode_html_entities(&video.snippet.title).into_owned(),
                channel_title: video.snippet.channel_title,
                channel_id: video.snippet.channel_id,
                view_count,
                subscriber_count,
                efficiency_ratio: efficiency_ratio(view_count, subscriber_count),
                comment_count: count_or_zero(video.statistics.comment_count.as_ref()),
                published_at: video.snippet.published_at,
                id: video.id,
            }
        })
        .collect()
}
