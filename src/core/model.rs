use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Duration filter applied to a keyword search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    #[default]
    All,
    Shorts,
    Long,
}

impl VideoType {
    /// Value of the platform's `videoDuration` parameter, if any.
    /// `short` is roughly under 4 minutes, `medium` roughly 4 to 20.
    pub fn duration_filter(self) -> Option<&'static str> {
        match self {
            VideoType::All => None,
            VideoType::Shorts => Some("short"),
            VideoType::Long => Some("medium"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VideoType::All => "All",
            VideoType::Shorts => "Shorts",
            VideoType::Long => "Long",
        }
    }

    pub fn next(self) -> Self {
        match self {
            VideoType::All => VideoType::Long,
            VideoType::Long => VideoType::Shorts,
            VideoType::Shorts => VideoType::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub channel_title: String,
    pub channel_id: String,
    pub view_count: u64,
    pub subscriber_count: u64,
    pub efficiency_ratio: f64,
    pub comment_count: u64,
    pub published_at: String,
}

impl VideoRecord {
    pub fn published_date(&self) -> String {
        self.published_at
            .parse::<DateTime<Utc>>()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| self.published_at.clone())
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// Views per subscriber, rounded to two decimal places.
/// A zero subscriber count is treated as one.
pub fn efficiency_ratio(view_count: u64, subscriber_count: u64) -> f64 {
    let subscribers = subscriber_count.max(1) as f64;
    ((view_count as f64 / subscribers) * 100.0).round() / 100.0
}

/// Stable descending sort by efficiency ratio.
pub fn rank_by_efficiency(videos: &mut [VideoRecord]) {
    videos.sort_by(|a, b| b.efficiency_ratio.total_cmp(&a.efficiency_ratio));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment: String,
    pub common_keywords: Vec<String>,
    pub user_needs: Vec<String>,
    pub suggested_topics: Vec<String>,
    pub recommended_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineResult {
    pub title: String,
    pub hook: String,
    pub chapters: Vec<Chapter>,
    pub cta: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, ratio: f64) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: format!("video {id}"),
            thumbnail: String::new(),
            channel_title: "channel".to_string(),
            channel_id: "UC1".to_string(),
            view_count: 0,
            subscriber_count: 1,
            efficiency_ratio: ratio,
            comment_count: 0,
            published_at: "2024-05-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn ratio_rounds_to_two_decimals() {
        assert_eq!(efficiency_ratio(1000, 3), 333.33);
        assert_eq!(efficiency_ratio(2, 3), 0.67);
        assert_eq!(efficiency_ratio(0, 50), 0.0);
    }

    #[test]
    fn ratio_floors_subscribers_at_one() {
        assert_eq!(efficiency_ratio(1234, 0), 1234.0);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let mut videos = vec![
            record("a", 1.5),
            record("b", 9.0),
            record("c", 1.5),
            record("d", 3.25),
        ];
        rank_by_efficiency(&mut videos);
        let ids: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["b", "d", "a", "c"]);

        let once = videos.clone();
        rank_by_efficiency(&mut videos);
        assert_eq!(videos, once);
    }

    #[test]
    fn duration_filter_by_type() {
        assert_eq!(VideoType::All.duration_filter(), None);
        assert_eq!(VideoType::Shorts.duration_filter(), Some("short"));
        assert_eq!(VideoType::Long.duration_filter(), Some("medium"));
    }

    #[test]
    fn published_date_is_formatted() {
        assert_eq!(record("a", 0.0).published_date(), "2024-05-01");
    }

    #[test]
    fn analysis_uses_camel_case_fields() {
        let json = r#"{
            "sentiment": "positive",
            "commonKeywords": ["a"],
            "userNeeds": ["b"],
            "suggestedTopics": ["c"],
            "recommendedKeywords": ["1", "2", "3", "4", "5"]
        }"#;
        let parsed: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.recommended_keywords.len(), 5);
        assert_eq!(parsed.common_keywords, vec!["a".to_string()]);
    }
}
