use crate::core::keystore::Credentials;
use crate::core::youtube::{DataApi, Endpoint};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const MAX_COMMENTS: u32 = 100;

/// First page of top-level comments for a video.
#[derive(Clone)]
pub struct CommentService {
    api: Arc<dyn DataApi>,
}

impl CommentService {
    pub fn new(api: Arc<dyn DataApi>) -> Self {
        Self { api }
    }

    pub async fn fetch_comments(
        &self,
        credentials: &Credentials,
        video_id: &str,
    ) -> Result<Vec<String>> {
        let key = credentials.youtube()?;
        let params = [
            ("part", "snippet".to_string()),
            ("videoId", video_id.to_string()),
            ("maxResults", MAX_COMMENTS.to_string()),
        ];

        let body = self.api.get(Endpoint::CommentThreads, key, &params).await?;
        let threads: ThreadList = serde_json::from_value(body)
            .map_err(|e| Error::parse(format!("malformed commentThreads response: {e}")))?;

        let comments: Vec<String> = threads
            .items
            .into_iter()
            .filter_map(|thread| thread.snippet?.top_level_comment?.snippet?.text_display)
            .map(|text| plain_text(&text))
            .take(MAX_COMMENTS as usize)
            .collect();

        debug!(video_id, count = comments.len(), "fetched comments");
        Ok(comments)
    }
}

/// `textDisplay` is HTML: line breaks as `<br>` and escaped entities.
fn plain_text(display: &str) -> String {
    let with_breaks = display
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n");
    html_escape::decode_html_entities(&with_breaks).into_owned()
}

#[derive(Deserialize)]
struct ThreadList {
    #[serde(default)]
    items: Vec<Thread>,
}

#[derive(Deserialize)]
struct Thread {
    #[serde(default)]
    snippet: Option<ThreadSnippet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    #[serde(default)]
    top_level_comment: Option<Comment>,
}

#[derive(Deserialize)]
struct Comment {
    #[serde(default)]
    snippet: Option<CommentSnippet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_display: Option<String>,
}
