use crate::core::{
    ChannelPolicy, CommentService, GeminiBackend, InsightService, SearchService, YouTubeClient,
};
use crate::error::Result;
use std::sync::Arc;

/// The remote-facing services, sharing one HTTP client. Cheap to clone
/// into background tasks.
#[derive(Clone)]
pub struct Services {
    pub search: SearchService,
    pub comments: CommentService,
    pub insight: InsightService,
}

impl Services {
    pub fn new(model: &str, channel_policy: ChannelPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("insightminer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let data_api = Arc::new(YouTubeClient::new(http.clone()));
        let backend = Arc::new(GeminiBackend::new(http, model));

        Ok(Self {
            search: SearchService::new(data_api.clone()).with_channel_policy(channel_policy),
            comments: CommentService::new(data_api),
            insight: InsightService::new(backend),
        })
    }
}
