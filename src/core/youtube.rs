use crate::core::keystore::ApiKey;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Endpoint {
    #[display("search")]
    Search,
    #[display("videos")]
    Videos,
    #[display("channels")]
    Channels,
    #[display("commentThreads")]
    CommentThreads,
}

/// Read access to the video platform's data API.
///
/// Every call carries the key explicitly; implementations never look it up.
#[async_trait]
pub trait DataApi: Send + Sync {
    async fn get(&self, endpoint: Endpoint, key: &ApiKey, params: &[(&str, String)])
    -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl DataApi for YouTubeClient {
    async fn get(
        &self,
        endpoint: Endpoint,
        key: &ApiKey,
        params: &[(&str, String)],
    ) -> Result<Value> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(%endpoint, ?params, "data api request");

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", key.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        decode_response(status, &text)
    }
}

/// Parse a JSON body and reject error payloads. A non-JSON body is only
/// tolerated on a failure status.
pub(crate) fn decode_response(status: u16, text: &str) -> Result<Value> {
    let body = match serde_json::from_str::<Value>(text) {
        Ok(body) => body,
        Err(_) if !(200..300).contains(&status) => Value::Null,
        Err(e) => return Err(Error::parse(format!("response is not JSON: {e}"))),
    };
    check_payload(status, body)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

/// Turn a Google-style `{"error": {...}}` payload, or a bare non-2xx
/// status, into `Error::Upstream`. Other bodies pass through.
pub(crate) fn check_payload(status: u16, body: Value) -> Result<Value> {
    if let Some(error) = body.get("error") {
        return Err(match ErrorEnvelope::deserialize(&body) {
            Ok(envelope) => Error::Upstream {
                status: envelope.error.code.or(Some(status)),
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("request failed with status {status}")),
            },
            // Some gateways answer `{"error": "..."}`.
            Err(_) => Error::Upstream {
                status: Some(status),
                message: error
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string()),
            },
        });
    }

    if !(200..300).contains(&status) {
        return Err(Error::Upstream {
            status: Some(status),
            message: format!("request failed with status {status}"),
        });
    }

    Ok(body)
}

/// Counters arrive as decimal strings, occasionally as numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Count {
    Text(String),
    Number(u64),
}

impl Count {
    pub(crate) fn value(&self) -> Option<u64> {
        match self {
            Count::Text(text) => text.trim().parse().ok(),
            Count::Number(n) => Some(*n),
        }
    }
}

pub(crate) fn count_or_zero(count: Option<&Count>) -> u64 {
    count.and_then(Count::value).unwrap_or(0)
}
