use crate::core::keystore::{ApiKey, Credentials};
use crate::core::model::{AnalysisResult, OutlineResult};
use crate::core::youtube::decode_response;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Character budget for the comment text sent to the analyzer.
pub const COMMENT_BUDGET: usize = 4000;
pub const RECOMMENDED_KEYWORDS: usize = 5;
const MIN_CHAPTERS: usize = 3;
const MAX_CHAPTERS: usize = 4;

/// A generative backend that honors a response schema and answers with
/// the JSON document as text.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_json(&self, key: &ApiKey, prompt: &str, schema: &Value) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(http: reqwest::Client, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate_json(&self, key: &ApiKey, prompt: &str, schema: &Value) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "generation request");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let payload = decode_response(status, &text)?;
        candidate_text(payload)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn candidate_text(payload: Value) -> Result<String> {
    let response: GenerateResponse = serde_json::from_value(payload)
        .map_err(|e| Error::parse(format!("malformed generation response: {e}")))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::parse("generation response contained no text"));
    }
    Ok(text)
}

/// Comment analysis and script outlines on top of a generative backend.
#[derive(Clone)]
pub struct InsightService {
    backend: Arc<dyn GenerationBackend>,
}

impl InsightService {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub async fn analyze(
        &self,
        credentials: &Credentials,
        comments: &[String],
        video_title: &str,
    ) -> Result<AnalysisResult> {
        let key = credentials.gemini()?;
        let prompt = analysis_prompt(video_title, &comment_digest(comments));

        let text = self
            .backend
            .generate_json(key, &prompt, &analysis_schema())
            .await?;
        let analysis: AnalysisResult = parse_document(&text)?;

        if analysis.recommended_keywords.len() != RECOMMENDED_KEYWORDS {
            return Err(Error::parse(format!(
                "expected {RECOMMENDED_KEYWORDS} recommended keywords, got {}",
                analysis.recommended_keywords.len()
            )));
        }

        info!(comments = comments.len(), "analysis generated");
        Ok(analysis)
    }

    pub async fn outline(&self, credentials: &Credentials, keyword: &str) -> Result<OutlineResult> {
        let key = credentials.gemini()?;
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(Error::custom("Outline keyword cannot be empty"));
        }

        let text = self
            .backend
            .generate_json(key, &outline_prompt(keyword), &outline_schema())
            .await?;
        let outline: OutlineResult = parse_document(&text)?;

        let chapters = outline.chapters.len();
        if !(MIN_CHAPTERS..=MAX_CHAPTERS).contains(&chapters) {
            return Err(Error::parse(format!(
                "expected {MIN_CHAPTERS} to {MAX_CHAPTERS} chapters, got {chapters}"
            )));
        }

        info!(keyword, chapters, "outline generated");
        Ok(outline)
    }
}

fn parse_document<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text.trim())
        .map_err(|e| Error::parse(format!("generated document does not match schema: {e}")))
}

/// Newline-joined comments, hard-cut at [`COMMENT_BUDGET`] characters.
pub fn comment_digest(comments: &[String]) -> String {
    comments.join("\n").chars().take(COMMENT_BUDGET).collect()
}

fn analysis_prompt(video_title: &str, digest: &str) -> String {
    format!(
        "당신은 유튜브 트렌드 분석가입니다. 다음 영상의 댓글들을 분석하세요: \"{video_title}\"
1. 감성 분석, 2. 자주 언급된 키워드, 3. 시청자 니즈, 4. 3-5개 추천 콘텐츠 주제를 도출하세요.
추가로, 이 영상의 반응을 바탕으로 다음 콘텐츠를 제작할 때 사용할 '5개의 핵심 추천 키워드'를 별도로 뽑아주세요.
모두 한국어로 답변하세요.

댓글 목록:
{digest}"
    )
}

fn outline_prompt(keyword: &str) -> String {
    format!(
        "유튜브 키워드 \"{keyword}\"를 바탕으로 시청자를 사로잡을 수 있는 대본 목차를 작성해줘.
제목, 흥미로운 도입부(Hook), 3~4개의 주요 섹션(Chapter), 그리고 마지막 결론 및 CTA를 포함해야 해. 한국어로 작성해줘."
    )
}

fn string_list() -> Value {
    json!({"type": "ARRAY", "items": {"type": "STRING"}})
}

fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "sentiment": {"type": "STRING"},
            "commonKeywords": string_list(),
            "userNeeds": string_list(),
            "suggestedTopics": string_list(),
            "recommendedKeywords": {
                "type": "ARRAY",
                "items": {"type": "STRING"},
                "minItems": RECOMMENDED_KEYWORDS,
                "maxItems": RECOMMENDED_KEYWORDS,
                "description": "5 distinct short keywords for content creation",
            },
        },
        "required": ["sentiment", "commonKeywords", "userNeeds", "suggestedTopics", "recommendedKeywords"],
    })
}

fn outline_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "hook": {"type": "STRING"},
            "chapters": {
                "type": "ARRAY",
                "minItems": MIN_CHAPTERS,
                "maxItems": MAX_CHAPTERS,
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {"type": "STRING"},
                        "detail": {"type": "STRING"},
                    },
                    "required": ["title", "detail"],
                },
            },
            "cta": {"type": "STRING"},
        },
        "required": ["title", "hook", "chapters", "cta"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeBackend {
        reply: Result<String>,
        prompts: Mutex<Vec<(String, Value)>>,
    }

    impl FakeBackend {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: Error) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().unwrap().0.clone()
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeBackend {
        async fn generate_json(
            &self,
            _key: &ApiKey,
            prompt: &str,
            schema: &Value,
        ) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), schema.clone()));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::custom(e)),
            }
        }
    }

    fn credentials() -> Credentials {
        Credentials::new(None, ApiKey::new("gm"))
    }

    const ANALYSIS: &str = r#"{
        "sentiment": "대체로 긍정적",
        "commonKeywords": ["편집", "음악"],
        "userNeeds": ["더 긴 영상"],
        "suggestedTopics": ["브이로그", "튜토리얼", "리뷰"],
        "recommendedKeywords": ["하나", "둘", "셋", "넷", "다섯"]
    }"#;

    const OUTLINE: &str = r#"{
        "title": "제목",
        "hook": "도입부",
        "chapters": [
            {"title": "1장", "detail": "내용"},
            {"title": "2장", "detail": "내용"},
            {"title": "3장", "detail": "내용"}
        ],
        "cta": "구독"
    }"#;

    #[test]
    fn digest_is_hard_cut_at_budget() {
        let comments = vec!["가".repeat(3000), "b".repeat(3000)];
        let digest = comment_digest(&comments);
        assert_eq!(digest.chars().count(), COMMENT_BUDGET);
        assert!(digest.starts_with(&"가".repeat(3000)));
        assert_eq!(digest.chars().nth(3000), Some('\n'));
    }

    #[test]
    fn short_digest_is_untouched() {
        let comments = vec!["one".to_string(), "two".to_string()];
        assert_eq!(comment_digest(&comments), "one\ntwo");
    }

    #[tokio::test]
    async fn analysis_submits_truncated_comments() {
        let backend = FakeBackend::replying(ANALYSIS);
        let service = InsightService::new(backend.clone());
        let comments = vec!["x".repeat(5000)];

        let analysis = service
            .analyze(&credentials(), &comments, "My Video")
            .await
            .unwrap();

        assert_eq!(analysis.recommended_keywords.len(), RECOMMENDED_KEYWORDS);
        assert_eq!(analysis.sentiment, "대체로 긍정적");

        let prompt = backend.last_prompt();
        assert!(prompt.contains("\"My Video\""));
        assert!(prompt.ends_with(&format!("댓글 목록:\n{}", "x".repeat(COMMENT_BUDGET))));
    }

    #[tokio::test]
    async fn analysis_schema_requires_five_keywords() {
        let backend = FakeBackend::replying(ANALYSIS);
        let service = InsightService::new(backend.clone());
        service.analyze(&credentials(), &[], "t").await.unwrap();

        let schema = backend.prompts.lock().unwrap()[0].1.clone();
        let keywords = &schema["properties"]["recommendedKeywords"];
        assert_eq!(keywords["minItems"], 5);
        assert_eq!(keywords["maxItems"], 5);
        assert_eq!(schema["required"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn wrong_keyword_count_is_parse_error() {
        let reply = ANALYSIS.replace(r#""넷", "다섯""#, r#""넷""#);
        let service = InsightService::new(FakeBackend::replying(&reply));

        let err = service.analyze(&credentials(), &[], "t").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn missing_field_is_parse_error() {
        let service = InsightService::new(FakeBackend::replying(r#"{"sentiment": "ok"}"#));

        let err = service.analyze(&credentials(), &[], "t").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn missing_generation_key_fails_before_request() {
        let backend = FakeBackend::replying(ANALYSIS);
        let service = InsightService::new(backend.clone());

        let err = service
            .analyze(&Credentials::default(), &[], "t")
            .await
            .unwrap_err();
        assert!(err.is_configuration());

        let err = service
            .outline(&Credentials::default(), "kw")
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn outline_parses_chapters() {
        let backend = FakeBackend::replying(OUTLINE);
        let service = InsightService::new(backend.clone());

        let outline = service.outline(&credentials(), " 캠핑 ").await.unwrap();

        assert_eq!(outline.title, "제목");
        assert_eq!(outline.chapters.len(), 3);
        assert_eq!(outline.chapters[0].title, "1장");
        assert!(backend.last_prompt().contains("\"캠핑\""));
    }

    #[tokio::test]
    async fn outline_with_too_few_chapters_is_parse_error() {
        let reply = r#"{"title": "t", "hook": "h", "chapters": [{"title": "a", "detail": "b"}], "cta": "c"}"#;
        let service = InsightService::new(FakeBackend::replying(reply));

        let err = service.outline(&credentials(), "kw").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn backend_failure_is_not_retried() {
        let backend = FakeBackend::failing(Error::custom("boom"));
        let service = InsightService::new(backend.clone());

        assert!(service.outline(&credentials(), "kw").await.is_err());
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn candidate_parts_are_joined() {
        let payload = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]
        });
        assert_eq!(candidate_text(payload).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn empty_candidates_is_parse_error() {
        let err = candidate_text(json!({"candidates": []})).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
