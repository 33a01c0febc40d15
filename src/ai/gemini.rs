use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::GenerateError;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The rate-limited downstream the queue serializes calls to.
///
/// Implementations must return an error for anything that is not a usable
/// answer: transport failures, non-2xx responses, empty bodies. When
/// `schema` is given the returned text should be JSON matching it.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: Option<&Value>,
    ) -> Result<String, GenerateError>;
}

// --- Request types ---

#[derive(Serialize)]
struct Request<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

// --- Response types ---

#[derive(Deserialize)]
struct Response {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

fn build_request<'a>(
    system_prompt: &'a str,
    user_prompt: &'a str,
    schema: Option<&'a Value>,
) -> Request<'a> {
    Request {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: system_prompt,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: user_prompt }],
        }],
        generation_config: schema.map(|schema| GenerationConfig {
            response_mime_type: "application/json",
            response_schema: schema,
        }),
    }
}

/// Joins every text part of the first candidate.
fn extract_text(response: Response) -> Result<String, GenerateError> {
    if let Some(err) = response.error {
        return Err(GenerateError::Api(err.message));
    }

    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(GenerateError::EmptyResponse);
    }
    Ok(text)
}

/// 마크다운 코드블록 제거
pub fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// A client whose requests give up after `timeout`, so a hung call
    /// cannot stall the queue forever.
    pub fn with_timeout(
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, api_key))
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: Option<&Value>,
    ) -> Result<String, GenerateError> {
        let request = build_request(system_prompt, user_prompt, schema);

        let resp = self
            .client
            .post(format!("{}?key={}", self.endpoint(), self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            // 429 등은 본문에 이유가 담겨 온다
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Response>(&body)
                .ok()
                .and_then(|r| r.error)
                .map_or(body, |e| e.message);
            return Err(GenerateError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let response: Response = resp.json().await?;
        extract_text(response)
    }
}
