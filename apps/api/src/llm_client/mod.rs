/// LLM Client — the single point of entry for all provider calls.
///
/// RULE: handlers never call the provider directly; they hold an
/// `Arc<dyn PitchGenerator>` so tests can substitute a stub.
///
/// One request per pitch, no retries. Output shape is declared as a strict
/// JSON schema and anything that does not parse into it is `MalformedOutput`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::pitch::models::PitchResult;

const MAX_TOKENS: u32 = 1024;
const SCHEMA_NAME: &str = "movie_pitch";

/// Classified failure of a single provider call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("provider rejected the request (status {status}): {message}")]
    UpstreamRejected { status: u16, message: String },

    #[error("provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("provider output did not match the pitch shape: {0}")]
    MalformedOutput(String),
}

/// Produces a pitch from a system prompt and a user prompt.
///
/// Carried in `AppState` as `Arc<dyn PitchGenerator>`.
#[async_trait]
pub trait PitchGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<PitchResult, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Strict output schema: three required strings, nothing else.
fn pitch_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "A catchy title for the movie"
                    },
                    "tagline": {
                        "type": "string",
                        "description": "A short, memorable tagline for the poster"
                    },
                    "pitch": {
                        "type": "string",
                        "description": "A 1-3 sentence pitch of the plot"
                    }
                },
                "required": ["title", "tagline", "pitch"],
                "additionalProperties": false
            }
        }
    })
}

/// OpenAI-compatible Chat Completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.model.clone(),
            config.provider_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn classify_transport(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::UpstreamTimeout(self.timeout)
        } else if err.is_decode() {
            GenerationError::MalformedOutput(err.to_string())
        } else {
            GenerationError::UpstreamUnavailable(err.to_string())
        }
    }
}

#[async_trait]
impl PitchGenerator for OpenAiClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<PitchResult, GenerationError> {
        let request_body = ChatRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: pitch_response_format(),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify_transport(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_status(status, message));
        }

        let chat: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedOutput(format!("response body: {e}")))?;

        if let Some(usage) = &chat.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        parse_pitch(chat)
    }
}

fn classify_status(status: StatusCode, message: String) -> GenerationError {
    if status.is_client_error() {
        GenerationError::UpstreamRejected {
            status: status.as_u16(),
            message,
        }
    } else {
        GenerationError::UpstreamUnavailable(format!("status {status}: {message}"))
    }
}

/// Pulls the first choice out of a completion and parses it into a `PitchResult`.
fn parse_pitch(chat: ChatResponse) -> Result<PitchResult, GenerationError> {
    let message = chat
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedOutput("no choices returned".to_string()))?
        .message;

    if let Some(refusal) = message.refusal {
        return Err(GenerationError::MalformedOutput(format!(
            "model refused: {refusal}"
        )));
    }

    let content = message
        .content
        .ok_or_else(|| GenerationError::MalformedOutput("empty content".to_string()))?;

    let json = strip_json_fences(&content);
    if json.len() != content.trim().len() {
        debug!("Stripped markdown fences from structured provider output");
    }

    let pitch: PitchResult = serde_json::from_str(json)
        .map_err(|e| GenerationError::MalformedOutput(format!("content: {e}")))?;

    if let Some(field) = pitch.first_blank_field() {
        return Err(GenerationError::MalformedOutput(format!(
            "field '{field}' is blank"
        )));
    }

    Ok(pitch)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let stripped = stripped.trim_start();
    stripped
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content, "refusal": null},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 42, "completion_tokens": 17, "total_tokens": 59}
        })
    }

    const PITCH_JSON: &str = r#"{"title":"Neon Shadows","tagline":"In space, every shadow hides a secret.","pitch":"A robot detective hunts a killer."}"#;

    fn client_for(server: &MockServer, timeout: Duration) -> OpenAiClient {
        OpenAiClient::new("sk-test", server.uri(), "gpt-4o-mini", timeout).unwrap()
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_response_format_is_strict_three_field_schema() {
        let format = pitch_response_format();
        let schema = &format["json_schema"]["schema"];
        assert_eq!(format["json_schema"]["strict"], true);
        assert_eq!(schema["required"], json!(["title", "tagline", "pitch"]));
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "quota".into()),
            GenerationError::UpstreamRejected { status: 429, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "down".into()),
            GenerationError::UpstreamUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_generate_parses_structured_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "response_format": {"type": "json_schema", "json_schema": {"name": SCHEMA_NAME}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(PITCH_JSON)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let pitch = client.generate("system", "prompt").await.unwrap();
        assert_eq!(pitch.title, "Neon Shadows");
        assert_eq!(pitch.tagline, "In space, every shadow hides a secret.");
    }

    #[tokio::test]
    async fn test_generate_accepts_fenced_json() {
        let server = MockServer::start().await;
        let fenced = format!("```json\n{PITCH_JSON}\n```");
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&fenced)))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(client.generate("system", "prompt").await.is_ok());
    }

    #[tokio::test]
    async fn test_auth_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        match client.generate("system", "prompt").await {
            Err(GenerationError::UpstreamRejected { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected UpstreamRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(matches!(
            client.generate("system", "prompt").await,
            Err(GenerationError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_prose_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("Here is your pitch: ...")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(matches!(
            client.generate("system", "prompt").await,
            Err(GenerationError::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_field_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(r#"{"title":"T","tagline":"L"}"#)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(matches!(
            client.generate("system", "prompt").await,
            Err(GenerationError::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_field_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(r#"{"title":" ","tagline":"L","pitch":"P"}"#)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        match client.generate("system", "prompt").await {
            Err(GenerationError::MalformedOutput(reason)) => assert!(reason.contains("title")),
            other => panic!("expected MalformedOutput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refusal_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": null, "refusal": "I can't help with that."},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(matches!(
            client.generate("system", "prompt").await,
            Err(GenerationError::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(matches!(
            client.generate("system", "prompt").await,
            Err(GenerationError::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(PITCH_JSON))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(200));
        assert!(matches!(
            client.generate("system", "prompt").await,
            Err(GenerationError::UpstreamTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(PITCH_JSON)))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(
            "sk-test",
            format!("{}/", server.uri()),
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(client.generate("system", "prompt").await.is_ok());
    }
}
