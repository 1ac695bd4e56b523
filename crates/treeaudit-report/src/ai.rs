use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use treeaudit_core::config::{AiConfig, ProviderKind};
use treeaudit_core::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_output_tokens: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct CompletionResponse {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("service unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("content filtered: {0}")]
    ContentFiltered(String),
    #[error("request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl CollaboratorError {
    /// Worth one more attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CollaboratorError::Network(_)
                | CollaboratorError::Timeout(_)
                | CollaboratorError::RateLimited(_)
                | CollaboratorError::Unavailable { .. }
        )
    }
}

impl From<CollaboratorError> for AppError {
    fn from(err: CollaboratorError) -> Self {
        AppError::collaborator(format!("ai request failed: {err}"))
    }
}

/// The external model. Any matching closure is a provider too.
pub trait AiProvider {
    fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, CollaboratorError>;
}

impl<F> AiProvider for F
where
    F: Fn(&CompletionRequest) -> Result<CompletionResponse, CollaboratorError>,
{
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CollaboratorError> {
        self(request)
    }
}

/// Builds the provider named by `config`; `mock://` endpoints select a mock.
pub fn provider_from_config(
    config: &AiConfig,
    api_key: Option<String>,
) -> AppResult<Box<dyn AiProvider>> {
    let endpoint = config.endpoint();
    if let Some(mock) = MockProvider::from_endpoint(&endpoint) {
        return Ok(Box::new(mock));
    }
    if endpoint.starts_with("mock://") {
        return Err(AppError::usage(format!("unknown mock endpoint '{endpoint}'")));
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let model = config.model();
    let provider: Box<dyn AiProvider> = match config.provider {
        ProviderKind::OpenAi => Box::new(OpenAiProvider {
            endpoint,
            api_key: require_key(config, api_key)?,
            model,
            temperature: config.temperature,
            timeout,
        }),
        ProviderKind::Anthropic => Box::new(AnthropicProvider {
            endpoint,
            api_key: require_key(config, api_key)?,
            model,
            temperature: config.temperature,
            timeout,
        }),
        ProviderKind::Ollama => Box::new(OllamaProvider::new(endpoint, model, timeout)),
    };
    Ok(provider)
}

fn require_key(config: &AiConfig, api_key: Option<String>) -> AppResult<String> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AppError::usage(format!(
            "{} requires an api key; set {}",
            config.provider.as_str(),
            config.api_key_env().unwrap_or_else(|| "ai.api_key_env".to_string())
        ))),
    }
}

#[derive(Clone)]
pub struct OpenAiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AiProvider for OpenAiProvider {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CollaboratorError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: request.max_output_tokens,
        };
        let value = post_json(
            ureq::post(&url)
                .timeout(self.timeout)
                .set("Authorization", &format!("Bearer {}", self.api_key)),
            body,
        )?;
        let choice = value
            .get("choices")
            .and_then(|v| v.get(0))
            .ok_or_else(|| CollaboratorError::MalformedResponse("missing 'choices'".into()))?;
        if choice.get("finish_reason").and_then(|v| v.as_str()) == Some("content_filter") {
            return Err(CollaboratorError::ContentFiltered(
                "completion stopped by content filter".into(),
            ));
        }
        let text = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                CollaboratorError::MalformedResponse("missing 'message.content'".into())
            })?;
        Ok(CompletionResponse {
            text: text.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 2000;

#[derive(Clone)]
pub struct AnthropicProvider {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AiProvider for AnthropicProvider {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CollaboratorError> {
        let url = format!("{}/messages", self.endpoint.trim_end_matches('/'));
        let body = MessagesRequest {
            model: &self.model,
            system: &request.system,
            max_tokens: request
                .max_output_tokens
                .unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };
        let value = post_json(
            ureq::post(&url)
                .timeout(self.timeout)
                .set("x-api-key", &self.api_key)
                .set("anthropic-version", ANTHROPIC_VERSION),
            body,
        )?;
        if value.get("stop_reason").and_then(|v| v.as_str()) == Some("refusal") {
            return Err(CollaboratorError::ContentFiltered(
                "model declined to respond".into(),
            ));
        }
        let blocks = value
            .get("content")
            .and_then(|v| v.as_array())
            .ok_or_else(|| CollaboratorError::MalformedResponse("missing 'content'".into()))?;
        let text: String = blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect();
        if text.is_empty() {
            return Err(CollaboratorError::MalformedResponse(
                "no text content blocks".into(),
            ));
        }
        Ok(CompletionResponse { text })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(endpoint: String, model: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            model,
            timeout,
        }
    }

    fn endpoint_url(&self) -> String {
        if self.endpoint.contains("/api/") {
            self.endpoint.clone()
        } else {
            format!("{}/api/generate", self.endpoint.trim_end_matches('/'))
        }
    }
}

impl AiProvider for OllamaProvider {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CollaboratorError> {
        let url = self.endpoint_url();
        let body = GenerateRequest {
            model: &self.model,
            system: &request.system,
            prompt: &request.prompt,
            stream: false,
            options: request
                .max_output_tokens
                .map(|num_predict| OllamaOptions { num_predict }),
        };
        let value = post_json(ureq::post(&url).timeout(self.timeout), body)?;
        let text = value
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CollaboratorError::MalformedResponse("missing 'response'".into()))?;
        Ok(CompletionResponse {
            text: text.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

fn post_json<T: Serialize>(request: ureq::Request, body: T) -> Result<Value, CollaboratorError> {
    let response = request.send_json(body).map_err(classify_error)?;
    response
        .into_json::<Value>()
        .map_err(|e| CollaboratorError::MalformedResponse(format!("response parse error: {e}")))
}

fn classify_error(err: ureq::Error) -> CollaboratorError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            classify_status(status, error_message(&body))
        }
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            let lowered = message.to_ascii_lowercase();
            if lowered.contains("timed out") || lowered.contains("timeout") {
                CollaboratorError::Timeout(message)
            } else {
                CollaboratorError::Network(message)
            }
        }
    }
}

fn classify_status(status: u16, message: String) -> CollaboratorError {
    match status {
        401 | 403 => CollaboratorError::InvalidCredentials(message),
        408 => CollaboratorError::Timeout(message),
        429 => CollaboratorError::RateLimited(message),
        500..=599 => CollaboratorError::Unavailable { status, message },
        _ if message.contains("content_filter") || message.contains("content_policy") => {
            CollaboratorError::ContentFiltered(message)
        }
        _ => CollaboratorError::Rejected { status, message },
    }
}

/// Pulls `error.message` out of a provider error body, else the raw body.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message").or(Some(e)))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });
    let code = parsed.as_ref().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("code").or_else(|| e.get("type")))
            .and_then(|c| c.as_str())
            .map(str::to_string)
    });
    match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (None, Some(message)) => message,
        _ => body.trim().to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    Echo,
    Fixed,
    Timeout,
    RateLimited,
    InvalidCredentials,
    ContentFiltered,
}

/// Deterministic stand-in for the external model.
#[derive(Debug, Clone)]
pub struct MockProvider {
    mode: MockMode,
}

pub const MOCK_FIXED_REPORT: &str =
    "## Verdict\n\nNon-compliant.\n\n## Violations\n\n- `Final Report.csv`: filename contains uppercase letters and a space.\n";

impl MockProvider {
    pub fn new(mode: MockMode) -> Self {
        Self { mode }
    }

    pub fn from_endpoint(endpoint: &str) -> Option<Self> {
        let mode = match endpoint {
            "mock://echo" => MockMode::Echo,
            "mock://fixed" => MockMode::Fixed,
            "mock://timeout" => MockMode::Timeout,
            "mock://rate_limited" => MockMode::RateLimited,
            "mock://invalid_credentials" => MockMode::InvalidCredentials,
            "mock://content_filtered" => MockMode::ContentFiltered,
            _ => return None,
        };
        Some(Self { mode })
    }
}

impl AiProvider for MockProvider {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CollaboratorError> {
        match self.mode {
            MockMode::Echo => Ok(CompletionResponse {
                text: request.prompt.clone(),
            }),
            MockMode::Fixed => Ok(CompletionResponse {
                text: MOCK_FIXED_REPORT.to_string(),
            }),
            MockMode::Timeout => Err(CollaboratorError::Timeout("mock timeout".into())),
            MockMode::RateLimited => {
                Err(CollaboratorError::RateLimited("mock rate limit".into()))
            }
            MockMode::InvalidCredentials => Err(CollaboratorError::InvalidCredentials(
                "mock rejected api key".into(),
            )),
            MockMode::ContentFiltered => Err(CollaboratorError::ContentFiltered(
                "mock content filter".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "sys".to_string(),
            prompt: "list".to_string(),
            max_output_tokens: None,
        }
    }

    #[test]
    fn transient_classification() {
        assert!(CollaboratorError::Timeout("t".into()).is_transient());
        assert!(CollaboratorError::RateLimited("r".into()).is_transient());
        assert!(CollaboratorError::Unavailable {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!CollaboratorError::InvalidCredentials("k".into()).is_transient());
        assert!(!CollaboratorError::ContentFiltered("c".into()).is_transient());
        assert!(!CollaboratorError::MalformedResponse("m".into()).is_transient());
    }

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(
            classify_status(401, "bad key".into()),
            CollaboratorError::InvalidCredentials(_)
        ));
        assert!(matches!(
            classify_status(429, "slow down".into()),
            CollaboratorError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(502, "gateway".into()),
            CollaboratorError::Unavailable { status: 502, .. }
        ));
        assert!(matches!(
            classify_status(400, "content_filter: blocked".into()),
            CollaboratorError::ContentFiltered(_)
        ));
        assert!(matches!(
            classify_status(404, "no such model".into()),
            CollaboratorError::Rejected { status: 404, .. }
        ));
    }

    #[test]
    fn error_message_prefers_structured_body() {
        let body = r#"{"error":{"message":"Incorrect API key","code":"invalid_api_key"}}"#;
        assert_eq!(error_message(body), "invalid_api_key: Incorrect API key");
        let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow"}}"#;
        assert_eq!(error_message(body), "rate_limit_error: slow");
        assert_eq!(error_message(" plain text "), "plain text");
    }

    #[test]
    fn mock_endpoints_select_modes() {
        let echo = MockProvider::from_endpoint("mock://echo").unwrap();
        assert_eq!(echo.complete(&request()).unwrap().text, "list");
        let timeout = MockProvider::from_endpoint("mock://timeout").unwrap();
        assert!(matches!(
            timeout.complete(&request()),
            Err(CollaboratorError::Timeout(_))
        ));
        assert!(MockProvider::from_endpoint("mock://nope").is_none());
    }

    #[test]
    fn closures_are_providers() {
        let provider = |req: &CompletionRequest| {
            Ok::<_, CollaboratorError>(CompletionResponse {
                text: format!("seen {}", req.prompt),
            })
        };
        assert_eq!(provider.complete(&request()).unwrap().text, "seen list");
    }

    #[test]
    fn hosted_providers_require_a_key() {
        let config = AiConfig::default();
        let err = provider_from_config(&config, None).err().expect("expected an error");
        assert_eq!(err.kind(), treeaudit_core::ErrorKind::Usage);
        assert!(err.message().contains("OPENAI_API_KEY"));

        let mut config = AiConfig::default();
        config.endpoint = Some("mock://fixed".to_string());
        assert!(provider_from_config(&config, None).is_ok());

        config.endpoint = Some("mock://bogus".to_string());
        assert!(provider_from_config(&config, None).is_err());
    }

    #[test]
    fn collaborator_error_converts_with_exit_code() {
        let err: AppError = CollaboratorError::Timeout("30s".into()).into();
        assert_eq!(err.kind(), treeaudit_core::ErrorKind::Collaborator);
        assert!(err.message().contains("timed out"));
    }
}
