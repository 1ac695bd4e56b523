use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub prompt: PromptConfig,
    pub ai: AiConfig,
}

impl Config {
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = if let Some(path) = path {
            let data = std::fs::read_to_string(path).map_err(|e| {
                AppError::usage(format!("failed to read config {}: {e}", path.display()))
            })?;
            serde_yaml::from_str::<Config>(&data).map_err(|e| {
                AppError::usage(format!("failed to parse config {}: {e}", path.display()))
            })?
        } else {
            Config::default()
        };

        Ok(config)
    }

    /// Checked after CLI overrides are applied.
    pub fn validate(&self) -> AppResult<()> {
        self.scan.validate()?;
        self.prompt.validate()?;
        self.ai.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub skip_hidden: bool,
    pub use_default_ignores: bool,
    pub ignore: Vec<String>,
    pub max_depth: usize,
    pub follow_links: bool,
    pub preview_chars: usize,
    pub preview_max_file_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_hidden: true,
            use_default_ignores: true,
            ignore: Vec::new(),
            max_depth: 64,
            follow_links: true,
            preview_chars: 0,
            preview_max_file_bytes: 10_000,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.max_depth == 0 {
            return Err(AppError::usage("scan.max_depth must be > 0"));
        }
        for pattern in &self.ignore {
            globset::Glob::new(pattern).map_err(|e| {
                AppError::usage(format!("invalid ignore pattern '{pattern}': {e}"))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub max_entries: usize,
    pub max_prompt_bytes: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            max_prompt_bytes: 200_000,
        }
    }
}

impl PromptConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.max_entries == 0 {
            return Err(AppError::usage("prompt.max_entries must be > 0"));
        }
        if self.max_prompt_bytes == 0 {
            return Err(AppError::usage("prompt.max_prompt_bytes must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            _ => Err(AppError::usage(format!(
                "invalid provider '{value}'; expected openai|anthropic|ollama"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Ollama => "http://127.0.0.1:11434",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Anthropic => "claude-3-5-sonnet-20241022",
            ProviderKind::Ollama => "llama3",
        }
    }

    pub fn default_api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: ProviderKind,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub retry_backoff_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: None,
            model: None,
            api_key_env: None,
            timeout_secs: 60,
            max_output_tokens: 2000,
            temperature: 0.2,
            retry_backoff_ms: 2000,
        }
    }
}

impl AiConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.timeout_secs == 0 {
            return Err(AppError::usage("ai.timeout_secs must be > 0"));
        }
        if self.max_output_tokens == 0 {
            return Err(AppError::usage("ai.max_output_tokens must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::usage("ai.temperature must be within 0.0..=2.0"));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.provider.default_endpoint().to_string())
    }

    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn api_key_env(&self) -> Option<String> {
        self.api_key_env
            .clone()
            .or_else(|| self.provider.default_api_key_env().map(str::to_string))
    }
}
