pub mod ai;
pub mod policy;
pub mod prompt;
pub mod report;
pub mod retry;

pub use ai::{
    provider_from_config, AiProvider, AnthropicProvider, CollaboratorError, CompletionRequest,
    CompletionResponse, MockProvider, OllamaProvider, OpenAiProvider,
};
pub use policy::PolicyDocument;
pub use prompt::{build_prompt, AuditPrompt, PromptLimits};
pub use report::{render_json, render_markdown, request_report, AuditReport};
pub use retry::{complete_with_retry, RetryPolicy};
