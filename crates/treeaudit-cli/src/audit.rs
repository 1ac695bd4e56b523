use crate::output::{check_out_path, emit, OutputFormat};
use std::path::{Path, PathBuf};
use treeaudit_core::config::{Config, ProviderKind};
use treeaudit_core::AppResult;
use treeaudit_report::{
    build_prompt, provider_from_config, render_json, render_markdown, request_report,
    AuditReport, PolicyDocument, PromptLimits, RetryPolicy,
};
use treeaudit_scan::{scan_tree, ScanOptions};

#[derive(Debug, Default)]
pub struct AuditOverrides {
    pub max_entries: Option<usize>,
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl AuditOverrides {
    fn apply(self, config: &mut Config) -> AppResult<()> {
        if let Some(n) = self.max_entries {
            config.prompt.max_entries = n;
        }
        if let Some(name) = self.provider {
            config.ai.provider = ProviderKind::parse(&name)?;
        }
        if let Some(endpoint) = self.endpoint {
            config.ai.endpoint = Some(endpoint);
        }
        if let Some(model) = self.model {
            config.ai.model = Some(model);
        }
        Ok(())
    }
}

pub fn audit_command(
    root: &Path,
    policy: Option<PathBuf>,
    out: Option<PathBuf>,
    overwrite: bool,
    format: &str,
    overrides: AuditOverrides,
    mut config: Config,
) -> AppResult<()> {
    let format = OutputFormat::parse(format)?;
    overrides.apply(&mut config)?;
    config.validate()?;
    check_out_path(out.as_ref(), overwrite)?;

    let options = ScanOptions::from_config(&config.scan)?;
    let summary = scan_tree(root, &options)?;
    let policy = PolicyDocument::locate(policy.as_deref(), root)?;
    let prompt = build_prompt(&policy, &summary, &PromptLimits::from_config(&config.prompt))?;

    let api_key = config
        .ai
        .api_key_env()
        .and_then(|name| std::env::var(name).ok());
    let provider = provider_from_config(&config.ai, api_key)?;
    let retry = RetryPolicy::from_millis(config.ai.retry_backoff_ms);
    let response = request_report(
        provider.as_ref(),
        &prompt,
        &retry,
        Some(config.ai.max_output_tokens),
    )?;

    let report = AuditReport::new(&summary, &policy, &prompt, provider_label(&config), response)?;
    let text = match format {
        OutputFormat::Markdown => render_markdown(&report),
        OutputFormat::Json => render_json(&report)?,
    };
    emit(out.as_ref(), &text)?;
    if let Some(path) = &out {
        tracing::info!(out = %path.display(), "report written");
    }
    Ok(())
}

fn provider_label(config: &Config) -> String {
    let endpoint = config.ai.endpoint();
    if endpoint.starts_with("mock://") {
        endpoint
    } else {
        format!("{}/{}", config.ai.provider.as_str(), config.ai.model())
    }
}
