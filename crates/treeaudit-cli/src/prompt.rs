use crate::output::emit;
use std::path::{Path, PathBuf};
use treeaudit_core::config::Config;
use treeaudit_core::AppResult;
use treeaudit_report::{build_prompt, PolicyDocument, PromptLimits};
use treeaudit_scan::{scan_tree, ScanOptions};

pub fn prompt_command(root: &Path, policy: Option<PathBuf>, config: &Config) -> AppResult<()> {
    config.validate()?;
    let options = ScanOptions::from_config(&config.scan)?;
    let summary = scan_tree(root, &options)?;
    let policy = PolicyDocument::locate(policy.as_deref(), root)?;
    let prompt = build_prompt(&policy, &summary, &PromptLimits::from_config(&config.prompt))?;

    let text = format!(
        "### system\n\n{}\n\n### user\n\n{}",
        prompt.system, prompt.user
    );
    emit(None, &text)
}
