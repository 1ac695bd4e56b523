use crate::ai::CompletionRequest;
use crate::policy::PolicyDocument;
use treeaudit_core::config::PromptConfig;
use treeaudit_core::{AppError, AppResult};
use treeaudit_scan::{FileEntry, ScanSummary, WarningKind};

pub const SYSTEM_PROMPT: &str = "You are an expert project steward who keeps code and data repositories clean, transparent and reproducible. \
Review the listed project files against the policy. Report each violation with the offending path and the rule it breaks, \
then show the corrected structure. Never apologise for enforcing the policy.";

const INSTRUCTIONS: &str = "Analyze whether the project structure follows the policy. \
Identify missing components, incorrect organization, naming violations and any other deviations. \
Respond in markdown with a short verdict followed by the list of findings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub max_entries: usize,
    pub max_prompt_bytes: usize,
}

impl PromptLimits {
    pub fn from_config(config: &PromptConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            max_prompt_bytes: config.max_prompt_bytes,
        }
    }
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct AuditPrompt {
    pub system: String,
    pub user: String,
    pub total: usize,
    pub listed: usize,
    pub omitted: usize,
}

impl AuditPrompt {
    pub fn to_request(&self, max_output_tokens: Option<u32>) -> CompletionRequest {
        CompletionRequest {
            system: self.system.clone(),
            prompt: self.user.clone(),
            max_output_tokens,
        }
    }
}

/// Embeds the policy verbatim and as many sorted entries as the limits
/// allow. Dropped entries are counted in a trailing `[N more omitted]` line.
pub fn build_prompt(
    policy: &PolicyDocument,
    summary: &ScanSummary,
    limits: &PromptLimits,
) -> AppResult<AuditPrompt> {
    let total = summary.entries.len();

    let mut head = String::new();
    head.push_str("Project Structure Policy:\n");
    head.push_str(policy.text());
    if !policy.text().ends_with('\n') {
        head.push('\n');
    }
    head.push('\n');
    head.push_str(&format!(
        "Project Files ({} under `{}`):\n",
        counted(total, "file", "files"),
        root_label(summary)
    ));

    let mut tail = String::new();
    let unreadable = summary.warning_count(WarningKind::Unreadable);
    if unreadable > 0 {
        tail.push_str(&format!(
            "\n{} could not be read and {} not listed.\n",
            counted(unreadable, "entry", "entries"),
            if unreadable == 1 { "is" } else { "are" }
        ));
    }
    let capped = summary.warning_count(WarningKind::DepthCap);
    if capped > 0 {
        tail.push_str(&format!(
            "\n{} at the depth cap {} not descended; their contents are not listed.\n",
            counted(capped, "directory", "directories"),
            if capped == 1 { "was" } else { "were" }
        ));
    }
    tail.push('\n');
    tail.push_str(INSTRUCTIONS);
    tail.push('\n');

    let reserve = if total > 0 {
        omitted_marker(total).len()
    } else {
        0
    };
    let fixed = head.len() + tail.len() + SYSTEM_PROMPT.len();
    if fixed + reserve > limits.max_prompt_bytes {
        return Err(AppError::policy(format!(
            "policy {} needs {} bytes but the prompt budget is {} bytes; refusing to truncate it",
            policy.source().display(),
            fixed + reserve,
            limits.max_prompt_bytes
        )));
    }

    let mut body = String::new();
    let mut used = fixed + reserve;
    let mut listed = 0usize;
    for entry in &summary.entries {
        if listed >= limits.max_entries {
            break;
        }
        let line = entry_line(entry);
        if used + line.len() > limits.max_prompt_bytes {
            break;
        }
        used += line.len();
        body.push_str(&line);
        listed += 1;
    }
    let omitted = total - listed;
    if omitted > 0 {
        body.push_str(&omitted_marker(omitted));
    }
    if total == 0 {
        body.push_str("(no files)\n");
    }

    tracing::debug!(total, listed, omitted, bytes = used, "prompt assembled");

    Ok(AuditPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!("{head}{body}{tail}"),
        total,
        listed,
        omitted,
    })
}

fn entry_line(entry: &FileEntry) -> String {
    let mut line = format!("- {} ({} bytes)\n", entry.relative_path, entry.size_bytes);
    if let Some(preview) = &entry.preview {
        for text in preview.lines() {
            line.push_str("    | ");
            line.push_str(text);
            line.push('\n');
        }
    }
    line
}

pub(crate) fn omitted_marker(count: usize) -> String {
    format!("[{} more omitted]\n", group_thousands(count))
}

fn counted(count: usize, one: &str, many: &str) -> String {
    let noun = if count == 1 { one } else { many };
    format!("{} {noun}", group_thousands(count))
}

fn root_label(summary: &ScanSummary) -> String {
    summary
        .root()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| summary.root().display().to_string())
}

/// `9500` -> `9,500`.
pub fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
