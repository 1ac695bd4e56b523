use crate::ai::{AiProvider, CollaboratorError};
use crate::policy::PolicyDocument;
use crate::prompt::{group_thousands, omitted_marker, AuditPrompt};
use crate::retry::{complete_with_retry, RetryPolicy};
use serde::Serialize;
use treeaudit_core::{AppError, AppResult};
use treeaudit_scan::{ScanSummary, ScanWarning};

/// Sends the prompt and returns the model text unmodified.
pub fn request_report(
    provider: &dyn AiProvider,
    prompt: &AuditPrompt,
    retry: &RetryPolicy,
    max_output_tokens: Option<u32>,
) -> Result<String, CollaboratorError> {
    let request = prompt.to_request(max_output_tokens);
    tracing::info!(
        listed = prompt.listed,
        omitted = prompt.omitted,
        prompt_bytes = request.prompt.len(),
        "requesting audit"
    );
    let response = complete_with_retry(provider, &request, retry)?;
    Ok(response.text)
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub root: String,
    pub policy: String,
    pub policy_text: String,
    pub provider: String,
    pub tree_sha256: String,
    pub files_total: usize,
    pub files_listed: usize,
    pub files_omitted: usize,
    /// Paths that were sent to the model, in prompt order.
    pub files: Vec<String>,
    pub response: String,
    pub warnings: Vec<ScanWarning>,
}

impl AuditReport {
    pub fn new(
        summary: &ScanSummary,
        policy: &PolicyDocument,
        prompt: &AuditPrompt,
        provider: impl Into<String>,
        response: String,
    ) -> AppResult<Self> {
        Ok(Self {
            root: summary.root().display().to_string(),
            policy: policy.source().display().to_string(),
            policy_text: policy.text().to_string(),
            provider: provider.into(),
            tree_sha256: summary.fingerprint()?,
            files_total: prompt.total,
            files_listed: prompt.listed,
            files_omitted: prompt.omitted,
            files: summary
                .entries
                .iter()
                .take(prompt.listed)
                .map(|e| e.relative_path.clone())
                .collect(),
            response,
            warnings: summary.warnings.clone(),
        })
    }
}

pub fn render_markdown(report: &AuditReport) -> String {
    let mut out = String::new();
    out.push_str("# Project Structure Audit\n\n");
    out.push_str(&format!("- root: `{}`\n", report.root));
    out.push_str(&format!("- policy: `{}`\n", report.policy));
    out.push_str(&format!("- provider: `{}`\n", report.provider));
    out.push_str(&format!(
        "- files: {} total, {} listed, {} omitted\n",
        group_thousands(report.files_total),
        group_thousands(report.files_listed),
        group_thousands(report.files_omitted)
    ));
    out.push_str(&format!("- tree_sha256: `{}`\n\n", report.tree_sha256));

    out.push_str("## Policy\n\n");
    out.push_str(&report.policy_text);
    if !report.policy_text.ends_with('\n') {
        out.push('\n');
    }

    out.push_str("\n## Files Analyzed\n\n");
    for path in &report.files {
        out.push_str(&format!("- `{path}`\n"));
    }
    if report.files_omitted > 0 {
        out.push_str(&omitted_marker(report.files_omitted));
    }
    if report.files.is_empty() && report.files_omitted == 0 {
        out.push_str("(no files)\n");
    }
    out.push('\n');

    out.push_str("## Findings\n\n");
    out.push_str(&report.response);
    if !report.response.ends_with('\n') {
        out.push('\n');
    }

    if !report.warnings.is_empty() {
        out.push_str("\n## Scan Warnings\n\n");
        for warning in &report.warnings {
            out.push_str(&format!("- `{}`: {}\n", warning.path, warning.message));
        }
    }

    out
}

pub fn render_json(report: &AuditReport) -> AppResult<String> {
    let mut text = serde_json::to_string_pretty(report)
        .map_err(|e| AppError::internal(format!("report encode error: {e}")))?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{CompletionRequest, CompletionResponse};
    use crate::prompt::{build_prompt, PromptLimits};
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use treeaudit_scan::{FileEntry, WarningKind};

    fn fixture() -> (tempfile::TempDir, PolicyDocument, ScanSummary) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.txt");
        fs::write(&path, "lowercase filenames only").unwrap();
        let policy = PolicyDocument::load(&path).unwrap();
        let summary = ScanSummary {
            root: PathBuf::from("/work/project"),
            entries: vec![
                FileEntry::new("Final Report.csv".to_string(), 10),
                FileEntry::new("src/main.py".to_string(), 20),
            ],
            warnings: vec![ScanWarning::new(
                WarningKind::Unreadable,
                "locked",
                "Permission denied (os error 13)",
            )],
        };
        (dir, policy, summary)
    }

    #[test]
    fn response_is_passed_through_verbatim() {
        let (_dir, policy, summary) = fixture();
        let prompt = build_prompt(&policy, &summary, &PromptLimits::default()).unwrap();
        let reply = "**Violation**: `Final Report.csv`  \n  keep *this* spacing\n\n";
        let provider = |req: &CompletionRequest| -> Result<CompletionResponse, CollaboratorError> {
            assert!(req.prompt.contains("Final Report.csv"));
            Ok(CompletionResponse {
                text: reply.to_string(),
            })
        };
        let text = request_report(
            &provider,
            &prompt,
            &RetryPolicy::new(Duration::ZERO),
            Some(100),
        )
        .unwrap();
        assert_eq!(text, reply);

        let report = AuditReport::new(&summary, &policy, &prompt, "stub", text).unwrap();
        let rendered = render_markdown(&report);
        assert!(rendered.contains(reply));
        assert!(rendered.contains("## Scan Warnings"));
        assert!(rendered.contains("- `locked`: Permission denied"));
        assert!(rendered.contains("2 total, 2 listed, 0 omitted"));
    }

    #[test]
    fn failure_never_yields_a_report() {
        let (_dir, policy, summary) = fixture();
        let prompt = build_prompt(&policy, &summary, &PromptLimits::default()).unwrap();
        let provider = |_: &CompletionRequest| -> Result<CompletionResponse, CollaboratorError> {
            Err(CollaboratorError::Network("connection refused".into()))
        };
        let err = request_report(&provider, &prompt, &RetryPolicy::new(Duration::ZERO), None)
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Network(_)));
    }

    #[test]
    fn json_render_carries_counts() {
        let (_dir, policy, summary) = fixture();
        let prompt = build_prompt(&policy, &summary, &PromptLimits::default()).unwrap();
        let report =
            AuditReport::new(&summary, &policy, &prompt, "stub", "ok".to_string()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
        assert_eq!(json["files_total"], 2);
        assert_eq!(json["response"], "ok");
        assert_eq!(json["tree_sha256"].as_str().unwrap().len(), 64);
        assert_eq!(json["warnings"][0]["path"], "locked");
        assert_eq!(json["warnings"][0]["kind"], "unreadable");
        assert_eq!(json["policy_text"], "lowercase filenames only");
        assert_eq!(json["files"][0], "Final Report.csv");
    }

    #[test]
    fn markdown_carries_policy_and_analyzed_files() {
        let (_dir, policy, mut summary) = fixture();
        summary.entries.push(FileEntry::new("zz/late.txt".to_string(), 5));
        let limits = PromptLimits {
            max_entries: 2,
            max_prompt_bytes: 200_000,
        };
        let prompt = build_prompt(&policy, &summary, &limits).unwrap();
        let report =
            AuditReport::new(&summary, &policy, &prompt, "stub", "verdict".to_string()).unwrap();
        assert_eq!(report.files, vec!["Final Report.csv", "src/main.py"]);

        let rendered = render_markdown(&report);
        assert!(rendered.contains("## Policy\n\nlowercase filenames only\n"));
        assert!(rendered.contains(
            "## Files Analyzed\n\n- `Final Report.csv`\n- `src/main.py`\n[1 more omitted]\n"
        ));
        assert!(!rendered.contains("zz/late.txt"));
        let policy_at = rendered.find("## Policy").unwrap();
        let files_at = rendered.find("## Files Analyzed").unwrap();
        let findings_at = rendered.find("## Findings").unwrap();
        assert!(policy_at < files_at && files_at < findings_at);
    }

    #[test]
    fn markdown_omits_empty_warning_section() {
        let (_dir, policy, mut summary) = fixture();
        summary.warnings.clear();
        let prompt = build_prompt(&policy, &summary, &PromptLimits::default()).unwrap();
        let report =
            AuditReport::new(&summary, &policy, &prompt, "stub", "fine".to_string()).unwrap();
        let rendered = render_markdown(&report);
        assert!(!rendered.contains("Scan Warnings"));
        assert!(rendered.ends_with("fine\n"));
    }
}
