use crate::output::emit;
use serde::Serialize;
use std::path::Path;
use treeaudit_core::config::Config;
use treeaudit_core::{AppError, AppResult};
use treeaudit_scan::{scan_tree, FileEntry, ScanOptions, ScanWarning};

#[derive(Debug, Serialize)]
struct ScanOutput<'a> {
    root: String,
    tree_sha256: String,
    files: usize,
    total_bytes: u64,
    entries: &'a [FileEntry],
    warnings: &'a [ScanWarning],
}

pub fn scan_command(root: &Path, json: bool, config: &Config) -> AppResult<()> {
    config.scan.validate()?;
    let options = ScanOptions::from_config(&config.scan)?;
    let summary = scan_tree(root, &options)?;
    let tree_sha256 = summary.fingerprint()?;

    let text = if json {
        let output = ScanOutput {
            root: summary.root().display().to_string(),
            tree_sha256,
            files: summary.entries.len(),
            total_bytes: summary.total_bytes(),
            entries: &summary.entries,
            warnings: &summary.warnings,
        };
        let mut text = serde_json::to_string_pretty(&output)
            .map_err(|e| AppError::internal(format!("scan encode error: {e}")))?;
        text.push('\n');
        text
    } else {
        let mut text = String::new();
        for entry in &summary.entries {
            text.push_str(&format!("{:>12}  {}\n", entry.size_bytes, entry.relative_path));
        }
        for warning in &summary.warnings {
            text.push_str(&format!("warning  {}: {}\n", warning.path, warning.message));
        }
        text.push_str(&format!(
            "{} files, {} bytes, tree_sha256 {}\n",
            summary.entries.len(),
            summary.total_bytes(),
            tree_sha256
        ));
        text
    };
    emit(None, &text)
}
