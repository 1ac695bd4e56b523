use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use treeaudit_core::json::fingerprint;
use treeaudit_core::AppResult;

/// One file seen during a scan. `relative_path` always uses `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub relative_path: String,
    pub size_bytes: u64,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl FileEntry {
    pub fn new(relative_path: String, size_bytes: u64) -> Self {
        let extension = extension_of(&relative_path);
        Self {
            relative_path,
            size_bytes,
            extension,
            preview: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Entry could not be read; it is missing from `entries`.
    Unreadable,
    /// Symlink back to an ancestor; the target is listed under its own path.
    SymlinkLoop,
    /// Directory at the depth cap with children that were not visited.
    DepthCap,
    /// File is listed but its preview could not be read.
    Preview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub kind: WarningKind,
    pub path: String,
    pub message: String,
}

impl ScanWarning {
    pub fn new(kind: WarningKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub entries: Vec<FileEntry>,
    pub warnings: Vec<ScanWarning>,
}

impl ScanSummary {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.size_bytes))
    }

    pub fn warning_count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// Stable across runs on an unchanged tree.
    pub fn fingerprint(&self) -> AppResult<String> {
        fingerprint(&self.entries)
    }
}

fn extension_of(relative_path: &str) -> String {
    let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx + 1..].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_keeps_case_and_ignores_dotfiles() {
        assert_eq!(FileEntry::new("docs/Final Report.CSV".into(), 1).extension, "CSV");
        assert_eq!(FileEntry::new("archive.tar.gz".into(), 1).extension, "gz");
        assert_eq!(FileEntry::new("Makefile".into(), 1).extension, "");
        assert_eq!(FileEntry::new("cfg/.env".into(), 1).extension, "");
        assert_eq!(FileEntry::new("v1.2/README".into(), 1).extension, "");
    }

    #[test]
    fn fingerprint_tracks_entries() {
        let mut summary = ScanSummary {
            root: PathBuf::from("/tmp/x"),
            entries: vec![FileEntry::new("a.txt".into(), 3)],
            warnings: Vec::new(),
        };
        let before = summary.fingerprint().unwrap();
        assert_eq!(before, summary.fingerprint().unwrap());
        summary.entries[0].size_bytes = 4;
        assert_ne!(before, summary.fingerprint().unwrap());
    }
}
