use std::fs;
use std::path::{Path, PathBuf};
use treeaudit_core::{AppError, AppResult};

pub const DEFAULT_POLICY_FILE: &str = "policy.txt";

/// Free-text rules. Passed to the model as-is; never parsed or truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    source: PathBuf,
    text: String,
}

impl PolicyDocument {
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::policy(format!("failed to read policy {}: {e}", path.display()))
        })?;
        if text.trim().is_empty() {
            return Err(AppError::policy(format!(
                "policy {} is empty",
                path.display()
            )));
        }
        Ok(Self {
            source: path.to_path_buf(),
            text,
        })
    }

    /// An explicit path wins. Otherwise `policy.txt` in `root`, then in
    /// the parent of `root`.
    pub fn locate(explicit: Option<&Path>, root: &Path) -> AppResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let mut candidates = vec![root.join(DEFAULT_POLICY_FILE)];
        if let Some(parent) = root.parent() {
            candidates.push(parent.join(DEFAULT_POLICY_FILE));
        }
        for candidate in &candidates {
            if candidate.is_file() {
                tracing::info!(policy = %candidate.display(), "using discovered policy");
                return Self::load(candidate);
            }
        }
        Err(AppError::policy(format!(
            "no policy given and {DEFAULT_POLICY_FILE} not found in {} or its parent",
            root.display()
        )))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
