use globset::{Glob, GlobSet, GlobSetBuilder};
use treeaudit_core::{AppError, AppResult};

/// Version-control metadata, dependency and bytecode caches, virtual
/// environments and OS litter.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".bzr",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    ".tox",
    ".nox",
    ".venv",
    "venv",
    "node_modules",
    ".ipynb_checkpoints",
    "*.pyc",
    "*.pyo",
    ".DS_Store",
];

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    skip_hidden: bool,
    patterns: Vec<String>,
    globs: GlobSet,
}

impl IgnoreRules {
    pub fn new(skip_hidden: bool, use_defaults: bool, extra: &[String]) -> AppResult<Self> {
        let mut patterns: Vec<String> = Vec::new();
        if use_defaults {
            patterns.extend(DEFAULT_IGNORES.iter().map(|p| p.to_string()));
        }
        for pattern in extra {
            if !patterns.contains(pattern) {
                patterns.push(pattern.clone());
            }
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                AppError::usage(format!("invalid ignore pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| AppError::usage(format!("ignore patterns failed to compile: {e}")))?;

        Ok(Self {
            skip_hidden,
            patterns,
            globs,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// `name` is the final path component, `relative_path` is `/`-separated
    /// from the scan root.
    pub fn is_ignored(&self, relative_path: &str, name: &str) -> bool {
        if self.skip_hidden && name.starts_with('.') {
            return true;
        }
        self.globs.is_match(name) || self.globs.is_match(relative_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_vcs_and_caches() {
        let rules = IgnoreRules::new(true, true, &[]).unwrap();
        assert!(rules.is_ignored(".git", ".git"));
        assert!(rules.is_ignored("pkg/__pycache__", "__pycache__"));
        assert!(rules.is_ignored("web/node_modules", "node_modules"));
        assert!(rules.is_ignored("pkg/mod.pyc", "mod.pyc"));
        assert!(!rules.is_ignored("src/main.py", "main.py"));
    }

    #[test]
    fn hidden_entries_follow_flag() {
        let rules = IgnoreRules::new(false, false, &[]).unwrap();
        assert!(!rules.is_ignored(".env", ".env"));
        let rules = IgnoreRules::new(true, false, &[]).unwrap();
        assert!(rules.is_ignored(".env", ".env"));
    }

    #[test]
    fn extra_patterns_match_relative_paths() {
        let rules = IgnoreRules::new(true, true, &["build/*.log".to_string()]).unwrap();
        assert!(rules.is_ignored("build/out.log", "out.log"));
        assert!(!rules.is_ignored("logs/out.log", "out.log"));
        assert!(rules.patterns().iter().any(|p| p == "build/*.log"));
    }

    #[test]
    fn dropping_defaults_keeps_only_extras() {
        let rules = IgnoreRules::new(false, false, &["*.tmp".to_string()]).unwrap();
        assert!(!rules.is_ignored("node_modules", "node_modules"));
        assert!(rules.is_ignored("a.tmp", "a.tmp"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(IgnoreRules::new(true, true, &["a[".to_string()]).is_err());
    }
}
