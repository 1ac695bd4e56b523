use crate::entry::{FileEntry, ScanSummary, ScanWarning, WarningKind};
use crate::ignore::IgnoreRules;
use crate::preview::PreviewReader;
use std::fs;
use std::path::{Component, Path};
use treeaudit_core::config::ScanConfig;
use treeaudit_core::{AppError, AppResult};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub ignore: IgnoreRules,
    pub max_depth: usize,
    pub follow_links: bool,
    pub preview: PreviewReader,
}

impl ScanOptions {
    pub fn from_config(config: &ScanConfig) -> AppResult<Self> {
        if config.max_depth == 0 {
            return Err(AppError::usage("scan.max_depth must be > 0"));
        }
        Ok(Self {
            ignore: IgnoreRules::new(
                config.skip_hidden,
                config.use_default_ignores,
                &config.ignore,
            )?,
            max_depth: config.max_depth,
            follow_links: config.follow_links,
            preview: PreviewReader::new(config.preview_chars, config.preview_max_file_bytes)?,
        })
    }
}

/// Walks `root` and returns every non-ignored file sorted by relative path.
///
/// Symlinks are followed when `follow_links` is set; a link back to one of
/// its ancestors is reported as a warning and not descended. Unreadable
/// entries below the root become warnings; an unreadable root is fatal.
pub fn scan_tree(root: &Path, options: &ScanOptions) -> AppResult<ScanSummary> {
    let metadata = fs::metadata(root).map_err(|e| {
        AppError::filesystem(format!("cannot access root {}: {e}", root.display()))
    })?;
    if !metadata.is_dir() {
        return Err(AppError::filesystem(format!(
            "root {} is not a directory",
            root.display()
        )));
    }

    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    let mut walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .max_depth(options.max_depth)
        .sort_by_file_name()
        .into_iter();

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) => {
                if err.depth() == 0 {
                    return Err(AppError::filesystem(format!(
                        "cannot read root {}: {err}",
                        root.display()
                    )));
                }
                let rel = err
                    .path()
                    .map(|p| relative_path(root, p))
                    .unwrap_or_default();
                let name = rel.rsplit('/').next().unwrap_or_default().to_string();
                if !rel.is_empty() && options.ignore.is_ignored(&rel, &name) {
                    tracing::debug!(path = %rel, "ignored unreadable entry");
                    continue;
                }
                let warning = match err.loop_ancestor() {
                    Some(ancestor) => ScanWarning::new(
                        WarningKind::SymlinkLoop,
                        rel,
                        format!(
                            "symlink loop to {}; not descended",
                            relative_or_root(root, ancestor)
                        ),
                    ),
                    None => ScanWarning::new(WarningKind::Unreadable, rel, err.to_string()),
                };
                push_warning(&mut warnings, warning);
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let rel = relative_path(root, entry.path());
        let name = entry.file_name().to_string_lossy();
        let file_type = entry.file_type();

        if options.ignore.is_ignored(&rel, &name) {
            if file_type.is_dir() {
                tracing::debug!(path = %rel, "ignored directory");
                walker.skip_current_dir();
            }
            continue;
        }

        if file_type.is_dir() {
            if entry.depth() == options.max_depth {
                match fs::read_dir(entry.path()) {
                    Ok(mut children) => {
                        if children.next().is_some() {
                            push_warning(
                                &mut warnings,
                                ScanWarning::new(
                                    WarningKind::DepthCap,
                                    rel,
                                    format!(
                                        "depth cap {} reached; not descended",
                                        options.max_depth
                                    ),
                                ),
                            );
                        }
                    }
                    Err(err) => push_warning(
                        &mut warnings,
                        ScanWarning::new(WarningKind::Unreadable, rel, err.to_string()),
                    ),
                }
            }
            continue;
        }
        if !file_type.is_file() {
            if file_type.is_symlink() {
                tracing::debug!(path = %rel, "symlink not followed");
            } else {
                tracing::debug!(path = %rel, "not a regular file");
            }
            continue;
        }

        let size_bytes = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                push_warning(
                    &mut warnings,
                    ScanWarning::new(WarningKind::Unreadable, rel, err.to_string()),
                );
                continue;
            }
        };

        let mut file = FileEntry::new(rel, size_bytes);
        match options.preview.read(entry.path(), size_bytes) {
            Ok(preview) => file.preview = preview,
            Err(err) => push_warning(
                &mut warnings,
                ScanWarning::new(
                    WarningKind::Preview,
                    file.relative_path.clone(),
                    format!("preview unavailable: {err}"),
                ),
            ),
        }
        entries.push(file);
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    warnings.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));

    tracing::info!(
        root = %root.display(),
        files = entries.len(),
        warnings = warnings.len(),
        "scan complete"
    );

    Ok(ScanSummary {
        root: root.to_path_buf(),
        entries,
        warnings,
    })
}

fn push_warning(warnings: &mut Vec<ScanWarning>, warning: ScanWarning) {
    tracing::warn!(path = %warning.path, kind = ?warning.kind, "{}", warning.message);
    warnings.push(warning);
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn relative_or_root(root: &Path, path: &Path) -> String {
    let rel = relative_path(root, path);
    if rel.is_empty() {
        ".".to_string()
    } else {
        rel
    }
}
