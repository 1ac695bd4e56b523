use std::fs;
use std::io::Write;
use std::path::PathBuf;
use treeaudit_core::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            _ => Err(AppError::usage(format!(
                "invalid --format '{value}'; expected markdown|json"
            ))),
        }
    }
}

/// Checked before any work so a refused overwrite costs nothing.
pub fn check_out_path(out: Option<&PathBuf>, overwrite: bool) -> AppResult<()> {
    let Some(path) = out else {
        return Ok(());
    };
    if path.exists() && path.is_dir() {
        return Err(AppError::usage("report output path is a directory"));
    }
    if path.exists() && !overwrite {
        return Err(AppError::usage(format!(
            "{} already exists; use --overwrite to replace",
            path.display()
        )));
    }
    Ok(())
}

pub fn emit(out: Option<&PathBuf>, text: &str) -> AppResult<()> {
    match out {
        Some(path) => fs::write(path, text).map_err(|e| {
            AppError::internal(format!("failed to write {}: {e}", path.display()))
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .map_err(|e| AppError::internal(format!("failed to write stdout: {e}")))?;
            stdout
                .flush()
                .map_err(|e| AppError::internal(format!("failed to flush stdout: {e}")))
        }
    }
}
