use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::Path;
use treeaudit_core::{AppError, AppResult};

/// Reads the head of small text files for inclusion in the prompt.
#[derive(Debug, Clone)]
pub struct PreviewReader {
    chars: usize,
    max_file_bytes: u64,
    fences: Regex,
    controls: Regex,
}

impl PreviewReader {
    pub fn new(chars: usize, max_file_bytes: u64) -> AppResult<Self> {
        let fences = Regex::new(r"`{3,}")
            .map_err(|e| AppError::internal(format!("preview fence regex: {e}")))?;
        let controls = Regex::new(r"[\x00-\x08\x0B-\x1F\x7F]")
            .map_err(|e| AppError::internal(format!("preview control regex: {e}")))?;
        Ok(Self {
            chars,
            max_file_bytes,
            fences,
            controls,
        })
    }

    pub fn enabled(&self) -> bool {
        self.chars > 0
    }

    /// `Ok(None)` when previews are off or the file is too large.
    pub fn read(&self, path: &Path, size_bytes: u64) -> std::io::Result<Option<String>> {
        if !self.enabled() || size_bytes > self.max_file_bytes {
            return Ok(None);
        }
        let limit = (self.chars as u64).saturating_mul(4);
        let mut buf = Vec::new();
        fs::File::open(path)?.take(limit).read_to_end(&mut buf)?;
        let text: String = String::from_utf8_lossy(&buf).chars().take(self.chars).collect();
        Ok(Some(self.sanitize(&text)))
    }

    pub fn sanitize(&self, text: &str) -> String {
        let out = self.fences.replace_all(text, "");
        let out = self.controls.replace_all(&out, " ");
        out.trim_end().to_string()
    }
}
