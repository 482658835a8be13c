use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a raw job description from a file, or from stdin when `path` is `-`
pub fn read_job_description(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read job description from stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
}

/// Read a saved prompt override from disk
pub fn read_prompt_file(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file: {:?}", path))?;
    if text.trim().is_empty() {
        anyhow::bail!("Prompt file {:?} is empty", path);
    }
    Ok(text)
}
