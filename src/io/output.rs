use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::{ExportBundle, PromptStage, SessionState};

/// Write the export bundle as pretty JSON into `dir`.
///
/// The file is named after the bundle timestamp; the full path is returned.
pub fn write_export(bundle: &ExportBundle, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {:?}", dir))?;

    let path = dir.join(bundle.file_name());
    let json = bundle
        .to_json_pretty()
        .context("Failed to serialize export")?;
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write file: {:?}", path))?;

    Ok(path)
}

/// Side-by-side view of step 1 and step 2 output
pub fn format_comparison(state: &SessionState) -> String {
    let mut output = String::new();

    output.push_str("== Enhanced Text (Step 1) ==\n");
    output.push_str(state.enhanced_text.as_deref().unwrap_or("(not available)"));
    output.push_str("\n\n== Structured Data (Step 2) ==\n");

    for stage in PromptStage::EXTRACTION {
        output.push_str(&format!("-- {} --\n", section_title(stage)));
        let text = state
            .extraction_results
            .as_ref()
            .and_then(|r| r.get(stage))
            .unwrap_or("(not available)");
        output.push_str(text);
        output.push_str("\n\n");
    }

    output
}

fn section_title(stage: PromptStage) -> &'static str {
    match stage {
        PromptStage::Enhance => "Enhanced Text",
        PromptStage::BaseInfo => "Base Info",
        PromptStage::Skills => "Skills",
        PromptStage::Responsibilities => "Responsibilities",
    }
}
