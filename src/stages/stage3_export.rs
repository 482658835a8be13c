use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{WorkbenchError, WorkbenchResult};
use crate::models::{ExportBundle, ExportedExtraction, SessionState};
use crate::stages::STEP1_REQUIRED;

pub const STEP2_REQUIRED: &str = "Step 2 required";

/// Execute Stage 3: assemble the export bundle
///
/// Read-only: no model calls, no session mutation. Requires the enhanced text
/// and a complete set of extraction results.
pub fn execute_stage3(
    state: &SessionState,
    generated_at: DateTime<Local>,
) -> WorkbenchResult<ExportBundle> {
    let enhanced_text = state
        .enhanced_text
        .as_ref()
        .ok_or_else(|| WorkbenchError::validation(STEP1_REQUIRED))?;

    let results = state
        .extraction_results
        .as_ref()
        .ok_or_else(|| WorkbenchError::validation(STEP2_REQUIRED))?;

    let extraction = ExportedExtraction::from_results(results).ok_or_else(|| {
        let missing: Vec<&str> = results.missing().iter().map(|s| s.as_str()).collect();
        WorkbenchError::validation(format!(
            "Step 2 incomplete: {} missing",
            missing.join(", ")
        ))
    })?;

    let bundle = ExportBundle::new(
        enhanced_text.clone(),
        extraction,
        state.company_context.clone(),
        &generated_at,
    );

    info!("Stage 3: export bundle ready ({})", bundle.file_name());

    Ok(bundle)
}
