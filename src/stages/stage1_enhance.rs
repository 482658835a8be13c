use tracing::{info, warn};

use crate::error::{WorkbenchError, WorkbenchResult};
use crate::llm::{ModelGateway, ModelRequest, ModelSettings, build_prompt, system_message};
use crate::models::{PromptStage, SessionState};
use crate::stages::require_credential;

pub const EMPTY_INPUT: &str = "Please enter job description text first.";

/// Result of Stage 1
#[derive(Debug, Clone, PartialEq)]
pub struct Stage1Result {
    /// Model output, stored unmodified as the session's enhanced text
    pub enhanced_text: String,
    /// Whether a saved prompt override was sent instead of the template
    pub used_override: bool,
}

/// Execute Stage 1: text enhancement
///
/// 1. Reject empty input without calling the model
/// 2. Build the enhancement prompt (or take the saved override)
/// 3. Call the model with the enhancement system message
/// 4. Store the returned text as the session's enhanced text
///
/// On a failed call the previous enhanced text, if any, is kept.
pub async fn execute_stage1(
    gateway: &dyn ModelGateway,
    state: &mut SessionState,
    settings: &ModelSettings,
    raw_text: &str,
) -> WorkbenchResult<Stage1Result> {
    if raw_text.trim().is_empty() {
        return Err(WorkbenchError::validation(EMPTY_INPUT));
    }
    let credential = require_credential(state)?;

    let used_override = state.prompt_override(PromptStage::Enhance).is_some();
    let prompt = build_prompt(state, PromptStage::Enhance, Some(raw_text))?;
    let request = ModelRequest::new(settings, system_message(PromptStage::Enhance), &prompt);

    info!(
        "Stage 1: enhancing {} chars of input with {} (override: {})",
        raw_text.chars().count(),
        settings.model,
        used_override
    );

    let enhanced_text = gateway.invoke(credential, &request).await.map_err(|e| {
        warn!("Stage 1 failed: {}", e);
        WorkbenchError::Gateway(e)
    })?;

    info!("Stage 1: received {} chars of enhanced text", enhanced_text.chars().count());
    state.enhanced_text = Some(enhanced_text.clone());

    Ok(Stage1Result {
        enhanced_text,
        used_override,
    })
}
