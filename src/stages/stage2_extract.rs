use tracing::{info, warn};

use crate::error::{GatewayError, WorkbenchError, WorkbenchResult};
use crate::llm::{ModelGateway, ModelRequest, ModelSettings, build_prompt, system_message};
use crate::models::{ExtractionResults, PromptStage, SessionState};
use crate::stages::require_credential;

pub const STEP1_REQUIRED: &str = "Step 1 required";

/// Result of Stage 2
#[derive(Debug, Clone, PartialEq)]
pub struct Stage2Result {
    /// Results stored into the session after this run
    pub results: ExtractionResults,
    /// Calls that failed, in prompt order
    pub failures: Vec<(PromptStage, GatewayError)>,
}

impl Stage2Result {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Execute Stage 2: structured extraction
///
/// Issues the base-info, skills and responsibilities calls concurrently.
/// Each call is isolated: a failure leaves its own field as it was before the
/// run (unset on a first run) and is reported in [`Stage2Result::failures`].
/// The session is written once, after all three calls resolve. If every call
/// fails, the session is untouched and the first failure is returned.
pub async fn execute_stage2(
    gateway: &dyn ModelGateway,
    state: &mut SessionState,
    settings: &ModelSettings,
) -> WorkbenchResult<Stage2Result> {
    if state.enhanced_text.is_none() {
        return Err(WorkbenchError::validation(STEP1_REQUIRED));
    }
    let credential = require_credential(state)?;

    let [base_info, skills, responsibilities] = PromptStage::EXTRACTION;
    let base_info_request = extraction_request(state, settings, base_info)?;
    let skills_request = extraction_request(state, settings, skills)?;
    let responsibilities_request = extraction_request(state, settings, responsibilities)?;

    info!("Stage 2: issuing 3 extraction calls with {}", settings.model);

    let (base_info_out, skills_out, responsibilities_out) = tokio::join!(
        gateway.invoke(credential, &base_info_request),
        gateway.invoke(credential, &skills_request),
        gateway.invoke(credential, &responsibilities_request),
    );

    let mut results = state.extraction_results.clone().unwrap_or_default();
    let mut failures = Vec::new();

    for (stage, outcome) in [
        (base_info, base_info_out),
        (skills, skills_out),
        (responsibilities, responsibilities_out),
    ] {
        match outcome {
            Ok(text) => {
                info!("Stage 2: {} returned {} chars", stage, text.chars().count());
                results.set(stage, Some(text));
            }
            Err(e) => {
                warn!("Stage 2: {} failed: {}", stage, e);
                failures.push((stage, e));
            }
        }
    }

    if failures.len() == PromptStage::EXTRACTION.len() {
        let (_, first) = failures.swap_remove(0);
        return Err(WorkbenchError::Gateway(first));
    }

    state.extraction_results = Some(results.clone());

    Ok(Stage2Result { results, failures })
}

fn extraction_request(
    state: &SessionState,
    settings: &ModelSettings,
    stage: PromptStage,
) -> WorkbenchResult<ModelRequest> {
    let prompt = build_prompt(state, stage, None)?;
    Ok(ModelRequest::new(settings, system_message(stage), &prompt))
}
