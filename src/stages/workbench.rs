use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::error::{WorkbenchError, WorkbenchResult};
use crate::llm::{
    ModelGateway, ModelRequest, ModelSettings, PromptContext, build_prompt,
    render_default_prompt,
};
use crate::models::{CompanyField, ExportBundle, PromptStage, SessionState, Step};
use crate::stages::{Stage1Result, Stage2Result, execute_stage1, execute_stage2, execute_stage3};

/// Where the session stands in the three-step flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No credential yet; every stage is gated
    Idle,
    /// Credential set, waiting for text enhancement
    Step1Ready,
    /// Enhanced text available, extraction can run
    Step2Ready,
    /// Enhanced text and complete extraction results available
    Step3Ready,
}

/// Stage controller for one interactive session.
///
/// Owns the session state; every mutation goes through these methods.
pub struct Workbench {
    state: SessionState,
    gateway: Arc<dyn ModelGateway>,
    settings: ModelSettings,
}

impl Workbench {
    pub fn new(gateway: Arc<dyn ModelGateway>, settings: ModelSettings) -> Self {
        let state = SessionState::new();
        info!("Session {} started", state.session_id);
        Self {
            state,
            gateway,
            settings,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ModelSettings) {
        self.settings = settings;
    }

    pub fn phase(&self) -> Phase {
        let state = &self.state;
        if !state.has_credential() {
            Phase::Idle
        } else if state.enhanced_text.is_none() {
            Phase::Step1Ready
        } else if state
            .extraction_results
            .as_ref()
            .is_some_and(|r| r.is_complete())
        {
            Phase::Step3Ready
        } else {
            Phase::Step2Ready
        }
    }

    /// Validate and store an API key.
    ///
    /// The key is checked with a single low-cost call. A rejected key is not
    /// kept, so the session stays gated until a valid one is supplied.
    pub async fn set_credential(&mut self, key: &str) -> WorkbenchResult<()> {
        let key = key.trim();
        if key.is_empty() {
            self.state.credential = None;
            return Err(WorkbenchError::Credential(
                "API key must not be empty".to_string(),
            ));
        }

        match self
            .gateway
            .invoke(key, &ModelRequest::credential_check())
            .await
        {
            Ok(_) => {
                info!("API key validated");
                self.state.credential = Some(key.to_string());
                Ok(())
            }
            Err(e) => {
                warn!("API key rejected: {}", e);
                self.state.credential = None;
                Err(WorkbenchError::Credential(format!(
                    "Invalid OpenAI API key: {}",
                    e
                )))
            }
        }
    }

    pub fn set_company_context(&mut self, field: CompanyField, value: &str) {
        self.state.company_context.set(field, value.trim());
    }

    /// Save an edited prompt; it replaces generation for the rest of the session
    pub fn set_prompt_override(&mut self, stage: PromptStage, text: impl Into<String>) {
        info!("Saved prompt override for {}", stage);
        self.state.prompt_overrides.insert(stage, text.into());
    }

    /// Drop a saved override, returning to the generated prompt
    pub fn clear_prompt_override(&mut self, stage: PromptStage) -> bool {
        self.state.prompt_overrides.remove(&stage).is_some()
    }

    /// Prompt that would be sent for `stage` right now
    pub fn current_prompt(
        &self,
        stage: PromptStage,
        raw_text: Option<&str>,
    ) -> WorkbenchResult<String> {
        build_prompt(&self.state, stage, raw_text)
    }

    /// Template rendering for `stage`, ignoring any saved override.
    ///
    /// Extraction prompts render with the enhanced text when available and an
    /// empty body otherwise.
    pub fn default_prompt(&self, stage: PromptStage, raw_text: Option<&str>) -> String {
        let input_text = if stage.needs_enhanced_text() {
            self.state.enhanced_text.as_deref().unwrap_or_default()
        } else {
            raw_text.unwrap_or_default()
        };
        render_default_prompt(
            stage,
            &PromptContext::new(&self.state.company_context, input_text),
        )
    }

    /// Move to a step. Navigation is never blocked; a warning is returned
    /// when the step's prerequisites are missing.
    pub fn navigate(&mut self, step: Step) -> Option<String> {
        self.state.current_step = step;
        self.step_warning(step)
    }

    /// Warning shown for `step` when its prerequisites are missing
    pub fn step_warning(&self, step: Step) -> Option<String> {
        let state = &self.state;
        match step {
            Step::One => None,
            Step::Two if state.enhanced_text.is_none() => {
                Some("Please complete Step 1 first to get enhanced text.".to_string())
            }
            Step::Two => None,
            Step::Three if state.enhanced_text.is_none() => {
                Some("Please complete Step 1 first.".to_string())
            }
            Step::Three => match &state.extraction_results {
                None => Some("Please complete Step 2 first.".to_string()),
                Some(results) if !results.is_complete() => {
                    let missing: Vec<&str> =
                        results.missing().iter().map(|stage| stage.as_str()).collect();
                    Some(format!(
                        "Step 2 incomplete: {} missing. Re-run Step 2 before exporting.",
                        missing.join(", ")
                    ))
                }
                Some(_) => None,
            },
        }
    }

    pub async fn run_stage1(&mut self, raw_text: &str) -> WorkbenchResult<Stage1Result> {
        execute_stage1(self.gateway.as_ref(), &mut self.state, &self.settings, raw_text).await
    }

    pub async fn run_stage2(&mut self) -> WorkbenchResult<Stage2Result> {
        execute_stage2(self.gateway.as_ref(), &mut self.state, &self.settings).await
    }

    pub fn request_export(&self) -> WorkbenchResult<ExportBundle> {
        execute_stage3(&self.state, Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::llm::CREDENTIAL_CHECK_MODEL;
    use crate::stages::test_support::ScriptedGateway;

    async fn workbench_with(gateway: Arc<ScriptedGateway>) -> Workbench {
        let mut workbench = Workbench::new(gateway.clone(), ModelSettings::default());
        workbench.set_credential("sk-test").await.unwrap();
        gateway.clear();
        workbench
    }

    #[tokio::test]
    async fn test_credential_check_call() {
        let gateway = Arc::new(ScriptedGateway::replying("Hi"));
        let mut workbench = Workbench::new(gateway.clone(), ModelSettings::default());
        assert_eq!(workbench.phase(), Phase::Idle);

        workbench.set_credential("  sk-test  ").await.unwrap();

        assert_eq!(workbench.state().credential.as_deref(), Some("sk-test"));
        assert_eq!(workbench.phase(), Phase::Step1Ready);
        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, CREDENTIAL_CHECK_MODEL);
        assert_eq!(calls[0].max_tokens, 5);
    }

    #[tokio::test]
    async fn test_rejected_credential_keeps_session_gated() {
        let gateway = Arc::new(ScriptedGateway::failing("401 Unauthorized"));
        let mut workbench = Workbench::new(gateway, ModelSettings::default());

        let err = workbench.set_credential("sk-bad").await.unwrap_err();
        assert_eq!(
            err,
            WorkbenchError::Credential("Invalid OpenAI API key: 401 Unauthorized".to_string())
        );
        assert!(workbench.state().credential.is_none());
        assert_eq!(workbench.phase(), Phase::Idle);

        let err = workbench.run_stage1("text").await.unwrap_err();
        assert!(matches!(err, WorkbenchError::Credential(_)));
    }

    #[tokio::test]
    async fn test_full_flow() {
        let gateway = Arc::new(ScriptedGateway::replying("Job Title: Senior Backend Engineer..."));
        let mut workbench = workbench_with(gateway.clone()).await;
        workbench.set_company_context(CompanyField::Name, " TechCorp Inc. ");

        let stage1 = workbench
            .run_stage1("Senior backend engineer, 5 years Python")
            .await
            .unwrap();
        assert_eq!(stage1.enhanced_text, "Job Title: Senior Backend Engineer...");
        assert!(gateway.calls()[0].user_prompt.contains("- Name: TechCorp Inc."));
        assert_eq!(workbench.phase(), Phase::Step2Ready);

        let stage2 = workbench.run_stage2().await.unwrap();
        assert!(stage2.is_complete());
        assert_eq!(gateway.call_count(), 4);
        assert_eq!(workbench.phase(), Phase::Step3Ready);

        let bundle = workbench.request_export().unwrap();
        assert_eq!(bundle.enhanced_text, "Job Title: Senior Backend Engineer...");
        assert_eq!(bundle.company_context.name, "TechCorp Inc.");
        assert_eq!(gateway.call_count(), 4);
    }

    #[tokio::test]
    async fn test_stage2_before_stage1_makes_no_calls() {
        let gateway = Arc::new(ScriptedGateway::replying("unused"));
        let mut workbench = workbench_with(gateway.clone()).await;

        let err = workbench.run_stage2().await.unwrap_err();

        assert_eq!(err, WorkbenchError::validation("Step 1 required"));
        assert!(workbench.state().extraction_results.is_none());
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_stage1() {
        let gateway = Arc::new(ScriptedGateway::new(|request| {
            if request.model == CREDENTIAL_CHECK_MODEL {
                Ok("Hi".to_string())
            } else {
                Err(GatewayError::new("rate limited"))
            }
        }));
        let mut workbench = workbench_with(gateway).await;

        let err = workbench.run_stage1("x").await.unwrap_err();

        assert_eq!(err, WorkbenchError::Gateway(GatewayError::new("rate limited")));
        assert!(workbench.state().enhanced_text.is_none());
    }

    #[tokio::test]
    async fn test_export_requires_both_stages() {
        let gateway = Arc::new(ScriptedGateway::replying("text"));
        let mut workbench = workbench_with(gateway).await;

        assert_eq!(
            workbench.request_export().unwrap_err(),
            WorkbenchError::validation("Step 1 required")
        );

        workbench.run_stage1("raw").await.unwrap();
        assert_eq!(
            workbench.request_export().unwrap_err(),
            WorkbenchError::validation("Step 2 required")
        );
    }

    #[tokio::test]
    async fn test_navigation_warns_but_never_blocks() {
        let gateway = Arc::new(ScriptedGateway::replying("text"));
        let mut workbench = workbench_with(gateway).await;

        let warning = workbench.navigate(Step::Three);
        assert_eq!(warning.as_deref(), Some("Please complete Step 1 first."));
        assert_eq!(workbench.state().current_step, Step::Three);

        assert!(workbench.navigate(Step::Two).is_some());
        assert!(workbench.navigate(Step::One).is_none());

        workbench.run_stage1("raw").await.unwrap();
        assert!(workbench.navigate(Step::Two).is_none());
        assert_eq!(
            workbench.navigate(Step::Three).as_deref(),
            Some("Please complete Step 2 first.")
        );
    }

    #[tokio::test]
    async fn test_override_survives_context_changes() {
        let gateway = Arc::new(ScriptedGateway::replying("enhanced v1"));
        let mut workbench = workbench_with(gateway.clone()).await;
        workbench.run_stage1("raw").await.unwrap();

        let edited = format!(
            "{}\nExtra rule: max 8 skills",
            workbench.default_prompt(PromptStage::Skills, None)
        );
        workbench.set_prompt_override(PromptStage::Skills, edited.clone());

        workbench.set_company_context(CompanyField::Industry, "Healthcare");
        workbench.run_stage1("raw again").await.unwrap();

        assert_eq!(workbench.current_prompt(PromptStage::Skills, None).unwrap(), edited);
        assert!(!edited.contains("Healthcare"));
        assert!(workbench.default_prompt(PromptStage::Skills, None).contains("Healthcare"));

        assert!(workbench.clear_prompt_override(PromptStage::Skills));
        assert!(!workbench.clear_prompt_override(PromptStage::Skills));
        assert_ne!(workbench.current_prompt(PromptStage::Skills, None).unwrap(), edited);
    }

    #[tokio::test]
    async fn test_step3_warns_on_partial_extraction() {
        let gateway = Arc::new(ScriptedGateway::new(|request| {
            if request.system_message == crate::llm::SKILLS_SYSTEM_MESSAGE {
                Err(GatewayError::new("rate limited"))
            } else {
                Ok("output".to_string())
            }
        }));
        let mut workbench = workbench_with(gateway).await;
        workbench.run_stage1("raw").await.unwrap();
        workbench.run_stage2().await.unwrap();

        assert_eq!(workbench.phase(), Phase::Step2Ready);
        assert_eq!(
            workbench.navigate(Step::Three).as_deref(),
            Some("Step 2 incomplete: skills missing. Re-run Step 2 before exporting.")
        );
        assert!(workbench.request_export().is_err());
    }
}
