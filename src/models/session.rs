use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operator-supplied company metadata used only to bias prompts.
///
/// An empty string means the field was not specified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyContext {
    pub name: String,
    pub industry: String,
    pub company_size: String,
    pub headquarters: String,
}

impl CompanyContext {
    pub fn get(&self, field: CompanyField) -> &str {
        match field {
            CompanyField::Name => &self.name,
            CompanyField::Industry => &self.industry,
            CompanyField::CompanySize => &self.company_size,
            CompanyField::Headquarters => &self.headquarters,
        }
    }

    pub fn set(&mut self, field: CompanyField, value: impl Into<String>) {
        let slot = match field {
            CompanyField::Name => &mut self.name,
            CompanyField::Industry => &mut self.industry,
            CompanyField::CompanySize => &mut self.company_size,
            CompanyField::Headquarters => &mut self.headquarters,
        };
        *slot = value.into();
    }
}

/// One of the four company context fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompanyField {
    Name,
    Industry,
    CompanySize,
    Headquarters,
}

impl CompanyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyField::Name => "name",
            CompanyField::Industry => "industry",
            CompanyField::CompanySize => "size",
            CompanyField::Headquarters => "headquarters",
        }
    }
}

impl FromStr for CompanyField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(CompanyField::Name),
            "industry" => Ok(CompanyField::Industry),
            "size" | "company_size" | "company-size" => Ok(CompanyField::CompanySize),
            "headquarters" | "hq" | "location" => Ok(CompanyField::Headquarters),
            other => Err(format!(
                "unknown company field '{}' (expected name, industry, size or headquarters)",
                other
            )),
        }
    }
}

/// User-facing step of the workbench
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    /// Text enhancement
    #[default]
    One,
    /// Structured extraction
    Two,
    /// Results comparison and export
    Three,
}

impl Step {
    pub fn number(&self) -> u8 {
        match self {
            Step::One => 1,
            Step::Two => 2,
            Step::Three => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::One => "Text Enhancement",
            Step::Two => "Structured Extraction",
            Step::Three => "Results Comparison",
        }
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Step::One),
            2 => Ok(Step::Two),
            3 => Ok(Step::Three),
            other => Err(format!("step must be 1, 2 or 3 (got {})", other)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}: {}", self.number(), self.title())
    }
}

/// Identifies one of the four generated prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PromptStage {
    Enhance,
    BaseInfo,
    Skills,
    Responsibilities,
}

impl PromptStage {
    pub const ALL: [PromptStage; 4] = [
        PromptStage::Enhance,
        PromptStage::BaseInfo,
        PromptStage::Skills,
        PromptStage::Responsibilities,
    ];

    /// The three prompts issued by structured extraction
    pub const EXTRACTION: [PromptStage; 3] = [
        PromptStage::BaseInfo,
        PromptStage::Skills,
        PromptStage::Responsibilities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStage::Enhance => "enhance",
            PromptStage::BaseInfo => "base-info",
            PromptStage::Skills => "skills",
            PromptStage::Responsibilities => "responsibilities",
        }
    }

    /// Whether the prompt embeds the enhanced text from step 1
    pub fn needs_enhanced_text(&self) -> bool {
        !matches!(self, PromptStage::Enhance)
    }
}

impl fmt::Display for PromptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "enhance" | "enhancement" => Ok(PromptStage::Enhance),
            "base-info" | "baseinfo" | "base" => Ok(PromptStage::BaseInfo),
            "skills" => Ok(PromptStage::Skills),
            "responsibilities" | "resp" => Ok(PromptStage::Responsibilities),
            other => Err(format!(
                "unknown prompt stage '{}' (expected enhance, base-info, skills or responsibilities)",
                other
            )),
        }
    }
}

/// Raw model output of structured extraction.
///
/// Each field holds the model text verbatim. A field is `None` when its call
/// failed on the last extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResults {
    pub base_info: Option<String>,
    pub skills: Option<String>,
    pub responsibilities: Option<String>,
}

impl ExtractionResults {
    pub fn get(&self, stage: PromptStage) -> Option<&str> {
        match stage {
            PromptStage::BaseInfo => self.base_info.as_deref(),
            PromptStage::Skills => self.skills.as_deref(),
            PromptStage::Responsibilities => self.responsibilities.as_deref(),
            PromptStage::Enhance => None,
        }
    }

    pub fn set(&mut self, stage: PromptStage, text: Option<String>) {
        match stage {
            PromptStage::BaseInfo => self.base_info = text,
            PromptStage::Skills => self.skills = text,
            PromptStage::Responsibilities => self.responsibilities = text,
            PromptStage::Enhance => {}
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.missing().len() == PromptStage::EXTRACTION.len()
    }

    /// Extraction prompts whose output is absent
    pub fn missing(&self) -> Vec<PromptStage> {
        PromptStage::EXTRACTION
            .into_iter()
            .filter(|stage| self.get(*stage).is_none())
            .collect()
    }
}

/// Mutable state of one interactive session.
///
/// Fields are only written through [`crate::stages::Workbench`]; the whole
/// structure is dropped when the session ends.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: Uuid,
    pub credential: Option<String>,
    pub company_context: CompanyContext,
    pub current_step: Step,
    pub enhanced_text: Option<String>,
    pub extraction_results: Option<ExtractionResults>,
    pub prompt_overrides: HashMap<PromptStage, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            credential: None,
            company_context: CompanyContext::default(),
            current_step: Step::One,
            enhanced_text: None,
            extraction_results: None,
            prompt_overrides: HashMap::new(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn prompt_override(&self, stage: PromptStage) -> Option<&str> {
        self.prompt_overrides.get(&stage).map(String::as_str)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let state = SessionState::new();
        assert_eq!(state.current_step, Step::One);
        assert!(state.enhanced_text.is_none());
        assert!(state.extraction_results.is_none());
        assert!(state.prompt_overrides.is_empty());
        assert!(!state.has_credential());
        assert_eq!(state.company_context, CompanyContext::default());
    }

    #[test]
    fn test_company_field_parsing() {
        assert_eq!("size".parse::<CompanyField>().unwrap(), CompanyField::CompanySize);
        assert_eq!("HQ".parse::<CompanyField>().unwrap(), CompanyField::Headquarters);
        assert!("revenue".parse::<CompanyField>().is_err());

        let mut ctx = CompanyContext::default();
        ctx.set(CompanyField::Industry, "Fintech");
        assert_eq!(ctx.get(CompanyField::Industry), "Fintech");
        assert_eq!(ctx.industry, "Fintech");
    }

    #[test]
    fn test_prompt_stage_names_round_trip() {
        for stage in PromptStage::ALL {
            assert_eq!(stage.as_str().parse::<PromptStage>().unwrap(), stage);
        }
        assert_eq!("base_info".parse::<PromptStage>().unwrap(), PromptStage::BaseInfo);
    }

    #[test]
    fn test_step_from_number() {
        assert_eq!(Step::try_from(2).unwrap(), Step::Two);
        assert!(Step::try_from(0).is_err());
        assert!(Step::try_from(4).is_err());
        assert_eq!(Step::Three.to_string(), "Step 3: Results Comparison");
    }

    #[test]
    fn test_extraction_results_missing_fields() {
        let mut results = ExtractionResults::default();
        assert!(results.is_empty());
        assert!(!results.is_complete());

        results.set(PromptStage::Skills, Some("[]".to_string()));
        assert_eq!(
            results.missing(),
            vec![PromptStage::BaseInfo, PromptStage::Responsibilities]
        );

        results.set(PromptStage::BaseInfo, Some("{}".to_string()));
        results.set(PromptStage::Responsibilities, Some("[]".to_string()));
        assert!(results.is_complete());
    }
}
