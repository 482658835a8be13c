pub mod console;
pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod stages;

pub use console::{Command, Console};
pub use error::{GatewayError, WorkbenchError, WorkbenchResult};
pub use io::{read_job_description, write_export};
pub use llm::{
    GatewayConfig, ModelGateway, ModelRequest, ModelSettings, OpenAiGateway, build_prompt,
    render_default_prompt,
};
pub use models::{
    CompanyContext, CompanyField, ExportBundle, ExtractionResults, PromptStage, SessionState, Step,
};
pub use stages::{
    Phase, Stage1Result, Stage2Result, Workbench, execute_stage1, execute_stage2, execute_stage3,
};
