pub mod stage1_enhance;
pub mod stage2_extract;
pub mod stage3_export;
pub mod workbench;

pub use stage1_enhance::*;
pub use stage2_extract::*;
pub use stage3_export::*;
pub use workbench::*;

use crate::error::{WorkbenchError, WorkbenchResult};
use crate::models::SessionState;

pub const MISSING_CREDENTIAL: &str =
    "Please enter your OpenAI API key to continue (--api-key, OPENAI_API_KEY or the `key` command).";

/// Credential of the session, or a credential error if none is set
pub(crate) fn require_credential(state: &SessionState) -> WorkbenchResult<&str> {
    state
        .credential
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| WorkbenchError::Credential(MISSING_CREDENTIAL.to_string()))
}
