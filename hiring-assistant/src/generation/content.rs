//! Rendering of one document through the completion interface

use crate::conversation::state::JobRole;
use crate::profile::CompanyProfile;
use crate::prompts;
use hiring_assistant_sdk::{Completion, CompletionError, ContentKind, ResponseFormat};

/// Render one (role, kind) document as markdown
///
/// A failure here is a cell failure; the caller records it and moves on.
pub async fn render(
    kind: ContentKind,
    role: &JobRole,
    profile: &CompanyProfile,
    completion: &dyn Completion,
) -> Result<String, CompletionError> {
    let prompt = prompts::content(kind, role, profile);
    completion.complete(&prompt, ResponseFormat::Text).await
}
