//! Document writer persisting markdown artifacts to disk

use hiring_assistant_sdk::{
    async_trait, ArtifactRef, ContentKind, DocumentWriteError, DocumentWriter,
};
use std::path::PathBuf;
use uuid::Uuid;

/// Writes one markdown file per generation cell under
/// `<output_dir>/<session_id>/<kind>_<role_slug>.md`
pub struct MarkdownWriter {
    output_dir: PathBuf,
}

impl MarkdownWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl DocumentWriter for MarkdownWriter {
    async fn write(
        &self,
        session_id: Uuid,
        role_title: &str,
        kind: ContentKind,
        rendered: &str,
    ) -> Result<ArtifactRef, DocumentWriteError> {
        let dir = self.output_dir.join(session_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| DocumentWriteError::Io(err.to_string()))?;

        let path = dir.join(format!("{}_{}.md", kind.as_str(), slug(role_title)));
        tokio::fs::write(&path, rendered)
            .await
            .map_err(|err| DocumentWriteError::Io(err.to_string()))?;

        Ok(ArtifactRef::new(path.display().to_string()))
    }
}

/// Filesystem-safe slug from a role title
pub(crate) fn slug(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect();
    let slug = cleaned
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    if slug.is_empty() {
        "role".to_string()
    } else {
        slug
    }
}
