//! Concurrent fan-out of generation cells through a bounded worker pool
//!
//! Each cell reads an immutable snapshot of its role and writes to its own
//! output slot keyed by (role, kind), so tasks share no mutable state. One
//! cell failing - including a completion timeout - marks only that cell.

use crate::conversation::state::JobRole;
use crate::generation::content;
use crate::llm_utils::batch::execute_batch;
use crate::profile::CompanyProfile;
use anyhow::Result;
use hiring_assistant_sdk::{
    log_cell_complete, log_cell_failed, log_cell_start, ArtifactRef, Completion, ContentKind,
    DocumentWriter,
};
use std::sync::Arc;
use uuid::Uuid;

/// One unit of dispatched work: an immutable role snapshot plus the kind
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub role: JobRole,
    pub kind: ContentKind,
    /// 1-indexed attempt number across passes, for logging
    pub attempt: u32,
}

/// Raw per-cell result of one pass
#[derive(Debug, Clone)]
pub struct CellResult {
    pub role_id: Uuid,
    pub kind: ContentKind,
    pub result: Result<ArtifactRef, String>,
}

/// Dispatch all cells concurrently, bounded by `width`
///
/// Returns exactly one result per job, in completion order. Never fails
/// fast: per-cell errors are carried in the result.
pub async fn run_cells(
    session_id: Uuid,
    jobs: Vec<GenerationJob>,
    profile: &CompanyProfile,
    completion: Arc<dyn Completion>,
    writer: Arc<dyn DocumentWriter>,
    width: usize,
) -> Result<Vec<CellResult>> {
    let profile = Arc::new(profile.clone());

    execute_batch(jobs, width, move |job, _ctx| {
        let completion = completion.clone();
        let writer = writer.clone();
        let profile = profile.clone();

        async move {
            let role_id = job.role.id;
            let kind = job.kind;
            log_cell_start!(&job.role.title, kind.as_str(), job.attempt);

            let rendered =
                match content::render(kind, &job.role, &profile, completion.as_ref()).await {
                    Ok(text) => text,
                    Err(err) => {
                        log_cell_failed!(&job.role.title, kind.as_str(), err);
                        return CellResult {
                            role_id,
                            kind,
                            result: Err(format!("render failed: {}", err)),
                        };
                    }
                };

            match writer
                .write(session_id, &job.role.title, kind, &rendered)
                .await
            {
                Ok(artifact) => {
                    log_cell_complete!(&job.role.title, kind.as_str(), &artifact.location);
                    CellResult {
                        role_id,
                        kind,
                        result: Ok(artifact),
                    }
                }
                Err(err) => {
                    log_cell_failed!(&job.role.title, kind.as_str(), err);
                    CellResult {
                        role_id,
                        kind,
                        result: Err(format!("write failed: {}", err)),
                    }
                }
            }
        }
    })
    .await
}
