//! Parallel document generation for completed roles
//!
//! Every (role, content kind) pair is one independent cell of work. Cells are
//! dispatched concurrently through a bounded pool; a failed cell never blocks
//! its siblings and is retried on later passes until its attempt budget runs
//! out.

pub mod content;
pub mod coordinator;

use hiring_assistant_sdk::{ArtifactRef, ContentKind};
use uuid::Uuid;

/// Total attempts a cell gets across generation passes before it is marked
/// permanently failed
pub const MAX_CELL_ATTEMPTS: u32 = 3;

/// Per-cell outcome in a generation report
#[derive(Debug, Clone)]
pub enum CellOutcome {
    Success { artifact: ArtifactRef },
    Failed { error: String, permanent: bool },
}

/// One cell of the generation report
#[derive(Debug, Clone)]
pub struct CellReport {
    pub role_id: Uuid,
    pub role_title: String,
    pub kind: ContentKind,
    pub outcome: CellOutcome,
}

/// Full result of a generation pass: exactly one entry per cell of every
/// eligible role - explicit success or failure, never silent omission
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub cells: Vec<CellReport>,
    /// Cells that failed this pass but still have attempts left
    pub pending_retry: usize,
}

impl GenerationReport {
    pub fn succeeded(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c.outcome, CellOutcome::Success { .. }))
            .count()
    }

    pub fn failed_permanently(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c.outcome, CellOutcome::Failed { permanent: true, .. }))
            .count()
    }
}
