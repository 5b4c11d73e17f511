// Re-export async trait for convenience
pub use async_trait::async_trait;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The five document categories generated per job role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    JobDescription,
    HiringChecklist,
    HiringTimeline,
    SalaryRecommendation,
    InterviewQuestions,
}

impl ContentKind {
    /// All content kinds, in generation order
    pub const ALL: [ContentKind; 5] = [
        ContentKind::JobDescription,
        ContentKind::HiringChecklist,
        ContentKind::HiringTimeline,
        ContentKind::SalaryRecommendation,
        ContentKind::InterviewQuestions,
    ];

    /// Stable snake_case identifier (used in filenames and log events)
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::JobDescription => "job_description",
            ContentKind::HiringChecklist => "hiring_checklist",
            ContentKind::HiringTimeline => "hiring_timeline",
            ContentKind::SalaryRecommendation => "salary_recommendation",
            ContentKind::InterviewQuestions => "interview_questions",
        }
    }

    /// Human-readable label for console output
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::JobDescription => "Job Description",
            ContentKind::HiringChecklist => "Hiring Checklist",
            ContentKind::HiringTimeline => "Hiring Timeline",
            ContentKind::SalaryRecommendation => "Salary Recommendation",
            ContentKind::InterviewQuestions => "Interview Questions",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hint for the shape of completion output the caller expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form markdown/plain text
    Text,
    /// Machine-parseable JSON
    Json,
}

/// Failure modes of the completion interface
///
/// Malformed-but-delivered output is NOT an error at this boundary; callers
/// are expected to parse defensively. These variants cover the cases where no
/// usable response arrived at all.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("completion request timed out")]
    Timeout,
    #[error("completion provider rate limited the request")]
    RateLimited,
    #[error("network error: {0}")]
    Network(String),
    #[error("provider error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Failure modes of the document-writer interface
#[derive(Debug, Clone, Error)]
pub enum DocumentWriteError {
    #[error("failed to persist artifact: {0}")]
    Io(String),
    #[error("artifact rejected: {0}")]
    Rejected(String),
}

/// Reference to a persisted artifact (path, URL, object key...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub location: String,
}

impl ArtifactRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Language-model completion interface
///
/// The single capability the conversation core requires from an AI provider:
/// prompt in, text out. Implementations own their transport, authentication
/// and per-call timeout; a timeout surfaces as [`CompletionError::Timeout`]
/// and is treated by callers like any other failure.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<String, CompletionError>;
}

/// Document-writer interface
///
/// Persists one rendered document for one (role, content kind) cell and
/// returns a reference to the stored artifact. Failures are per-call and
/// must never affect sibling cells.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    async fn write(
        &self,
        session_id: Uuid,
        role_title: &str,
        kind: ContentKind,
        rendered: &str,
    ) -> Result<ArtifactRef, DocumentWriteError>;
}

/// Structured logging events emitted by the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantLog {
    /// A user turn started processing
    TurnStarted { session_id: String, phase: String },
    /// A user turn finished; the conversation moved to `phase`
    TurnCompleted { session_id: String, phase: String },
    /// Structured extraction could not be parsed; deterministic fallback used
    ExtractionFallback { session_id: String },
    /// Clarifying questions were planned for a role
    QuestionsPlanned {
        session_id: String,
        role_title: String,
        count: usize,
    },
    /// A generation pass started
    GenerationStarted { session_id: String, cells: usize },
    /// One generation cell started
    CellStarted {
        role_title: String,
        kind: String,
        attempt: u32,
    },
    /// One generation cell produced an artifact
    CellCompleted {
        role_title: String,
        kind: String,
        location: String,
    },
    /// One generation cell failed (may be retried in a later pass)
    CellFailed {
        role_title: String,
        kind: String,
        error: String,
    },
    /// A generation pass finished
    GenerationCompleted {
        session_id: String,
        succeeded: usize,
        failed: usize,
    },
}

impl AssistantLog {
    /// Emit this log event to stderr for host tooling to parse
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("__HA_EVENT__:{}", json);
            // Force flush stderr in async/concurrent contexts
            let _ = std::io::stderr().flush();
        }
    }
}

/// Helper macros for assistant logging
#[macro_export]
macro_rules! log_turn_start {
    ($session:expr, $phase:expr) => {
        $crate::AssistantLog::TurnStarted {
            session_id: $session.to_string(),
            phase: $phase.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_turn_complete {
    ($session:expr, $phase:expr) => {
        $crate::AssistantLog::TurnCompleted {
            session_id: $session.to_string(),
            phase: $phase.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_extraction_fallback {
    ($session:expr) => {
        $crate::AssistantLog::ExtractionFallback {
            session_id: $session.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_questions_planned {
    ($session:expr, $role:expr, $count:expr) => {
        $crate::AssistantLog::QuestionsPlanned {
            session_id: $session.to_string(),
            role_title: $role.to_string(),
            count: $count,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_generation_start {
    ($session:expr, $cells:expr) => {
        $crate::AssistantLog::GenerationStarted {
            session_id: $session.to_string(),
            cells: $cells,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_cell_start {
    ($role:expr, $kind:expr, $attempt:expr) => {
        $crate::AssistantLog::CellStarted {
            role_title: $role.to_string(),
            kind: $kind.to_string(),
            attempt: $attempt,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_cell_complete {
    ($role:expr, $kind:expr, $location:expr) => {
        $crate::AssistantLog::CellCompleted {
            role_title: $role.to_string(),
            kind: $kind.to_string(),
            location: $location.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_cell_failed {
    ($role:expr, $kind:expr, $error:expr) => {
        $crate::AssistantLog::CellFailed {
            role_title: $role.to_string(),
            kind: $kind.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_generation_complete {
    ($session:expr, $succeeded:expr, $failed:expr) => {
        $crate::AssistantLog::GenerationCompleted {
            session_id: $session.to_string(),
            succeeded: $succeeded,
            failed: $failed,
        }
        .emit();
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_all_is_exhaustive() {
        assert_eq!(ContentKind::ALL.len(), 5);
        // Every kind maps to a unique identifier
        let mut ids: Vec<&str> = ContentKind::ALL.iter().map(|k| k.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_content_kind_serde_roundtrip() {
        for kind in ContentKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            let back: ContentKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, back);
        }
        assert_eq!(
            serde_json::to_string(&ContentKind::JobDescription).unwrap(),
            "\"job_description\""
        );
    }

    #[test]
    fn test_completion_error_display() {
        let err = CompletionError::Api {
            status: 500,
            message: "upstream".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(CompletionError::Timeout.to_string().contains("timed out"));
    }

    #[test]
    fn test_assistant_log_serializes_with_type_tag() {
        let log = AssistantLog::CellFailed {
            role_title: "Founding Engineer".to_string(),
            kind: "job_description".to_string(),
            error: "boom".to_string(),
        };
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"type\":\"cell_failed\""));
    }
}
