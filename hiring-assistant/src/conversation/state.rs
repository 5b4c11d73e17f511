//! Data structures for the hiring conversation

use chrono::{DateTime, Local};
use hiring_assistant_sdk::{ArtifactRef, ContentKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a single job role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    Incomplete,
    Complete,
    Generating,
    Done,
}

/// Salary budget for a role, both bounds required
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRange {
    pub min: u64,
    pub max: u64,
    pub currency: String,
}

impl BudgetRange {
    pub fn new(min: u64, max: u64, currency: impl Into<String>) -> Self {
        Self {
            min,
            max,
            currency: currency.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

impl std::fmt::Display for BudgetRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.min == self.max {
            write!(f, "{} {}", self.min, self.currency)
        } else {
            write!(f, "{}-{} {}", self.min, self.max, self.currency)
        }
    }
}

/// One open position under discussion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRole {
    /// Stable identifier, assigned at first extraction, never reused
    pub id: Uuid,
    pub title: String,
    pub seniority: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<String>,
    /// Union-accumulated across turns; an explicit correction replaces it
    pub required_skills: Vec<String>,
    pub budget_range: Option<BudgetRange>,
    pub timeline: Option<String>,
    pub status: RoleStatus,
}

impl JobRole {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            seniority: None,
            department: None,
            employment_type: None,
            required_skills: Vec::new(),
            budget_range: None,
            timeline: None,
            status: RoleStatus::Incomplete,
        }
    }

    /// Add a skill, deduplicated case-insensitively, order preserved
    pub fn add_skill(&mut self, skill: &str) {
        let skill = skill.trim();
        if skill.is_empty() {
            return;
        }
        let exists = self
            .required_skills
            .iter()
            .any(|s| s.eq_ignore_ascii_case(skill));
        if !exists {
            self.required_skills.push(skill.to_string());
        }
    }
}

/// Conversation phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initial,
    ClarifyingRoles,
    RoleFocus,
    AwaitingUser,
    GeneratingContent,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initial => "initial",
            Phase::ClarifyingRoles => "clarifying_roles",
            Phase::RoleFocus => "role_focus",
            Phase::AwaitingUser => "awaiting_user",
            Phase::GeneratingContent => "generating_content",
            Phase::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry of the append-only message history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

/// Terminal outcome of one generation cell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CellResolution {
    Succeeded { artifact: ArtifactRef },
    FailedPermanently { error: String },
}

/// Bookkeeping for one (role, content kind) generation cell
///
/// `outcome == None` means the cell is still pending or retryable; attempts
/// count across generation passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRecord {
    pub role_id: Uuid,
    pub kind: ContentKind,
    pub attempts: u32,
    pub outcome: Option<CellResolution>,
    /// Most recent failure, kept for reporting while the cell is retryable
    pub last_error: Option<String>,
}

/// Full state of one hiring conversation
///
/// Mutated exclusively by the conversation engine, one turn at a time.
/// State is partitioned by `session_id` end to end; two sessions never share
/// an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: Uuid,
    pub original_request: String,
    /// Discovery order; insertion order drives "next role" selection
    pub roles: Vec<JobRole>,
    pub active_role_id: Option<Uuid>,
    pub phase: Phase,
    pub messages: Vec<MessageEntry>,
    /// Questions awaiting answers for the active role
    pub pending_questions: Vec<String>,
    /// Generation bookkeeping, one record per dispatched cell
    pub cells: Vec<CellRecord>,
}

impl ConversationState {
    pub fn new(original_request: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            original_request: original_request.into(),
            roles: Vec::new(),
            active_role_id: None,
            phase: Phase::Initial,
            messages: Vec::new(),
            pending_questions: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn role(&self, id: Uuid) -> Option<&JobRole> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn role_mut(&mut self, id: Uuid) -> Option<&mut JobRole> {
        self.roles.iter_mut().find(|r| r.id == id)
    }

    pub fn active_role(&self) -> Option<&JobRole> {
        self.active_role_id.and_then(|id| self.role(id))
    }

    /// Next role still gathering information, in strict insertion order
    pub fn next_incomplete_role(&self) -> Option<Uuid> {
        self.roles
            .iter()
            .find(|r| r.status == RoleStatus::Incomplete)
            .map(|r| r.id)
    }

    pub fn push_message(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.messages.push(MessageEntry {
            speaker,
            text: text.into(),
            timestamp: Local::now(),
        });
    }

    /// Find or create the bookkeeping record for a cell
    pub fn cell_mut(&mut self, role_id: Uuid, kind: ContentKind) -> &mut CellRecord {
        let pos = self
            .cells
            .iter()
            .position(|c| c.role_id == role_id && c.kind == kind);
        match pos {
            Some(idx) => &mut self.cells[idx],
            None => {
                self.cells.push(CellRecord {
                    role_id,
                    kind,
                    attempts: 0,
                    outcome: None,
                    last_error: None,
                });
                self.cells.last_mut().unwrap()
            }
        }
    }

    pub fn cell(&self, role_id: Uuid, kind: ContentKind) -> Option<&CellRecord> {
        self.cells
            .iter()
            .find(|c| c.role_id == role_id && c.kind == kind)
    }
}
