//! Completeness evaluation for job roles
//!
//! Pure, side-effect-free check deciding whether a role carries enough
//! structured information for document generation. Missing fields are always
//! recomputed, never cached.

use crate::conversation::state::{JobRole, RoleStatus};

/// A required field absent from a role
///
/// Variant order is the ask-priority: the most blocking field first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MissingField {
    BudgetRange,
    Timeline,
    RequiredSkills,
    Title,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingField::BudgetRange => "budget_range",
            MissingField::Timeline => "timeline",
            MissingField::RequiredSkills => "required_skills",
            MissingField::Title => "title",
        }
    }
}

/// Result of evaluating one role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub status: RoleStatus,
    /// Sorted most-blocking first; empty iff `status == Complete`
    pub missing_fields: Vec<MissingField>,
}

/// Evaluate whether a role is ready for content generation
///
/// Complete iff: non-empty title, budget range with both bounds and
/// min <= max, non-empty timeline, and at least one required skill.
pub fn evaluate(role: &JobRole) -> Evaluation {
    let mut missing = Vec::new();

    match &role.budget_range {
        Some(budget) if budget.is_valid() => {}
        _ => missing.push(MissingField::BudgetRange),
    }

    if role
        .timeline
        .as_deref()
        .map_or(true, |t| t.trim().is_empty())
    {
        missing.push(MissingField::Timeline);
    }

    if role.required_skills.is_empty() {
        missing.push(MissingField::RequiredSkills);
    }

    if role.title.trim().is_empty() {
        missing.push(MissingField::Title);
    }

    missing.sort();

    let status = if missing.is_empty() {
        RoleStatus::Complete
    } else {
        RoleStatus::Incomplete
    };

    Evaluation {
        status,
        missing_fields: missing,
    }
}
