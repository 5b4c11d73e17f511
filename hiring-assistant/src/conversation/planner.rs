//! Question planner: next clarifying questions for an incomplete role
//!
//! Contextual phrasing comes from the completion interface; any failure
//! falls back to deterministic templated questions so an incomplete role
//! always gets at least one question.

use crate::conversation::completeness::{evaluate, MissingField};
use crate::conversation::state::JobRole;
use crate::llm_utils::json;
use crate::profile::CompanyProfile;
use crate::prompts;
use hiring_assistant_sdk::{Completion, ResponseFormat};
use std::sync::Arc;

/// Upper bound on questions per turn
pub const MAX_QUESTIONS: usize = 5;

pub struct QuestionPlanner {
    completion: Arc<dyn Completion>,
}

impl QuestionPlanner {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self { completion }
    }

    /// Plan 1-5 questions for a role, one per missing field, most blocking
    /// first. Returns an empty list only for a role that is already complete.
    pub async fn plan(&self, role: &JobRole, profile: &CompanyProfile) -> Vec<String> {
        let evaluation = evaluate(role);
        if evaluation.missing_fields.is_empty() {
            return Vec::new();
        }

        let missing: Vec<MissingField> = evaluation
            .missing_fields
            .into_iter()
            .take(MAX_QUESTIONS)
            .collect();

        let mut questions = self
            .contextual(role, &missing, profile)
            .await
            .unwrap_or_default();
        questions.truncate(missing.len());

        // Top up from templates so every missing field gets its question
        while questions.len() < missing.len() {
            questions.push(template_question(missing[questions.len()], &role.title));
        }

        questions
    }

    async fn contextual(
        &self,
        role: &JobRole,
        missing: &[MissingField],
        profile: &CompanyProfile,
    ) -> Option<Vec<String>> {
        let prompt = prompts::question_planning(role, missing, profile);
        let raw = self
            .completion
            .complete(&prompt, ResponseFormat::Json)
            .await
            .ok()?;

        let cleaned = json::extract_json(&raw);
        let parsed: Vec<String> = json::parse_json(&cleaned).ok()?;

        let questions: Vec<String> = parsed
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        (!questions.is_empty()).then_some(questions)
    }
}

/// Deterministic templated question for one missing field
pub(crate) fn template_question(field: MissingField, title: &str) -> String {
    let title = if title.trim().is_empty() {
        "this".to_string()
    } else {
        title.trim().to_string()
    };
    match field {
        MissingField::BudgetRange => {
            format!("What is the budget range for the {} role?", title)
        }
        MissingField::Timeline => {
            format!("How quickly do you need to fill the {} role?", title)
        }
        MissingField::RequiredSkills => {
            format!("What are the must-have skills for the {} role?", title)
        }
        MissingField::Title => "What is the job title for this position?".to_string(),
    }
}
