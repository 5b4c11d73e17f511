//! Conversation state machine
//!
//! Owns the turn-by-turn flow: extraction, completeness evaluation, question
//! planning, and the hand-off to parallel document generation. One user
//! message is processed to completion before the next is accepted; all state
//! lives in the per-session [`ConversationState`].

use crate::conversation::completeness::evaluate;
use crate::conversation::extraction::{
    apply_patch, normalize, Confidence, ExtractionEngine, RoleUpdate, MAX_ROLES_PER_TURN,
};
use crate::conversation::planner::QuestionPlanner;
use crate::conversation::state::{
    CellResolution, ConversationState, JobRole, Phase, RoleStatus, Speaker,
};
use crate::generation::coordinator::{run_cells, GenerationJob};
use crate::generation::{CellOutcome, CellReport, GenerationReport, MAX_CELL_ATTEMPTS};
use crate::profile::CompanyProfile;
use anyhow::Result;
use hiring_assistant_sdk::{
    log_extraction_fallback, log_generation_complete, log_generation_start,
    log_questions_planned, log_turn_complete, log_turn_start, Completion, ContentKind,
    DocumentWriter,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

const SERVICE_RETRY_MESSAGE: &str =
    "I couldn't reach the language model just now. Nothing was lost - please send that again.";

/// What a turn hands back to the caller
#[derive(Debug, Clone, Default)]
pub struct TurnOutput {
    /// Outbound assistant messages (questions or status), in order
    pub messages: Vec<String>,
    /// Company facts surfaced this turn, to be applied via the profile store
    pub profile_updates: BTreeMap<String, String>,
}

impl TurnOutput {
    fn notice(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
            profile_updates: BTreeMap::new(),
        }
    }
}

/// Drives one conversation from free-text request to generated documents
pub struct ConversationEngine {
    completion: Arc<dyn Completion>,
    extraction: ExtractionEngine,
    planner: QuestionPlanner,
}

impl ConversationEngine {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self {
            extraction: ExtractionEngine::new(completion.clone()),
            planner: QuestionPlanner::new(completion.clone()),
            completion,
        }
    }

    /// Open a new conversation from the initial hiring request
    pub async fn start(
        &self,
        request: &str,
        profile: &CompanyProfile,
    ) -> (ConversationState, TurnOutput) {
        let mut state = ConversationState::new(request);
        let output = self.submit_user_text(&mut state, request, profile).await;
        (state, output)
    }

    /// Process one user message and advance the conversation
    ///
    /// On a completion-service outage the state is left untouched so the
    /// same turn can simply be retried.
    pub async fn submit_user_text(
        &self,
        state: &mut ConversationState,
        text: &str,
        profile: &CompanyProfile,
    ) -> TurnOutput {
        log_turn_start!(state.session_id, state.phase.as_str());

        let output = match state.phase {
            Phase::Initial | Phase::ClarifyingRoles => self.intake_turn(state, text, profile).await,
            Phase::RoleFocus | Phase::AwaitingUser => self.answer_turn(state, text, profile).await,
            Phase::GeneratingContent => TurnOutput::notice(
                "I'm generating your hiring documents now - I'll take new details once they're done.",
            ),
            Phase::Complete => TurnOutput::notice(
                "This hiring plan is complete and its documents are written. Start a new conversation for the next one.",
            ),
        };

        log_turn_complete!(state.session_id, state.phase.as_str());
        output
    }

    /// First contact (or renewed attempt after a role-less request)
    async fn intake_turn(
        &self,
        state: &mut ConversationState,
        text: &str,
        profile: &CompanyProfile,
    ) -> TurnOutput {
        let extraction = match self.extraction.extract(text, &[], profile, &[], None).await {
            Ok(extraction) => extraction,
            Err(_) => return TurnOutput::notice(SERVICE_RETRY_MESSAGE),
        };
        let gentle = extraction.confidence == Confidence::Fallback;
        if gentle {
            log_extraction_fallback!(state.session_id);
        }

        state.push_message(Speaker::User, text);

        let mut messages = Vec::new();
        self.apply_updates(state, &extraction.updates);
        if extraction.truncated {
            messages.push(format!(
                "That's a lot of positions - I'll focus on the first {} for now.",
                MAX_ROLES_PER_TURN
            ));
        }

        if state.roles.is_empty() {
            state.phase = Phase::ClarifyingRoles;
            messages.push(
                "I couldn't spot a specific role in that. What position would you like to hire for?"
                    .to_string(),
            );
        } else {
            let titles: Vec<&str> = state.roles.iter().map(|r| r.title.as_str()).collect();
            messages.push(format!(
                "I found {} role(s) to help you with: {}",
                state.roles.len(),
                titles.join(", ")
            ));
            state.active_role_id = state.next_incomplete_role();
            let follow_up = self.role_focus(state, profile, gentle).await;
            messages.extend(follow_up);
        }

        for message in &messages {
            state.push_message(Speaker::Assistant, message);
        }

        TurnOutput {
            messages,
            profile_updates: extraction.profile_updates,
        }
    }

    /// Answer to pending questions for the active role
    async fn answer_turn(
        &self,
        state: &mut ConversationState,
        text: &str,
        profile: &CompanyProfile,
    ) -> TurnOutput {
        let active = state.active_role().cloned();
        let extraction = match self
            .extraction
            .extract(
                text,
                &state.roles,
                profile,
                &state.pending_questions,
                active.as_ref(),
            )
            .await
        {
            Ok(extraction) => extraction,
            Err(_) => return TurnOutput::notice(SERVICE_RETRY_MESSAGE),
        };
        let gentle = extraction.confidence == Confidence::Fallback;
        if gentle {
            log_extraction_fallback!(state.session_id);
        }

        state.push_message(Speaker::User, text);
        state.pending_questions.clear();

        let mut messages = Vec::new();
        let appended = self.apply_updates(state, &extraction.updates);
        if extraction.truncated {
            messages.push(format!(
                "That's a lot of positions - I'll track the first {} new ones for now.",
                MAX_ROLES_PER_TURN
            ));
        }
        if appended > 0 {
            messages.push(format!(
                "Noted - I've added {} more role(s) to the plan; we'll get to them in turn.",
                appended
            ));
        }

        let follow_up = self.role_focus(state, profile, gentle).await;
        messages.extend(follow_up);

        for message in &messages {
            state.push_message(Speaker::Assistant, message);
        }

        TurnOutput {
            messages,
            profile_updates: extraction.profile_updates,
        }
    }

    /// Apply extracted updates to the role list
    ///
    /// Patches land on their target role; new roles are appended in
    /// discovery order without disturbing the active pointer. Returns how
    /// many roles were appended.
    fn apply_updates(&self, state: &mut ConversationState, updates: &[RoleUpdate]) -> usize {
        let mut appended = 0;

        for update in updates {
            match update {
                RoleUpdate::Patch { role_id, patch } => {
                    if let Some(role) = state.role_mut(*role_id) {
                        apply_patch(role, patch);
                    }
                }
                RoleUpdate::New(patch) => {
                    let title = patch
                        .title
                        .as_deref()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .unwrap_or("New Role")
                        .to_string();

                    // Same-turn duplicate: patch the earlier copy instead
                    let duplicate = state
                        .roles
                        .iter()
                        .position(|r| normalize(&r.title) == normalize(&title));
                    if let Some(idx) = duplicate {
                        apply_patch(&mut state.roles[idx], patch);
                        continue;
                    }

                    let mut role = JobRole::new(title);
                    if apply_patch(&mut role, patch) {
                        state.roles.push(role);
                        appended += 1;
                    }
                }
            }
        }

        appended
    }

    /// Evaluate the active role and decide the next move
    ///
    /// Advances past completed roles in strict insertion order; when none
    /// remain incomplete the conversation moves to content generation,
    /// otherwise questions are planned and the turn ends awaiting the user.
    async fn role_focus(
        &self,
        state: &mut ConversationState,
        profile: &CompanyProfile,
        gentle: bool,
    ) -> Vec<String> {
        state.phase = Phase::RoleFocus;
        let mut messages = Vec::new();

        loop {
            let Some(active_id) = state
                .active_role_id
                .or_else(|| state.next_incomplete_role())
            else {
                // No roles left to work on
                state.active_role_id = None;
                state.phase = Phase::GeneratingContent;
                messages.push(generation_ready_message(state.roles.len()));
                break;
            };

            let Some(role) = state.role(active_id).cloned() else {
                state.active_role_id = None;
                continue;
            };

            let evaluation = evaluate(&role);
            if evaluation.status == RoleStatus::Complete {
                if let Some(role) = state.role_mut(active_id) {
                    role.status = RoleStatus::Complete;
                }
                messages.push(format!(
                    "Great - I have everything I need for the {} role.",
                    role.title
                ));

                match state.next_incomplete_role() {
                    Some(next) => {
                        state.active_role_id = Some(next);
                        continue;
                    }
                    None => {
                        state.active_role_id = None;
                        state.phase = Phase::GeneratingContent;
                        messages.push(generation_ready_message(state.roles.len()));
                        break;
                    }
                }
            }

            state.active_role_id = Some(active_id);
            let questions = self.planner.plan(&role, profile).await;
            log_questions_planned!(state.session_id, &role.title, questions.len());
            state.pending_questions = questions.clone();
            state.phase = Phase::AwaitingUser;

            let preamble = if gentle {
                format!(
                    "Thanks! I couldn't map that onto the details I track, so let me ask about the {} role directly:",
                    role.title
                )
            } else {
                format!(
                    "I need some more information about the {} role to create the best hiring materials:",
                    role.title
                )
            };
            let numbered: Vec<String> = questions
                .iter()
                .enumerate()
                .map(|(i, q)| format!("{}. {}", i + 1, q))
                .collect();
            messages.push(format!("{}\n\n{}", preamble, numbered.join("\n")));
            break;
        }

        messages
    }

    /// Run one generation pass over all unresolved cells
    ///
    /// May be called repeatedly: each pass re-dispatches only the cells that
    /// are still unresolved, until every cell succeeds or exhausts its
    /// attempt budget.
    pub async fn run_generation(
        &self,
        state: &mut ConversationState,
        profile: &CompanyProfile,
        writer: Arc<dyn DocumentWriter>,
        concurrency: usize,
    ) -> Result<GenerationReport> {
        if state.phase != Phase::GeneratingContent {
            anyhow::bail!(
                "generation requested in phase '{}', expected 'generating_content'",
                state.phase.as_str()
            );
        }

        let eligible: Vec<Uuid> = state
            .roles
            .iter()
            .filter(|r| matches!(r.status, RoleStatus::Complete | RoleStatus::Generating))
            .map(|r| r.id)
            .collect();

        for role_id in &eligible {
            if let Some(role) = state.role_mut(*role_id) {
                role.status = RoleStatus::Generating;
            }
            for kind in ContentKind::ALL {
                state.cell_mut(*role_id, kind);
            }
        }

        let jobs: Vec<GenerationJob> = state
            .cells
            .iter()
            .filter(|c| eligible.contains(&c.role_id) && c.outcome.is_none())
            .filter_map(|c| {
                state.role(c.role_id).map(|role| GenerationJob {
                    role: role.clone(),
                    kind: c.kind,
                    attempt: c.attempts + 1,
                })
            })
            .collect();

        log_generation_start!(state.session_id, jobs.len());

        let results = run_cells(
            state.session_id,
            jobs,
            profile,
            self.completion.clone(),
            writer,
            concurrency,
        )
        .await?;

        let mut succeeded_this_pass = 0;
        let mut failed_this_pass = 0;
        for cell_result in results {
            let record = state.cell_mut(cell_result.role_id, cell_result.kind);
            record.attempts += 1;
            match cell_result.result {
                Ok(artifact) => {
                    record.last_error = None;
                    record.outcome = Some(CellResolution::Succeeded { artifact });
                    succeeded_this_pass += 1;
                }
                Err(error) => {
                    failed_this_pass += 1;
                    if record.attempts >= MAX_CELL_ATTEMPTS {
                        record.outcome = Some(CellResolution::FailedPermanently {
                            error: error.clone(),
                        });
                    }
                    record.last_error = Some(error);
                }
            }
        }

        // A role is done once every cell has a terminal outcome
        for role_id in &eligible {
            let resolved = ContentKind::ALL
                .iter()
                .all(|kind| {
                    state
                        .cell(*role_id, *kind)
                        .map_or(false, |c| c.outcome.is_some())
                });
            if resolved {
                if let Some(role) = state.role_mut(*role_id) {
                    role.status = RoleStatus::Done;
                }
            }
        }

        if !state.roles.is_empty() && state.roles.iter().all(|r| r.status == RoleStatus::Done) {
            state.phase = Phase::Complete;
        }

        log_generation_complete!(state.session_id, succeeded_this_pass, failed_this_pass);

        Ok(build_report(state, &eligible))
    }
}

fn generation_ready_message(role_count: usize) -> String {
    format!(
        "Perfect! I have enough information to create hiring materials for your {} role(s). I'll generate a job description, hiring checklist, timeline, salary recommendation, and interview questions for each position.",
        role_count
    )
}

/// Assemble the per-cell report for all eligible roles
fn build_report(state: &ConversationState, eligible: &[Uuid]) -> GenerationReport {
    let mut cells = Vec::new();
    let mut pending_retry = 0;

    for role_id in eligible {
        let Some(role) = state.role(*role_id) else {
            continue;
        };
        for kind in ContentKind::ALL {
            let Some(record) = state.cell(*role_id, kind) else {
                continue;
            };
            let outcome = match &record.outcome {
                Some(CellResolution::Succeeded { artifact }) => CellOutcome::Success {
                    artifact: artifact.clone(),
                },
                Some(CellResolution::FailedPermanently { error }) => CellOutcome::Failed {
                    error: error.clone(),
                    permanent: true,
                },
                None => {
                    pending_retry += 1;
                    CellOutcome::Failed {
                        error: record
                            .last_error
                            .clone()
                            .unwrap_or_else(|| "not yet attempted".to_string()),
                        permanent: false,
                    }
                }
            };
            cells.push(CellReport {
                role_id: *role_id,
                role_title: role.title.clone(),
                kind,
                outcome,
            });
        }
    }

    GenerationReport {
        cells,
        pending_retry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::completeness::MissingField;
    use crate::llm_utils::testing::{RecordingWriter, ScriptedCompletion};
    use hiring_assistant_sdk::CompletionError;

    fn engine_with(responses: Vec<Result<String, CompletionError>>) -> ConversationEngine {
        ConversationEngine::new(Arc::new(ScriptedCompletion::new(responses)))
    }

    /// Extraction response then a planner failure (templated questions)
    fn one_role_script(title: &str) -> Vec<Result<String, CompletionError>> {
        vec![
            Ok(format!("{{\"roles\": [{{\"title\": \"{}\"}}]}}", title)),
            Err(CompletionError::Timeout),
        ]
    }

    #[tokio::test]
    async fn test_single_role_request_asks_for_missing_fields() {
        let engine = engine_with(one_role_script("Senior Frontend Developer"));

        let (state, output) = engine
            .start(
                "I need to hire a senior frontend developer",
                &CompanyProfile::default(),
            )
            .await;

        assert_eq!(state.roles.len(), 1);
        assert!(state.roles[0].title.contains("Frontend"));
        assert_eq!(state.roles[0].status, RoleStatus::Incomplete);
        assert_eq!(state.phase, Phase::AwaitingUser);
        assert_eq!(state.active_role_id, Some(state.roles[0].id));

        let missing = evaluate(&state.roles[0]).missing_fields;
        assert!(missing.contains(&MissingField::BudgetRange));
        assert!(missing.contains(&MissingField::Timeline));

        assert!(!state.pending_questions.is_empty());
        assert!(output.messages.iter().any(|m| m.contains("1.")));
    }

    #[tokio::test]
    async fn test_two_roles_created_in_utterance_order() {
        let engine = engine_with(vec![
            Ok(r#"{"roles": [{"title": "Founding Engineer"}, {"title": "GenAI Intern"}]}"#
                .to_string()),
            Err(CompletionError::Timeout),
        ]);

        let (state, _) = engine
            .start(
                "I need a founding engineer and a GenAI intern",
                &CompanyProfile::default(),
            )
            .await;

        assert_eq!(state.roles.len(), 2);
        assert_eq!(state.roles[0].title, "Founding Engineer");
        assert_eq!(state.roles[1].title, "GenAI Intern");
        // First discovered role is active
        assert_eq!(state.active_role_id, Some(state.roles[0].id));
    }

    #[tokio::test]
    async fn test_unparseable_extraction_on_fresh_conversation_synthesizes_role() {
        let engine = engine_with(vec![
            Ok("Sure, happy to help with hiring!".to_string()),
            Err(CompletionError::Timeout),
        ]);

        let (state, output) = engine.start("Hello there", &CompanyProfile::default()).await;

        assert_eq!(state.roles.len(), 1);
        assert_eq!(state.roles[0].title, "New Role");
        assert_eq!(state.roles[0].status, RoleStatus::Incomplete);
        // Gentler preamble after a fallback
        assert!(output
            .messages
            .iter()
            .any(|m| m.contains("couldn't map that")));
    }

    #[tokio::test]
    async fn test_zero_roles_moves_to_clarifying() {
        let engine = engine_with(vec![Ok(r#"{"roles": []}"#.to_string())]);

        let (state, output) = engine
            .start("What's the weather like?", &CompanyProfile::default())
            .await;

        assert_eq!(state.phase, Phase::ClarifyingRoles);
        assert!(state.roles.is_empty());
        assert!(output
            .messages
            .iter()
            .any(|m| m.contains("What position")));
    }

    #[tokio::test]
    async fn test_service_error_leaves_state_unchanged() {
        let engine = engine_with(vec![Err(CompletionError::Network("down".to_string()))]);

        let (state, output) = engine
            .start("I need a founding engineer", &CompanyProfile::default())
            .await;

        assert_eq!(state.phase, Phase::Initial);
        assert!(state.roles.is_empty());
        assert!(state.messages.is_empty());
        assert!(output.messages[0].contains("please send that again"));
    }

    #[tokio::test]
    async fn test_completed_answer_advances_to_generation() {
        let engine = engine_with(vec![
            // Turn 1: one role extracted
            Ok(r#"{"roles": [{"title": "Founding Engineer"}]}"#.to_string()),
            // Planner fails over to templates
            Err(CompletionError::Timeout),
            // Turn 2: the answer fills every missing field
            Ok(r#"{"roles": [{
                "title": "Founding Engineer",
                "budget": "$150k",
                "timeline": "6 weeks",
                "skills": ["React", "Node"]
            }]}"#
                .to_string()),
        ]);

        let profile = CompanyProfile::default();
        let (mut state, _) = engine
            .start("I need a founding engineer", &profile)
            .await;
        assert_eq!(state.phase, Phase::AwaitingUser);

        let output = engine
            .submit_user_text(
                &mut state,
                "Budget is $150k, 6 weeks, skills React and Node",
                &profile,
            )
            .await;

        assert_eq!(state.phase, Phase::GeneratingContent);
        assert_eq!(state.roles[0].status, RoleStatus::Complete);
        assert_eq!(state.roles[0].budget_range.as_ref().unwrap().min, 150_000);
        assert_eq!(state.roles[0].required_skills, vec!["React", "Node"]);
        assert!(state.active_role_id.is_none());
        assert!(output
            .messages
            .iter()
            .any(|m| m.contains("enough information")));
    }

    #[tokio::test]
    async fn test_role_discovered_mid_conversation_is_visited_last() {
        let engine = engine_with(vec![
            Ok(r#"{"roles": [{"title": "Founding Engineer"}, {"title": "Designer"}]}"#.to_string()),
            // Planner for Founding Engineer
            Err(CompletionError::Timeout),
            // Answer completes the founding engineer AND mentions a new role
            Ok(r#"{"roles": [
                {"title": "Founding Engineer", "budget": "$150k", "timeline": "6 weeks", "skills": ["Rust"]},
                {"title": "Data Engineer"}
            ]}"#
            .to_string()),
            // Planner for the next role
            Err(CompletionError::Timeout),
        ]);

        let profile = CompanyProfile::default();
        let (mut state, _) = engine
            .start("founding engineer and a designer", &profile)
            .await;

        engine
            .submit_user_text(&mut state, "150k, 6 weeks, Rust. Also a data engineer.", &profile)
            .await;

        assert_eq!(state.roles.len(), 3);
        // New role appended at the end
        assert_eq!(state.roles[2].title, "Data Engineer");
        // Designer (known before this turn) is visited before Data Engineer
        assert_eq!(state.active_role_id, Some(state.roles[1].id));
        assert_eq!(state.phase, Phase::AwaitingUser);
    }

    #[tokio::test]
    async fn test_fallback_answer_re_asks_gently_without_stalling() {
        let engine = engine_with(vec![
            Ok(r#"{"roles": [{"title": "Designer"}]}"#.to_string()),
            Err(CompletionError::Timeout),
            // Unparseable answer: zero updates, conversation must advance
            Ok("hmm, not sure yet".to_string()),
            Err(CompletionError::Timeout),
        ]);

        let profile = CompanyProfile::default();
        let (mut state, _) = engine.start("need a designer", &profile).await;

        let output = engine
            .submit_user_text(&mut state, "whatever you think is best", &profile)
            .await;

        // Still awaiting the user, with fresh questions and a gentle preamble
        assert_eq!(state.phase, Phase::AwaitingUser);
        assert!(!state.pending_questions.is_empty());
        assert!(output
            .messages
            .iter()
            .any(|m| m.contains("couldn't map that")));
    }

    #[tokio::test]
    async fn test_complete_phase_rejects_further_text() {
        let engine = engine_with(Vec::new());
        let mut state = ConversationState::new("done deal");
        state.phase = Phase::Complete;

        let output = engine
            .submit_user_text(&mut state, "one more thing", &CompanyProfile::default())
            .await;

        assert_eq!(state.phase, Phase::Complete);
        assert!(output.messages[0].contains("complete"));
    }

    fn complete_role(title: &str) -> JobRole {
        let mut role = JobRole::new(title);
        role.budget_range = Some(crate::conversation::state::BudgetRange::new(
            100_000, 140_000, "USD",
        ));
        role.timeline = Some("8 weeks".to_string());
        role.add_skill("Rust");
        role.status = RoleStatus::Complete;
        role
    }

    fn generating_state(titles: &[&str]) -> ConversationState {
        let mut state = ConversationState::new("hire people");
        for title in titles {
            state.roles.push(complete_role(title));
        }
        state.phase = Phase::GeneratingContent;
        state
    }

    #[tokio::test]
    async fn test_generation_report_covers_every_cell() {
        let engine = ConversationEngine::new(Arc::new(ScriptedCompletion::always("# doc")));
        let writer = Arc::new(RecordingWriter::new());
        let mut state = generating_state(&["Founding Engineer", "GenAI Intern"]);

        let report = engine
            .run_generation(&mut state, &CompanyProfile::default(), writer, 4)
            .await
            .unwrap();

        // |complete roles| x 5 cells, all explicit
        assert_eq!(report.cells.len(), 10);
        assert_eq!(report.succeeded(), 10);
        assert_eq!(report.pending_retry, 0);
        assert_eq!(state.phase, Phase::Complete);
        assert!(state.roles.iter().all(|r| r.status == RoleStatus::Done));
    }

    #[tokio::test]
    async fn test_cell_failing_twice_succeeds_within_retry_budget() {
        let engine = ConversationEngine::new(Arc::new(ScriptedCompletion::always("# doc")));
        let writer = Arc::new(RecordingWriter::new());
        writer.fail_times("Founding Engineer", ContentKind::SalaryRecommendation, 2);
        let mut state = generating_state(&["Founding Engineer"]);
        let profile = CompanyProfile::default();

        // Pass 1: four cells succeed, one fails (retryable)
        let report = engine
            .run_generation(&mut state, &profile, writer.clone(), 4)
            .await
            .unwrap();
        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.pending_retry, 1);
        assert_eq!(state.phase, Phase::GeneratingContent);

        // Pass 2: only the failed cell is re-dispatched, fails again
        let report = engine
            .run_generation(&mut state, &profile, writer.clone(), 4)
            .await
            .unwrap();
        assert_eq!(report.pending_retry, 1);

        // Pass 3: third attempt succeeds
        let report = engine
            .run_generation(&mut state, &profile, writer.clone(), 4)
            .await
            .unwrap();
        assert_eq!(report.succeeded(), 5);
        assert_eq!(report.pending_retry, 0);
        assert_eq!(state.phase, Phase::Complete);

        // 4 + 1 + 1 successful writes; the retried cell was written once
        assert_eq!(writer.write_count(), 5);
    }

    #[tokio::test]
    async fn test_exhausted_cell_fails_permanently_without_blocking_siblings() {
        let engine = ConversationEngine::new(Arc::new(ScriptedCompletion::always("# doc")));
        let writer = Arc::new(RecordingWriter::new());
        writer.fail_times("Founding Engineer", ContentKind::HiringTimeline, 10);
        let mut state = generating_state(&["Founding Engineer"]);
        let profile = CompanyProfile::default();

        let mut report = engine
            .run_generation(&mut state, &profile, writer.clone(), 4)
            .await
            .unwrap();
        for _ in 0..2 {
            report = engine
                .run_generation(&mut state, &profile, writer.clone(), 4)
                .await
                .unwrap();
        }

        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.failed_permanently(), 1);
        assert_eq!(report.pending_retry, 0);
        // Permanent failure still lets the conversation terminate
        assert_eq!(state.phase, Phase::Complete);
        assert_eq!(state.roles[0].status, RoleStatus::Done);
    }

    #[tokio::test]
    async fn test_generation_outside_phase_is_an_error() {
        let engine = ConversationEngine::new(Arc::new(ScriptedCompletion::always("# doc")));
        let writer = Arc::new(RecordingWriter::new());
        let mut state = ConversationState::new("hello");

        let result = engine
            .run_generation(&mut state, &CompanyProfile::default(), writer, 4)
            .await;
        assert!(result.is_err());
    }
}
