//! Integration tests for the conversation engine
//!
//! Exercises the public API end to end with scripted collaborators
//! (no real API calls): request intake, question rounds, completion,
//! and parallel document generation.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::Arc;

use hiring_assistant::conversation::machine::ConversationEngine;
use hiring_assistant::conversation::state::{Phase, RoleStatus};
use hiring_assistant::generation::CellOutcome;
use hiring_assistant::profile::CompanyProfile;
use hiring_assistant_sdk::{
    async_trait, ArtifactRef, Completion, CompletionError, ContentKind, DocumentWriteError,
    DocumentWriter, ResponseFormat,
};
use uuid::Uuid;

/// Completion double replaying a scripted queue of responses
struct Script {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    default: Result<String, CompletionError>,
}

impl Script {
    fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            default: Ok("# generated document".to_string()),
        }
    }
}

#[async_trait]
impl Completion for Script {
    async fn complete(
        &self,
        _prompt: &str,
        _format: ResponseFormat,
    ) -> Result<String, CompletionError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Writer double collecting artifacts in memory
#[derive(Default)]
struct MemoryWriter {
    artifacts: Mutex<Vec<(String, ContentKind)>>,
}

#[async_trait]
impl DocumentWriter for MemoryWriter {
    async fn write(
        &self,
        _session_id: Uuid,
        role_title: &str,
        kind: ContentKind,
        _rendered: &str,
    ) -> Result<ArtifactRef, DocumentWriteError> {
        self.artifacts
            .lock()
            .unwrap()
            .push((role_title.to_string(), kind));
        Ok(ArtifactRef::new(format!("mem://{}/{}", role_title, kind)))
    }
}

#[tokio::test]
async fn test_full_conversation_from_request_to_documents() {
    let script = Script::new(vec![
        // Turn 1: extraction finds two roles
        Ok(r#"{"roles": [
            {"title": "Founding Engineer", "seniority": "founding"},
            {"title": "GenAI Intern"}
        ]}"#
        .to_string()),
        // Question planning for the founding engineer fails over to templates
        Err(CompletionError::Timeout),
        // Turn 2: answer completes the founding engineer
        Ok(r#"{"roles": [{
            "title": "Founding Engineer",
            "budget": "$120k-150k",
            "timeline": "6-8 weeks",
            "skills": ["Rust", "Distributed Systems"]
        }]}"#
        .to_string()),
        // Question planning for the intern
        Ok(r#"["What budget range works for the GenAI Intern?"]"#.to_string()),
        // Turn 3: answer completes the intern
        Ok(r#"{"roles": [{
            "title": "GenAI Intern",
            "budget": {"min": 60000, "max": 80000, "currency": "USD"},
            "timeline": "ASAP",
            "skills": ["Python"]
        }]}"#
        .to_string()),
        // Everything after this uses the default document response
    ]);

    let engine = ConversationEngine::new(Arc::new(script));
    let profile = CompanyProfile::default();
    let writer = Arc::new(MemoryWriter::default());

    let (mut state, output) = engine
        .start("I need a founding engineer and a GenAI intern", &profile)
        .await;
    assert_eq!(state.phase, Phase::AwaitingUser);
    assert_eq!(state.roles.len(), 2);
    assert!(output.messages.iter().any(|m| m.contains("2 role(s)")));

    engine
        .submit_user_text(
            &mut state,
            "120-150k, 6-8 weeks, Rust and distributed systems",
            &profile,
        )
        .await;
    assert_eq!(state.roles[0].status, RoleStatus::Complete);
    assert_eq!(state.phase, Phase::AwaitingUser);
    // Pointer advanced to the intern
    assert_eq!(state.active_role_id, Some(state.roles[1].id));
    // One contextual question, the other missing fields topped up from templates
    assert_eq!(state.pending_questions.len(), 3);
    assert_eq!(
        state.pending_questions[0],
        "What budget range works for the GenAI Intern?"
    );

    engine
        .submit_user_text(&mut state, "60-80k, start ASAP, Python", &profile)
        .await;
    assert_eq!(state.phase, Phase::GeneratingContent);

    let report = engine
        .run_generation(&mut state, &profile, writer.clone(), 4)
        .await
        .unwrap();

    // 2 roles x 5 content kinds, every cell explicit
    assert_eq!(report.cells.len(), 10);
    assert!(report
        .cells
        .iter()
        .all(|c| matches!(c.outcome, CellOutcome::Success { .. })));
    assert_eq!(writer.artifacts.lock().unwrap().len(), 10);
    assert_eq!(state.phase, Phase::Complete);
    assert!(state.roles.iter().all(|r| r.status == RoleStatus::Done));
}

#[tokio::test]
async fn test_state_survives_serialization_between_turns() {
    let script = Script::new(vec![
        Ok(r#"{"roles": [{"title": "Product Designer"}]}"#.to_string()),
        Err(CompletionError::Timeout),
        Ok(r#"{"roles": [{
            "title": "Product Designer",
            "budget": "90k",
            "timeline": "next quarter",
            "skills": ["Figma"]
        }]}"#
        .to_string()),
    ]);
    let engine = ConversationEngine::new(Arc::new(script));
    let profile = CompanyProfile::default();

    let (state, _) = engine.start("hiring a product designer", &profile).await;

    // Round-trip through JSON, as the session store does
    let frozen = serde_json::to_string(&state).unwrap();
    let mut thawed: hiring_assistant::conversation::state::ConversationState =
        serde_json::from_str(&frozen).unwrap();

    engine
        .submit_user_text(&mut thawed, "90k, next quarter, Figma", &profile)
        .await;

    assert_eq!(thawed.phase, Phase::GeneratingContent);
    assert_eq!(thawed.roles[0].status, RoleStatus::Complete);
    assert_eq!(thawed.session_id, state.session_id);
}

#[tokio::test]
async fn test_company_facts_surface_as_profile_updates() {
    let script = Script::new(vec![Ok(r#"{
        "roles": [{"title": "Founding Engineer"}],
        "company": {"size": "12 people", "stage": "Seed"}
    }"#
    .to_string())]);
    let engine = ConversationEngine::new(Arc::new(script));

    let (_, output) = engine
        .start(
            "We're a 12-person seed startup hiring a founding engineer",
            &CompanyProfile::default(),
        )
        .await;

    assert_eq!(
        output.profile_updates.get("size").map(String::as_str),
        Some("12 people")
    );
    assert_eq!(
        output.profile_updates.get("stage").map(String::as_str),
        Some("Seed")
    );
}
