//! Test doubles for the collaborator interfaces

use hiring_assistant_sdk::{
    async_trait, ArtifactRef, Completion, CompletionError, ContentKind, DocumentWriteError,
    DocumentWriter, ResponseFormat,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

/// Completion double that replays a scripted queue of responses
pub(crate) struct ScriptedCompletion {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    default: Result<String, CompletionError>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            default: Err(CompletionError::Api {
                status: 500,
                message: "script exhausted".to_string(),
            }),
        }
    }

    /// Response returned once the scripted queue runs dry
    pub fn with_default(mut self, default: Result<String, CompletionError>) -> Self {
        self.default = default;
        self
    }

    /// Double that answers every call with the same response
    pub fn always(response: &str) -> Self {
        Self::new(Vec::new()).with_default(Ok(response.to_string()))
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
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

/// Writer double that records writes and can fail selected cells N times
pub(crate) struct RecordingWriter {
    pub writes: Mutex<Vec<(String, ContentKind)>>,
    failures: Mutex<HashMap<(String, ContentKind), u32>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Make the next `times` writes for (role, kind) fail
    pub fn fail_times(&self, role_title: &str, kind: ContentKind, times: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert((role_title.to_string(), kind), times);
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentWriter for RecordingWriter {
    async fn write(
        &self,
        _session_id: Uuid,
        role_title: &str,
        kind: ContentKind,
        _rendered: &str,
    ) -> Result<ArtifactRef, DocumentWriteError> {
        let key = (role_title.to_string(), kind);
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(DocumentWriteError::Io("simulated write failure".to_string()));
                }
            }
        }
        self.writes.lock().unwrap().push(key);
        Ok(ArtifactRef::new(format!(
            "mem://{}/{}",
            kind.as_str(),
            role_title
        )))
    }
}
