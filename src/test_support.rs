use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Notify, Semaphore};

use crate::core::context::{Role, SessionContext};
use crate::schemas::exam::StartAttemptResponse;
use crate::schemas::submission::{SubmitAttemptRequest, SubmitAttemptResponse};
use crate::services::attempt_session::ExamAttemptSession;
use crate::services::errors::SessionError;
use crate::services::exam_backend::{BackendError, ExamBackend};
use crate::services::observer::{Confirmation, SessionObserver, SubmissionOutcome, SubmitPreview};

pub(crate) const EXAM_ID: &str = "exam-101";

pub(crate) fn student() -> SessionContext {
    SessionContext::new("student-token", Role::Student, "Meera")
}

pub(crate) fn teacher() -> SessionContext {
    SessionContext::new("teacher-token", Role::Teacher, "Mr. Iyer")
}

/// Start payload with one multiple-choice question per id.
pub(crate) fn start_payload(question_ids: &[&str], duration_minutes: u64) -> StartAttemptResponse {
    let questions: Vec<_> = question_ids
        .iter()
        .map(|id| {
            json!({
                "_id": id,
                "questionText": format!("Question {id}"),
                "options": { "A": "one", "B": "two", "C": "three", "D": "four" },
                "marks": 5
            })
        })
        .collect();
    serde_json::from_value(json!({
        "questions": questions,
        "previousAnswers": [],
        "duration": duration_minutes
    }))
    .expect("start payload")
}

pub(crate) fn scored(obtained: f64, total: f64) -> SubmitAttemptResponse {
    SubmitAttemptResponse::Scored { obtained_marks: obtained, total_marks: total }
}

pub(crate) fn rejected(status: u16, message: &str) -> BackendError {
    BackendError::Rejected { status, message: Some(message.to_string()) }
}

/// In-memory backend answering from queued results and recording every submission.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    start_results: Mutex<VecDeque<Result<StartAttemptResponse, BackendError>>>,
    submit_results: Mutex<VecDeque<Result<SubmitAttemptResponse, BackendError>>>,
    submissions: Mutex<Vec<SubmitAttemptRequest>>,
    gate: Option<Semaphore>,
    entered: Notify,
    stall_start: bool,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every submit call waits for [`ScriptedBackend::release`] before answering.
    pub(crate) fn gated() -> Self {
        Self { gate: Some(Semaphore::new(0)), ..Self::default() }
    }

    /// Start calls never answer.
    pub(crate) fn stalled_start() -> Self {
        Self { stall_start: true, ..Self::default() }
    }

    pub(crate) fn with_start(self, result: Result<StartAttemptResponse, BackendError>) -> Self {
        self.start_results.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_submit(self, result: Result<SubmitAttemptResponse, BackendError>) -> Self {
        self.submit_results.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn submissions(&self) -> Vec<SubmitAttemptRequest> {
        self.submissions.lock().unwrap().clone()
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Resolves once a submit call has reached the backend.
    pub(crate) async fn submit_entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl ExamBackend for ScriptedBackend {
    async fn start_attempt(&self, _exam_id: &str) -> Result<StartAttemptResponse, BackendError> {
        if self.stall_start {
            std::future::pending::<()>().await;
        }
        self.start_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(rejected(404, "Exam not assigned")))
    }

    async fn submit_attempt(
        &self,
        _exam_id: &str,
        request: &SubmitAttemptRequest,
    ) -> Result<SubmitAttemptResponse, BackendError> {
        self.submissions.lock().unwrap().push(request.clone());
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
        self.submit_results.lock().unwrap().pop_front().unwrap_or_else(|| Ok(scored(0.0, 0.0)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Tick(u64),
    Answered(usize, usize),
    Submitted(SubmissionOutcome),
    Failed(SessionError),
}

#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn submitted(&self) -> Vec<SubmissionOutcome> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Submitted(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_tick(&self, remaining_seconds: u64) {
        self.events.lock().unwrap().push(Event::Tick(remaining_seconds));
    }

    fn on_answered(&self, count: usize, total: usize) {
        self.events.lock().unwrap().push(Event::Answered(count, total));
    }

    fn on_submitted(&self, outcome: &SubmissionOutcome) {
        self.events.lock().unwrap().push(Event::Submitted(outcome.clone()));
    }

    fn on_failed(&self, error: &SessionError) {
        self.events.lock().unwrap().push(Event::Failed(error.clone()));
    }
}

/// Confirmation that answers with a fixed choice and remembers what it was shown.
pub(crate) struct FixedConfirmation {
    answer: bool,
    shown: Mutex<Vec<SubmitPreview>>,
}

impl FixedConfirmation {
    pub(crate) fn accept() -> Self {
        Self { answer: true, shown: Mutex::new(Vec::new()) }
    }

    pub(crate) fn decline() -> Self {
        Self { answer: false, shown: Mutex::new(Vec::new()) }
    }

    pub(crate) fn shown(&self) -> Vec<SubmitPreview> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmation for FixedConfirmation {
    async fn confirm(&self, preview: &SubmitPreview) -> bool {
        self.shown.lock().unwrap().push(preview.clone());
        self.answer
    }
}

pub(crate) fn session_with(
    backend: &Arc<ScriptedBackend>,
    observer: &Arc<RecordingObserver>,
) -> ExamAttemptSession {
    ExamAttemptSession::new(EXAM_ID, student(), backend.clone(), observer.clone())
}
