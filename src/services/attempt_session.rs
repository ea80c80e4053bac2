use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use uuid::Uuid;

use crate::core::context::SessionContext;
use crate::core::metrics::{ATTEMPTS_FAILED, ATTEMPTS_STARTED, SUBMISSIONS, SUBMISSION_FAILURES};
use crate::schemas::exam::StartAttemptResponse;
use crate::schemas::submission::SubmitAttemptResponse;
use crate::services::answers::{build_submission, AnswerValue, Question, QuestionId};
use crate::services::countdown::{Countdown, Tick};
use crate::services::errors::SessionError;
use crate::services::exam_backend::ExamBackend;
use crate::services::observer::{Confirmation, SessionObserver, SubmissionOutcome, SubmitPreview};

const DEFAULT_DURATION_MINUTES: u64 = 60;
const START_FALLBACK_MESSAGE: &str = "Unable to start exam";
const SUBMIT_FALLBACK_MESSAGE: &str = "Submission failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    NotStarted,
    Loading,
    Active,
    Submitting,
    Submitted,
    Failed,
}

impl AttemptPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Loading => "loading",
            Self::Active => "active",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Failed)
    }
}

/// Who asked for the submission. Manual submissions go through a confirmation first.
#[derive(Clone, Copy)]
pub enum SubmitMode<'a> {
    Manual(&'a dyn Confirmation),
    Auto,
}

impl SubmitMode<'_> {
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Manual(_) => "manual",
            Self::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(SubmissionOutcome),
    /// The student did not confirm.
    Declined,
    /// Another submission is in flight or already done, or the attempt is not active.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Remaining(u64),
    /// Time is up and the attempt still has to be submitted.
    Expired,
}

#[derive(Debug, Clone)]
struct Attempt {
    id: Uuid,
    questions: Vec<Question>,
    answers: HashMap<QuestionId, AnswerValue>,
}

struct SessionState {
    phase: AttemptPhase,
    attempt: Option<Attempt>,
    countdown: Countdown,
}

/// One student's attempt at one exam, from start (or resume) to its single submission.
///
/// The state lock is never held across an await: the `Submitting` phase is the in-flight guard,
/// so a timer-driven and a user-driven submit can race and only one reaches the backend. A
/// start or submit whose future is dropped mid-call rolls its phase back. Dropping the session
/// cancels its countdown.
pub struct ExamAttemptSession {
    exam_id: String,
    context: SessionContext,
    backend: Arc<dyn ExamBackend>,
    observer: Arc<dyn SessionObserver>,
    default_duration_minutes: u64,
    state: Mutex<SessionState>,
    cancelled: watch::Receiver<bool>,
}

impl ExamAttemptSession {
    pub fn new(
        exam_id: impl Into<String>,
        context: SessionContext,
        backend: Arc<dyn ExamBackend>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let countdown = Countdown::new();
        let cancelled = countdown.subscribe();
        Self {
            exam_id: exam_id.into(),
            context,
            backend,
            observer,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            state: Mutex::new(SessionState {
                phase: AttemptPhase::NotStarted,
                attempt: None,
                countdown,
            }),
            cancelled,
        }
    }

    /// Duration used when the backend reports neither remaining time nor a duration.
    pub fn with_default_duration_minutes(mut self, minutes: u64) -> Self {
        self.default_duration_minutes = minutes;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    /// Flips to `true` once the countdown is cancelled: on teardown, drop, or after a
    /// successful submission.
    pub fn cancelled(&self) -> watch::Receiver<bool> {
        self.cancelled.clone()
    }

    pub async fn phase(&self) -> AttemptPhase {
        self.lock_state().phase
    }

    pub async fn remaining_seconds(&self) -> u64 {
        self.lock_state().countdown.remaining()
    }

    pub async fn attempt_id(&self) -> Option<Uuid> {
        self.lock_state().attempt.as_ref().map(|attempt| attempt.id)
    }

    pub async fn questions(&self) -> Vec<Question> {
        let state = self.lock_state();
        state.attempt.as_ref().map(|attempt| attempt.questions.clone()).unwrap_or_default()
    }

    pub async fn answers(&self) -> HashMap<QuestionId, AnswerValue> {
        let state = self.lock_state();
        state.attempt.as_ref().map(|attempt| attempt.answers.clone()).unwrap_or_default()
    }

    /// `(answered, total)` for progress display.
    pub async fn answered(&self) -> (usize, usize) {
        let state = self.lock_state();
        state
            .attempt
            .as_ref()
            .map(|attempt| (attempt.answers.len(), attempt.questions.len()))
            .unwrap_or((0, 0))
    }

    /// Summary shown before a manual submission; `None` unless the attempt is active.
    pub async fn preview(&self) -> Option<SubmitPreview> {
        let state = self.lock_state();
        if state.phase != AttemptPhase::Active {
            return None;
        }
        let attempt = state.attempt.as_ref()?;
        Some(SubmitPreview {
            answered: attempt.answers.len(),
            total: attempt.questions.len(),
            remaining_seconds: state.countdown.remaining(),
            file_questions: attempt
                .questions
                .iter()
                .filter(|question| !question.kind.is_submittable())
                .count(),
        })
    }

    pub async fn start(&self) -> Result<(), SessionError> {
        {
            let mut state = self.lock_state();
            if state.phase != AttemptPhase::NotStarted {
                return Err(SessionError::NotActive);
            }
            state.phase = AttemptPhase::Loading;
        }

        let guard = InFlight::arm(self, AttemptPhase::Loading);
        let loaded = self.load().await;
        guard.disarm();

        let mut state = self.lock_state();
        match loaded {
            Ok((attempt, seconds)) => {
                let attempt_id = attempt.id;
                let answered = attempt.answers.len();
                let total = attempt.questions.len();
                state.countdown.seed(seconds);
                state.attempt = Some(attempt);
                state.phase = AttemptPhase::Active;
                drop(state);

                metrics::counter!(ATTEMPTS_STARTED).increment(1);
                tracing::info!(
                    exam_id = %self.exam_id,
                    attempt_id = %attempt_id,
                    questions = total,
                    restored_answers = answered,
                    remaining = seconds,
                    "Exam attempt started"
                );
                self.observer.on_answered(answered, total);
                self.observer.on_tick(seconds);
                Ok(())
            }
            Err(err) => {
                state.phase = AttemptPhase::Failed;
                state.attempt = None;
                drop(state);

                metrics::counter!(ATTEMPTS_FAILED).increment(1);
                tracing::warn!(exam_id = %self.exam_id, error = %err, "Exam attempt cannot start");
                self.observer.on_failed(&err);
                Err(err)
            }
        }
    }

    async fn load(&self) -> Result<(Attempt, u64), SessionError> {
        if !self.context.is_student() {
            return Err(SessionError::AttemptNotStartable(
                "Only students can take exams".to_string(),
            ));
        }

        let response = self.backend.start_attempt(&self.exam_id).await.map_err(|err| {
            tracing::error!(exam_id = %self.exam_id, error = %err, "Start request failed");
            SessionError::AttemptNotStartable(err.user_message(START_FALLBACK_MESSAGE))
        })?;

        self.restore(response)
    }

    fn restore(&self, response: StartAttemptResponse) -> Result<(Attempt, u64), SessionError> {
        let StartAttemptResponse { questions, previous_answers, duration, remaining_seconds } =
            response;

        let mut questions = questions
            .into_iter()
            .enumerate()
            .map(|(index, dto)| Question::from_dto(index, dto))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                SessionError::AttemptNotStartable(format!("Unsupported question type '{}'", err.0))
            })?;
        questions.sort_by_key(|question| question.position);

        let mut answers = HashMap::new();
        for previous in &previous_answers {
            let Some(question) =
                questions.iter().find(|question| question.id == previous.question_id)
            else {
                tracing::warn!(
                    exam_id = %self.exam_id,
                    question_id = %previous.question_id,
                    "Dropping saved answer for a question outside this exam"
                );
                continue;
            };
            if let Some(value) = AnswerValue::restore(question, previous) {
                answers.insert(question.id.clone(), value);
            }
        }

        let seconds = remaining_seconds.unwrap_or_else(|| {
            duration.filter(|minutes| *minutes > 0).unwrap_or(self.default_duration_minutes) * 60
        });

        Ok((Attempt { id: Uuid::new_v4(), questions, answers }, seconds))
    }

    /// Overwrites the answer for `question_id`. The value is opaque apart from its kind.
    pub async fn set_answer(
        &self,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<(), SessionError> {
        let (count, total) = {
            let mut state = self.lock_state();
            let attempt = active_attempt(&mut state)?;

            let question = attempt
                .questions
                .iter()
                .find(|question| question.id == question_id)
                .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;

            let expected = question.kind.answer_kind();
            if value.kind() != expected {
                return Err(SessionError::AnswerKindMismatch {
                    question_id: question_id.to_string(),
                    expected,
                    actual: value.kind(),
                });
            }

            attempt.answers.insert(question_id.to_string(), value);
            (attempt.answers.len(), attempt.questions.len())
        };

        tracing::debug!(exam_id = %self.exam_id, question_id, answered = count, "Answer recorded");
        self.observer.on_answered(count, total);
        Ok(())
    }

    pub async fn clear_answer(&self, question_id: &str) -> Result<(), SessionError> {
        let (count, total) = {
            let mut state = self.lock_state();
            let attempt = active_attempt(&mut state)?;
            if !attempt.questions.iter().any(|question| question.id == question_id) {
                return Err(SessionError::UnknownQuestion(question_id.to_string()));
            }
            attempt.answers.remove(question_id);
            (attempt.answers.len(), attempt.questions.len())
        };

        self.observer.on_answered(count, total);
        Ok(())
    }

    /// One second of exam time. Only effective while the attempt is active.
    pub async fn tick(&self) -> TickOutcome {
        let tick = {
            let mut state = self.lock_state();
            if state.phase != AttemptPhase::Active {
                return TickOutcome::Ignored;
            }
            state.countdown.tick()
        };

        match tick {
            Tick::Idle => TickOutcome::Ignored,
            Tick::Elapsed(remaining) => {
                self.observer.on_tick(remaining);
                if remaining == 0 {
                    TickOutcome::Expired
                } else {
                    TickOutcome::Remaining(remaining)
                }
            }
            Tick::AtZero => TickOutcome::Expired,
        }
    }

    /// [`tick`](Self::tick), then submit automatically if time ran out.
    pub async fn tick_and_settle(&self) -> Result<TickOutcome, SessionError> {
        let outcome = self.tick().await;
        if outcome == TickOutcome::Expired {
            self.submit(SubmitMode::Auto).await?;
        }
        Ok(outcome)
    }

    pub async fn submit(&self, mode: SubmitMode<'_>) -> Result<SubmitOutcome, SessionError> {
        if let SubmitMode::Manual(confirmation) = mode {
            let Some(preview) = self.preview().await else {
                return Ok(SubmitOutcome::Ignored);
            };
            if !confirmation.confirm(&preview).await {
                tracing::debug!(exam_id = %self.exam_id, "Manual submission declined");
                return Ok(SubmitOutcome::Declined);
            }
        }

        let (attempt_id, draft) = {
            let mut state = self.lock_state();
            if state.phase != AttemptPhase::Active {
                tracing::debug!(
                    exam_id = %self.exam_id,
                    mode = mode.label(),
                    phase = state.phase.as_str(),
                    "Submission ignored"
                );
                return Ok(SubmitOutcome::Ignored);
            }
            let Some(attempt) = state.attempt.as_ref() else {
                return Ok(SubmitOutcome::Ignored);
            };
            let attempt_id = attempt.id;
            let draft = build_submission(&attempt.questions, &attempt.answers);
            state.phase = AttemptPhase::Submitting;
            state.countdown.freeze();
            (attempt_id, draft)
        };
        let guard = InFlight::arm(self, AttemptPhase::Submitting);

        if !draft.excluded.is_empty() {
            tracing::warn!(
                exam_id = %self.exam_id,
                attempt_id = %attempt_id,
                excluded = ?draft.excluded,
                "File answers are not submitted for scoring"
            );
        }

        let result = self.backend.submit_attempt(&self.exam_id, &draft.request).await;
        guard.disarm();

        let mut state = self.lock_state();
        match result {
            Ok(response) => {
                state.phase = AttemptPhase::Submitted;
                state.countdown.cancel();
                drop(state);

                let outcome = SubmissionOutcome::from(response);
                metrics::counter!(SUBMISSIONS, "mode" => mode.label()).increment(1);
                tracing::info!(
                    exam_id = %self.exam_id,
                    attempt_id = %attempt_id,
                    mode = mode.label(),
                    answers = draft.request.answers.len(),
                    outcome = ?outcome,
                    "Exam attempt submitted"
                );
                self.observer.on_submitted(&outcome);
                Ok(SubmitOutcome::Submitted(outcome))
            }
            Err(err) => {
                state.phase = AttemptPhase::Active;
                state.countdown.resume();
                drop(state);

                metrics::counter!(SUBMISSION_FAILURES, "mode" => mode.label()).increment(1);
                tracing::error!(
                    exam_id = %self.exam_id,
                    attempt_id = %attempt_id,
                    mode = mode.label(),
                    error = %err,
                    "Exam submission failed"
                );
                let error =
                    SessionError::SubmissionFailed(err.user_message(SUBMIT_FALLBACK_MESSAGE));
                self.observer.on_failed(&error);
                Err(error)
            }
        }
    }

    /// Stops the countdown for good. Safe to call any number of times.
    pub async fn teardown(&self) {
        let mut state = self.lock_state();
        if !state.countdown.is_cancelled() {
            tracing::debug!(
                exam_id = %self.exam_id,
                phase = state.phase.as_str(),
                "Attempt torn down"
            );
        }
        state.countdown.cancel();
    }
}

impl Drop for ExamAttemptSession {
    fn drop(&mut self) {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner).countdown.cancel();
    }
}

/// Rolls back a `Loading` or `Submitting` phase if the future that entered it is dropped
/// before the backend answers: an abandoned start fails, an abandoned submit is active again.
struct InFlight<'a> {
    session: &'a ExamAttemptSession,
    phase: AttemptPhase,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn arm(session: &'a ExamAttemptSession, phase: AttemptPhase) -> Self {
        Self { session, phase, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.session.lock_state();
        if state.phase != self.phase {
            return;
        }
        let restored = if self.phase == AttemptPhase::Submitting {
            state.countdown.resume();
            AttemptPhase::Active
        } else {
            state.attempt = None;
            AttemptPhase::Failed
        };
        state.phase = restored;
        drop(state);

        tracing::warn!(
            exam_id = %self.session.exam_id,
            abandoned = self.phase.as_str(),
            phase = restored.as_str(),
            "Backend call abandoned"
        );
    }
}

fn active_attempt(state: &mut SessionState) -> Result<&mut Attempt, SessionError> {
    match state.phase {
        AttemptPhase::Active => state.attempt.as_mut().ok_or(SessionError::NotActive),
        AttemptPhase::Submitting | AttemptPhase::Submitted => Err(SessionError::AttemptFinalized),
        AttemptPhase::NotStarted | AttemptPhase::Loading | AttemptPhase::Failed => {
            Err(SessionError::NotActive)
        }
    }
}

impl From<SubmitAttemptResponse> for SubmissionOutcome {
    fn from(response: SubmitAttemptResponse) -> Self {
        match response {
            SubmitAttemptResponse::Scored { obtained_marks, total_marks } => {
                Self::Scored { obtained: obtained_marks, total: total_marks }
            }
            SubmitAttemptResponse::Pending { message, .. } => Self::PendingEvaluation { message },
        }
    }
}
