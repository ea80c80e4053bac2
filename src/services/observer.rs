use async_trait::async_trait;

use crate::services::errors::SessionError;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Scored { obtained: f64, total: f64 },
    /// A teacher grades the attempt later.
    PendingEvaluation { message: Option<String> },
}

/// What the student is about to hand in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPreview {
    pub answered: usize,
    pub total: usize,
    pub remaining_seconds: u64,
    /// File questions, which are never sent for scoring.
    pub file_questions: usize,
}

impl SubmitPreview {
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}

/// Callbacks for whatever renders the attempt. Called without any session lock held.
pub trait SessionObserver: Send + Sync {
    fn on_tick(&self, _remaining_seconds: u64) {}

    fn on_answered(&self, _count: usize, _total: usize) {}

    fn on_submitted(&self, _outcome: &SubmissionOutcome) {}

    fn on_failed(&self, _error: &SessionError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Asks the student to confirm a manual submission.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, preview: &SubmitPreview) -> bool;
}

/// For callers that already asked.
#[derive(Debug, Default, Clone, Copy)]
pub struct Confirmed;

#[async_trait]
impl Confirmation for Confirmed {
    async fn confirm(&self, _preview: &SubmitPreview) -> bool {
        true
    }
}
