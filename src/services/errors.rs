use thiserror::Error;

use crate::services::answers::AnswerKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Not assigned, outside the exam window, already finalized, or the start request failed.
    /// The caller has to leave the attempt.
    #[error("{0}")]
    AttemptNotStartable(String),

    /// The submission did not go through; the attempt is still active and may be retried.
    #[error("{0}")]
    SubmissionFailed(String),

    #[error("attempt has already been submitted")]
    AttemptFinalized,

    #[error("attempt is not active")]
    NotActive,

    #[error("question {0} is not part of this exam")]
    UnknownQuestion(String),

    #[error("question {question_id} takes a {expected} answer, got {actual}")]
    AnswerKindMismatch { question_id: String, expected: AnswerKind, actual: AnswerKind },
}
