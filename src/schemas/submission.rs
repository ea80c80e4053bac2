use serde::{Deserialize, Serialize};

/// Body of `POST /student/submit/{examId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<SubmittedAnswerDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswerDto {
    pub question_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
}

/// Either the automatic evaluation or an acknowledgement that a teacher will grade the attempt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SubmitAttemptResponse {
    Scored {
        #[serde(rename = "obtainedMarks")]
        obtained_marks: f64,
        #[serde(rename = "totalMarks")]
        total_marks: f64,
    },
    Pending {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}
