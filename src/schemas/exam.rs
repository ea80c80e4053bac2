use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Body of `GET /student/start/{examId}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub questions: Vec<QuestionDto>,
    #[serde(default)]
    pub previous_answers: Vec<PreviousAnswerDto>,
    /// Configured exam duration in minutes.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub remaining_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub question_text: String,
    /// `mcq`, `short`, `long` or `file`; absent means `mcq`.
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub marks: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousAnswerDto {
    pub question_id: String,
    #[serde(default)]
    pub selected_option: Option<String>,
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowStatus {
    Upcoming,
    Active,
    Expired,
}

impl WindowStatus {
    pub fn at(start: OffsetDateTime, end: OffsetDateTime, now: OffsetDateTime) -> Self {
        if now < start {
            Self::Upcoming
        } else if now > end {
            Self::Expired
        } else {
            Self::Active
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming",
            Self::Active => "Active",
            Self::Expired => "Expired",
        }
    }
}

/// Item of `GET /student/exams` and body of `GET /student/exam-summary/{examId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamOverview {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub institute_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

impl ExamOverview {
    pub fn status_at(&self, now: OffsetDateTime) -> WindowStatus {
        WindowStatus::at(self.start_time, self.end_time, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn start_response_accepts_minimal_payload() {
        let parsed: StartAttemptResponse = serde_json::from_value(serde_json::json!({
            "questions": [
                { "_id": "q1", "questionText": "2 + 2?", "options": { "B": "4", "A": "3" }, "marks": 2 }
            ],
            "previousAnswers": [],
            "duration": 30
        }))
        .expect("start payload");

        assert_eq!(parsed.duration, Some(30));
        assert_eq!(parsed.remaining_seconds, None);
        let question = &parsed.questions[0];
        assert_eq!(question.id, "q1");
        assert_eq!(question.question_type, None);
        assert_eq!(question.options.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn window_status_follows_start_and_end() {
        let start = datetime!(2025-03-01 09:00 UTC);
        let end = datetime!(2025-03-01 11:00 UTC);
        let at = |now| WindowStatus::at(start, end, now);
        assert_eq!(at(datetime!(2025-03-01 08:59 UTC)), WindowStatus::Upcoming);
        assert_eq!(at(datetime!(2025-03-01 09:00 UTC)), WindowStatus::Active);
        assert_eq!(at(datetime!(2025-03-01 11:00 UTC)), WindowStatus::Active);
        assert_eq!(at(datetime!(2025-03-01 11:01 UTC)), WindowStatus::Expired);
    }

    #[test]
    fn exam_overview_parses_rfc3339_window() {
        let overview: ExamOverview = serde_json::from_value(serde_json::json!({
            "_id": "e1",
            "title": "Physics midterm",
            "duration": 45,
            "startTime": "2025-03-01T09:00:00Z",
            "endTime": "2025-03-01T11:00:00.000Z"
        }))
        .expect("overview");
        assert_eq!(overview.status_at(datetime!(2025-03-01 10:00 UTC)), WindowStatus::Active);
        assert_eq!(overview.subject, None);
    }
}
