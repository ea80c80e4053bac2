use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::schemas::exam::{PreviousAnswerDto, QuestionDto};
use crate::schemas::submission::{SubmitAttemptRequest, SubmittedAnswerDto};

pub type QuestionId = String;

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    MultipleChoice { options: BTreeMap<String, String> },
    ShortText,
    LongText,
    FileUpload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Choice,
    Text,
    File,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    pub position: u32,
    pub max_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    /// Selected option key, e.g. `"B"`.
    Choice(String),
    Text(String),
    /// Reference to an uploaded file.
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnsupportedQuestionType(pub(crate) String);

impl QuestionKind {
    pub fn answer_kind(&self) -> AnswerKind {
        match self {
            Self::MultipleChoice { .. } => AnswerKind::Choice,
            Self::ShortText | Self::LongText => AnswerKind::Text,
            Self::FileUpload => AnswerKind::File,
        }
    }

    /// Whether answers of this kind are sent for scoring.
    pub fn is_submittable(&self) -> bool {
        !matches!(self, Self::FileUpload)
    }

    fn from_wire(
        question_type: Option<&str>,
        options: BTreeMap<String, String>,
    ) -> Result<Self, UnsupportedQuestionType> {
        match question_type.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("mcq") => Ok(Self::MultipleChoice { options }),
            Some("short") => Ok(Self::ShortText),
            Some("long") => Ok(Self::LongText),
            Some("file") => Ok(Self::FileUpload),
            Some(other) => Err(UnsupportedQuestionType(other.to_string())),
        }
    }
}

impl AnswerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Choice => "choice",
            Self::Text => "text",
            Self::File => "file",
        }
    }
}

impl fmt::Display for AnswerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Question {
    pub(crate) fn from_dto(
        index: usize,
        dto: QuestionDto,
    ) -> Result<Self, UnsupportedQuestionType> {
        let kind = QuestionKind::from_wire(dto.question_type.as_deref(), dto.options)?;
        Ok(Self {
            id: dto.id,
            text: dto.question_text,
            kind,
            position: dto.position.unwrap_or(index as u32),
            max_marks: dto.marks.unwrap_or(1.0),
        })
    }
}

impl AnswerValue {
    pub fn kind(&self) -> AnswerKind {
        match self {
            Self::Choice(_) => AnswerKind::Choice,
            Self::Text(_) => AnswerKind::Text,
            Self::File(_) => AnswerKind::File,
        }
    }

    /// Rebuilds a persisted answer in the shape its question expects. Blank values mean the
    /// question was never answered.
    pub(crate) fn restore(question: &Question, dto: &PreviousAnswerDto) -> Option<Self> {
        let non_blank = |value: &Option<String>| {
            value.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
        };

        match question.kind.answer_kind() {
            AnswerKind::Choice => non_blank(&dto.selected_option).map(Self::Choice),
            AnswerKind::Text => non_blank(&dto.answer_text)
                .or_else(|| non_blank(&dto.selected_option))
                .map(Self::Text),
            AnswerKind::File => non_blank(&dto.file_url)
                .or_else(|| non_blank(&dto.selected_option))
                .map(Self::File),
        }
    }

    fn to_submitted(&self, question_id: &str) -> Option<SubmittedAnswerDto> {
        match self {
            Self::Choice(option) => Some(SubmittedAnswerDto {
                question_id: question_id.to_string(),
                selected_option: Some(option.clone()),
                answer_text: None,
            }),
            Self::Text(text) => Some(SubmittedAnswerDto {
                question_id: question_id.to_string(),
                selected_option: None,
                answer_text: Some(text.clone()),
            }),
            Self::File(_) => None,
        }
    }
}

/// Payload plus the ids of answered file questions left out of it.
pub(crate) struct SubmissionDraft {
    pub(crate) request: SubmitAttemptRequest,
    pub(crate) excluded: Vec<QuestionId>,
}

pub(crate) fn build_submission(
    questions: &[Question],
    answers: &HashMap<QuestionId, AnswerValue>,
) -> SubmissionDraft {
    let mut request = SubmitAttemptRequest::default();
    let mut excluded = Vec::new();

    for question in questions {
        let Some(answer) = answers.get(&question.id) else {
            continue;
        };
        match answer.to_submitted(&question.id) {
            Some(dto) if question.kind.is_submittable() => request.answers.push(dto),
            _ => excluded.push(question.id.clone()),
        }
    }

    SubmissionDraft { request, excluded }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, question_type: Option<&str>) -> Question {
        Question::from_dto(
            0,
            QuestionDto {
                id: id.to_string(),
                question_text: format!("Question {id}"),
                question_type: question_type.map(str::to_string),
                ..QuestionDto::default()
            },
        )
        .expect("question")
    }

    #[test]
    fn missing_type_means_multiple_choice() {
        let q = question("q1", None);
        assert_eq!(q.kind.answer_kind(), AnswerKind::Choice);
        assert_eq!(q.max_marks, 1.0);
        assert_eq!(question("q2", Some("LONG")).kind, QuestionKind::LongText);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = Question::from_dto(
            0,
            QuestionDto {
                id: "q1".into(),
                question_type: Some("essay".into()),
                ..QuestionDto::default()
            },
        )
        .expect_err("essay");
        assert_eq!(err, UnsupportedQuestionType("essay".to_string()));
    }

    #[test]
    fn restore_drops_blank_answers() {
        let q = question("q1", None);
        let blank = PreviousAnswerDto {
            question_id: "q1".into(),
            selected_option: Some("  ".into()),
            ..PreviousAnswerDto::default()
        };
        assert_eq!(AnswerValue::restore(&q, &blank), None);

        let chosen = PreviousAnswerDto {
            question_id: "q1".into(),
            selected_option: Some("B".into()),
            ..PreviousAnswerDto::default()
        };
        assert_eq!(AnswerValue::restore(&q, &chosen), Some(AnswerValue::Choice("B".into())));
    }

    #[test]
    fn restore_reads_text_from_either_field() {
        let q = question("q1", Some("short"));
        let legacy = PreviousAnswerDto {
            question_id: "q1".into(),
            selected_option: Some("photosynthesis".into()),
            ..PreviousAnswerDto::default()
        };
        assert_eq!(
            AnswerValue::restore(&q, &legacy),
            Some(AnswerValue::Text("photosynthesis".into()))
        );
    }

    #[test]
    fn submission_follows_question_order_and_skips_files() {
        let questions =
            vec![question("q1", None), question("q2", Some("file")), question("q3", Some("long"))];
        let answers = HashMap::from([
            ("q3".to_string(), AnswerValue::Text("essay".into())),
            ("q2".to_string(), AnswerValue::File("uploads/q2.pdf".into())),
            ("q1".to_string(), AnswerValue::Choice("A".into())),
        ]);

        let draft = build_submission(&questions, &answers);
        let ids: Vec<_> = draft.request.answers.iter().map(|a| a.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
        assert_eq!(draft.excluded, vec!["q2".to_string()]);
        assert_eq!(draft.request.answers[1].answer_text.as_deref(), Some("essay"));
    }
}
