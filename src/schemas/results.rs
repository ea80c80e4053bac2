use serde::Deserialize;

/// Minimum percentage counted as a pass.
pub const PASS_PERCENT: f64 = 40.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultDto {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "examId")]
    pub exam: ResultExamRef,
    pub obtained_marks: f64,
    pub total_marks: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultExamRef {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl ExamResultDto {
    /// Rounded percentage; an exam worth zero marks scores zero.
    pub fn percentage(&self) -> u32 {
        if self.total_marks <= 0.0 {
            return 0;
        }
        ((self.obtained_marks / self.total_marks) * 100.0).round().max(0.0) as u32
    }

    pub fn verdict(&self) -> Verdict {
        let passed = self.total_marks > 0.0
            && self.obtained_marks / self.total_marks * 100.0 >= PASS_PERCENT;
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(obtained: f64, total: f64) -> ExamResultDto {
        ExamResultDto {
            id: "r1".to_string(),
            exam: ResultExamRef { title: "Chemistry".to_string() },
            obtained_marks: obtained,
            total_marks: total,
        }
    }

    #[test]
    fn forty_percent_passes() {
        assert_eq!(result(4.0, 10.0).verdict(), Verdict::Pass);
        assert_eq!(result(3.9, 10.0).verdict(), Verdict::Fail);
        assert_eq!(result(2.0, 3.0).percentage(), 67);
    }

    #[test]
    fn zero_total_is_a_fail_not_a_panic() {
        assert_eq!(result(0.0, 0.0).percentage(), 0);
        assert_eq!(result(0.0, 0.0).verdict(), Verdict::Fail);
    }

    #[test]
    fn parses_populated_exam_reference() {
        let parsed: ExamResultDto = serde_json::from_value(serde_json::json!({
            "_id": "r9",
            "examId": { "_id": "e1", "title": "Biology" },
            "obtainedMarks": 7,
            "totalMarks": 10
        }))
        .expect("result");
        assert_eq!(parsed.exam.title, "Biology");
        assert_eq!(parsed.percentage(), 70);
    }
}
