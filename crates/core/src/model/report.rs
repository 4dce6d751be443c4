use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::answer::Selection;
use crate::model::ids::QuestionId;

/// One purchased test with its recorded attempts, as listed by the results
/// summary endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub exam_type: String,
    pub test_name: String,
    /// Attempts recorded against this test, in the order they were made.
    #[serde(default)]
    pub attempts: Vec<AttemptRef>,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
}

impl ExamSummary {
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

/// One recorded attempt within a summary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRef {
    /// Attempt number, used to look up the full report.
    pub attempt: u32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl AttemptRef {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("completed")
    }
}

/// Full detail of one scored attempt, section by section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    #[serde(default)]
    pub sections: Vec<SectionReport>,
    /// Total seconds spent across the attempt.
    #[serde(default)]
    pub total_time: Option<u32>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReport {
    pub name: String,
    /// Seconds spent in this section.
    #[serde(default)]
    pub total_time: Option<u32>,
    #[serde(default)]
    pub questions: Vec<QuestionReview>,
}

/// Per-question review row: what was asked, what was picked, what was right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub id: QuestionId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// Absent when the question was never attempted.
    #[serde(default)]
    pub selected: Option<Selection>,
    #[serde(default)]
    pub correct: Option<Selection>,
    /// True when the selection was scored correct.
    #[serde(default)]
    pub status: Option<bool>,
    /// Seconds spent on this question.
    #[serde(default)]
    pub time_taken: Option<u32>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuestionReview {
    #[must_use]
    pub fn is_attempted(&self) -> bool {
        self.selected.is_some()
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.status == Some(true)
    }
}

//
// ─── METRICS ───────────────────────────────────────────────────────────────────
//

/// Aggregated answer counts for a scored attempt or a single section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportMetrics {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub unattempted: u32,
}

impl ReportMetrics {
    #[must_use]
    pub fn for_report(report: &AttemptReport) -> Self {
        let mut metrics = Self::default();
        for section in &report.sections {
            for question in &section.questions {
                metrics.tally(question);
            }
        }
        metrics
    }

    #[must_use]
    pub fn for_section(section: &SectionReport) -> Self {
        let mut metrics = Self::default();
        for question in &section.questions {
            metrics.tally(question);
        }
        metrics
    }

    fn tally(&mut self, question: &QuestionReview) {
        self.total += 1;
        if !question.is_attempted() {
            self.unattempted += 1;
        } else if question.is_correct() {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    /// Share of correct answers among all questions, as a percentage.
    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) * 100.0 / f64::from(self.total)
    }
}

/// Groups summary entries by exam type, preserving first-seen order.
///
/// This is the shape the activity dashboard renders: one heading per exam
/// type, each listing its purchased tests.
#[must_use]
pub fn group_by_exam_type(summaries: Vec<ExamSummary>) -> Vec<(String, Vec<ExamSummary>)> {
    let mut groups: Vec<(String, Vec<ExamSummary>)> = Vec::new();
    for summary in summaries {
        match groups.iter_mut().find(|(t, _)| *t == summary.exam_type) {
            Some((_, list)) => list.push(summary),
            None => groups.push((summary.exam_type.clone(), vec![summary])),
        }
    }
    groups
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: u64, selected: Option<Selection>, status: Option<bool>) -> QuestionReview {
        QuestionReview {
            id: QuestionId::new(id),
            text: format!("Question {id}"),
            options: vec!["A".into(), "B".into()],
            selected,
            correct: Some(Selection::Index(0)),
            status,
            time_taken: Some(30),
            explanation: None,
        }
    }

    fn attempt(number: u32) -> AttemptRef {
        AttemptRef {
            attempt: number,
            status: Some("completed".into()),
            submitted_at: None,
        }
    }

    fn summary(exam_type: &str, test_name: &str) -> ExamSummary {
        ExamSummary {
            exam_type: exam_type.into(),
            test_name: test_name.into(),
            attempts: vec![attempt(1), attempt(2)],
            purchase_date: None,
        }
    }

    #[test]
    fn metrics_split_attempted_and_correct() {
        let report = AttemptReport {
            sections: vec![SectionReport {
                name: "Quantitative Reasoning".into(),
                total_time: Some(900),
                questions: vec![
                    review(1, Some(Selection::Index(0)), Some(true)),
                    review(2, Some(Selection::Index(1)), Some(false)),
                    review(3, None, None),
                ],
            }],
            total_time: Some(900),
            submitted_at: None,
        };

        let metrics = ReportMetrics::for_report(&report);
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.correct, 1);
        assert_eq!(metrics.incorrect, 1);
        assert_eq!(metrics.unattempted, 1);
        assert!((metrics.accuracy_percent() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_metrics_have_zero_accuracy() {
        let metrics = ReportMetrics::default();
        assert!((metrics.accuracy_percent() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let groups = group_by_exam_type(vec![
            summary("gmat", "Mock 1"),
            summary("gre", "Mock A"),
            summary("gmat", "Mock 2"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "gmat");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "gre");
        assert_eq!(groups[1].1[0].test_name, "Mock A");
    }

    #[test]
    fn summary_decodes_attempts_as_objects() {
        let json = r#"{
            "examType": "gmat",
            "testName": "Mock Test 1",
            "attempts": [
                {"attempt": 1, "status": "completed", "submittedAt": "2026-01-10T09:30:00Z"},
                {"attempt": 2, "status": "pending"}
            ],
            "purchaseDate": "2026-01-02T00:00:00Z"
        }"#;

        let parsed: ExamSummary = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.attempt_count(), 2);
        assert_eq!(parsed.attempts[0].attempt, 1);
        assert!(parsed.attempts[0].is_completed());
        assert!(parsed.attempts[0].submitted_at.is_some());
        assert!(!parsed.attempts[1].is_completed());
        assert_eq!(parsed.attempts[1].submitted_at, None);
        assert!(parsed.purchase_date.is_some());
    }

    #[test]
    fn review_decodes_camel_case_wire_fields() {
        let json = r#"{
            "id": 7,
            "text": "Pick one",
            "options": ["A", "B"],
            "selected": 1,
            "correct": 0,
            "status": false,
            "timeTaken": 45,
            "explanation": "B is a trap"
        }"#;

        let parsed: QuestionReview = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, QuestionId::new(7));
        assert_eq!(parsed.selected, Some(Selection::Index(1)));
        assert_eq!(parsed.time_taken, Some(45));
        assert!(parsed.is_attempted());
        assert!(!parsed.is_correct());
    }

    #[test]
    fn review_tolerates_missing_optional_fields() {
        let parsed: QuestionReview = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert!(!parsed.is_attempted());
        assert_eq!(parsed.options.len(), 0);
        assert_eq!(parsed.time_taken, None);
    }
}
