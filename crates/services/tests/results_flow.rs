//! Read-side flow: summaries, scored reports and their tallies.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use exam_core::model::{
    AttemptRef, AttemptReport, Candidate, ExamSummary, Question, QuestionId, QuestionReview,
    SectionKey, SectionReport, Selection, SessionId, SubmittedAnswer,
};
use services::{AdaptiveStep, ApiError, ExamApi, ExamContext, ResultsError, ResultsService};

//
// ─── CANNED READ-SIDE SERVICE ──────────────────────────────────────────────────
//

#[derive(Default)]
struct CannedResultsApi {
    summaries: Vec<ExamSummary>,
    report: Option<AttemptReport>,
    reject: bool,
    summary_emails: Mutex<Vec<String>>,
    attempt_requests: Mutex<Vec<(String, String, u32, String)>>,
}

impl CannedResultsApi {
    fn unused() -> ApiError {
        ApiError::Contract("not part of this test".into())
    }
}

#[async_trait]
impl ExamApi for CannedResultsApi {
    async fn start_section(
        &self,
        _context: &ExamContext,
        _section: &SectionKey,
        _resume: Option<&SessionId>,
    ) -> Result<(SessionId, Question), ApiError> {
        Err(Self::unused())
    }

    async fn submit_answer(
        &self,
        _session: &SessionId,
        _section: &SectionKey,
        _question_id: QuestionId,
        _selected: &Selection,
    ) -> Result<AdaptiveStep, ApiError> {
        Err(Self::unused())
    }

    async fn auto_submit(
        &self,
        _session: &SessionId,
        _section: &SectionKey,
    ) -> Result<(), ApiError> {
        Err(Self::unused())
    }

    async fn finish_section(
        &self,
        _session: &SessionId,
        _section: &SectionKey,
        _auto: bool,
    ) -> Result<(), ApiError> {
        Err(Self::unused())
    }

    async fn fetch_bulk_questions(
        &self,
        _context: &ExamContext,
        _path: &str,
    ) -> Result<Vec<Question>, ApiError> {
        Err(Self::unused())
    }

    async fn submit_bulk_answers(
        &self,
        _context: &ExamContext,
        _path: &str,
        _answers: &[SubmittedAnswer],
    ) -> Result<(), ApiError> {
        Err(Self::unused())
    }

    async fn fetch_summary(&self, email: &str) -> Result<Vec<ExamSummary>, ApiError> {
        if self.reject {
            return Err(ApiError::Rejected {
                message: "no purchases on record".into(),
            });
        }
        self.summary_emails.lock().unwrap().push(email.to_owned());
        Ok(self.summaries.clone())
    }

    async fn fetch_attempt(
        &self,
        exam_type: &str,
        test_name: &str,
        attempt: u32,
        email: &str,
    ) -> Result<AttemptReport, ApiError> {
        self.attempt_requests.lock().unwrap().push((
            exam_type.to_owned(),
            test_name.to_owned(),
            attempt,
            email.to_owned(),
        ));
        self.report.clone().ok_or_else(Self::unused)
    }
}

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

fn candidate() -> Candidate {
    Candidate::new("user@example.com").unwrap()
}

fn summary(exam_type: &str, test_name: &str) -> ExamSummary {
    ExamSummary {
        exam_type: exam_type.into(),
        test_name: test_name.into(),
        attempts: vec![AttemptRef {
            attempt: 1,
            status: Some("completed".into()),
            submitted_at: None,
        }],
        purchase_date: None,
    }
}

fn review(id: u64, selected: Option<Selection>, status: Option<bool>) -> QuestionReview {
    QuestionReview {
        id: QuestionId::new(id),
        text: format!("Question {id}"),
        options: vec!["A".into(), "B".into(), "C".into()],
        selected,
        correct: Some(Selection::Index(0)),
        status,
        time_taken: Some(40),
        explanation: None,
    }
}

fn scored_report() -> AttemptReport {
    AttemptReport {
        sections: vec![
            SectionReport {
                name: "Quantitative Reasoning".into(),
                total_time: Some(880),
                questions: vec![
                    review(1, Some(Selection::Index(0)), Some(true)),
                    review(2, Some(Selection::Index(2)), Some(false)),
                ],
            },
            SectionReport {
                name: "Verbal Reasoning".into(),
                total_time: Some(900),
                questions: vec![review(3, None, None)],
            },
        ],
        total_time: Some(1780),
        submitted_at: None,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn summaries_group_by_exam_type_for_the_dashboard() {
    let api = Arc::new(CannedResultsApi {
        summaries: vec![
            summary("gmat", "Mock Test 1"),
            summary("gre", "Mock Test A"),
            summary("gmat", "Mock Test 2"),
        ],
        ..CannedResultsApi::default()
    });
    let service = ResultsService::new(Arc::clone(&api) as Arc<dyn ExamApi>);

    let groups = service.fetch_summary_grouped(&candidate()).await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, "gmat");
    assert_eq!(groups[0].1.len(), 2);
    assert_eq!(groups[1].0, "gre");

    let emails = api.summary_emails.lock().unwrap().clone();
    assert_eq!(emails, ["user@example.com"]);
}

#[tokio::test]
async fn attempt_reports_come_back_with_tallies() {
    let api = Arc::new(CannedResultsApi {
        report: Some(scored_report()),
        ..CannedResultsApi::default()
    });
    let service = ResultsService::new(Arc::clone(&api) as Arc<dyn ExamApi>);

    let (report, metrics) = service
        .fetch_attempt_with_metrics(&candidate(), "gmat", "Mock Test 1", 2)
        .await
        .unwrap();

    assert_eq!(report.sections.len(), 2);
    assert_eq!(metrics.total, 3);
    assert_eq!(metrics.correct, 1);
    assert_eq!(metrics.incorrect, 1);
    assert_eq!(metrics.unattempted, 1);

    let requests = api.attempt_requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        [(
            "gmat".to_owned(),
            "Mock Test 1".to_owned(),
            2,
            "user@example.com".to_owned()
        )]
    );
}

#[tokio::test]
async fn service_rejections_surface_as_results_errors() {
    let api = Arc::new(CannedResultsApi {
        reject: true,
        ..CannedResultsApi::default()
    });
    let service = ResultsService::new(api);

    let err = service.fetch_summary(&candidate()).await.unwrap_err();
    assert!(matches!(
        err,
        ResultsError::Api(ApiError::Rejected { message }) if message.contains("no purchases")
    ));
}
