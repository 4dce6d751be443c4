use std::sync::Arc;

use exam_core::model::{AttemptReport, Candidate, ExamSummary, ReportMetrics, group_by_exam_type};

use crate::api::ExamApi;
use crate::error::ResultsError;

/// Read side of the exam service: summaries and scored attempt reports.
///
/// The service is a thin fetch layer; scoring happens server-side and the
/// payloads come back ready to render. Tallies for the review screen are
/// computed locally with [`ReportMetrics`].
#[derive(Clone)]
pub struct ResultsService {
    api: Arc<dyn ExamApi>,
}

impl ResultsService {
    #[must_use]
    pub fn new(api: Arc<dyn ExamApi>) -> Self {
        Self { api }
    }

    /// Fetch the candidate's attempt summary across tests.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError` when the fetch fails.
    pub async fn fetch_summary(
        &self,
        candidate: &Candidate,
    ) -> Result<Vec<ExamSummary>, ResultsError> {
        Ok(self.api.fetch_summary(candidate.email()).await?)
    }

    /// The summary grouped by exam type, for the activity dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError` when the fetch fails.
    pub async fn fetch_summary_grouped(
        &self,
        candidate: &Candidate,
    ) -> Result<Vec<(String, Vec<ExamSummary>)>, ResultsError> {
        let summaries = self.fetch_summary(candidate).await?;
        Ok(group_by_exam_type(summaries))
    }

    /// Fetch the scored report of one finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError` when the fetch fails.
    pub async fn fetch_attempt(
        &self,
        candidate: &Candidate,
        exam_type: &str,
        test_name: &str,
        attempt: u32,
    ) -> Result<AttemptReport, ResultsError> {
        Ok(self
            .api
            .fetch_attempt(exam_type, test_name, attempt, candidate.email())
            .await?)
    }

    /// Fetch one attempt's report along with its computed tallies.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError` when the fetch fails.
    pub async fn fetch_attempt_with_metrics(
        &self,
        candidate: &Candidate,
        exam_type: &str,
        test_name: &str,
        attempt: u32,
    ) -> Result<(AttemptReport, ReportMetrics), ResultsError> {
        let report = self
            .fetch_attempt(candidate, exam_type, test_name, attempt)
            .await?;
        let metrics = ReportMetrics::for_report(&report);
        Ok((report, metrics))
    }
}
