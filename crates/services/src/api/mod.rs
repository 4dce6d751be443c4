//! Client for the adaptive exam service.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use exam_core::model::{
    AttemptReport, Candidate, ExamPlan, ExamSummary, Question, QuestionId, SectionKey, Selection,
    SessionId, SubmittedAnswer,
};

use crate::error::ApiError;

mod wire;

use wire::{
    AutoSubmitRequest, BULK_STATUS_OK, BulkQuestionsResponse, BulkSubmitRequest,
    FinishSectionRequest, StartSectionRequest, StartSectionResponse, SubmitAnswerRequest,
    SubmitAnswerResponse,
};

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct ExamApiConfig {
    pub base_url: String,
}

impl ExamApiConfig {
    /// Read the base URL from `EXAM_API_BASE_URL`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("EXAM_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self { base_url })
    }

    /// Build a config from an explicit base URL, validating it up front.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Contract` when the URL does not parse.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)
            .map_err(|err| ApiError::Contract(format!("invalid base url: {err}")))?;
        Ok(Self {
            base_url: parsed.to_string(),
        })
    }
}

//
// ─── CLIENT SURFACE ────────────────────────────────────────────────────────────
//

/// Candidate identity and exam coordinates sent with every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamContext {
    pub email: String,
    pub exam_type: String,
    pub test_name: String,
}

impl ExamContext {
    #[must_use]
    pub fn new(candidate: &Candidate, plan: &ExamPlan) -> Self {
        Self {
            email: candidate.email().to_owned(),
            exam_type: plan.exam_type().to_owned(),
            test_name: plan.test_name().to_owned(),
        }
    }
}

/// What the service decided after an adaptive answer.
#[derive(Debug, Clone)]
pub enum AdaptiveStep {
    /// The next question to display.
    Next(Question),
    /// The section ran out of questions; the run is over.
    Finished,
}

/// Client surface of the exam service.
///
/// One implementation speaks HTTP; tests substitute their own. Every method
/// returns [`ApiError`] when the transport fails, the service rejects the
/// call, or the response violates the wire contract.
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// Start (or resume) an adaptive section and get its first question.
    async fn start_section(
        &self,
        context: &ExamContext,
        section: &SectionKey,
        resume: Option<&SessionId>,
    ) -> Result<(SessionId, Question), ApiError>;

    /// Submit one adaptive answer; the service picks what happens next.
    async fn submit_answer(
        &self,
        session: &SessionId,
        section: &SectionKey,
        question_id: QuestionId,
        selected: &Selection,
    ) -> Result<AdaptiveStep, ApiError>;

    /// Close an adaptive section on timeout without an answer payload.
    async fn auto_submit(
        &self,
        session: &SessionId,
        section: &SectionKey,
    ) -> Result<(), ApiError>;

    /// Tell the service an adaptive section is done.
    async fn finish_section(
        &self,
        session: &SessionId,
        section: &SectionKey,
        auto: bool,
    ) -> Result<(), ApiError>;

    /// Fetch the full question set of a bulk section.
    async fn fetch_bulk_questions(
        &self,
        context: &ExamContext,
        path: &str,
    ) -> Result<Vec<Question>, ApiError>;

    /// Submit a bulk section's answers in one call.
    async fn submit_bulk_answers(
        &self,
        context: &ExamContext,
        path: &str,
        answers: &[SubmittedAnswer],
    ) -> Result<(), ApiError>;

    /// Fetch the candidate's attempt summary across tests.
    async fn fetch_summary(&self, email: &str) -> Result<Vec<ExamSummary>, ApiError>;

    /// Fetch the scored report of one finished attempt.
    async fn fetch_attempt(
        &self,
        exam_type: &str,
        test_name: &str,
        attempt: u32,
        email: &str,
    ) -> Result<AttemptReport, ApiError>;
}

//
// ─── HTTP IMPLEMENTATION ───────────────────────────────────────────────────────
//

/// `ExamApi` over HTTP with a shared connection pool.
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    config: ExamApiConfig,
}

impl HttpExamApi {
    #[must_use]
    pub fn new(config: ExamApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Build a client from the environment, if a base URL is configured.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        ExamApiConfig::from_env().map(Self::new)
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    ///
    /// Test names carry spaces, so plain string concatenation is not enough.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|err| ApiError::Contract(format!("invalid base url: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Contract("base url cannot hold path segments".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if !response.status().is_success() {
        return Err(ApiError::HttpStatus(response.status()));
    }
    Ok(response)
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn start_section(
        &self,
        context: &ExamContext,
        section: &SectionKey,
        resume: Option<&SessionId>,
    ) -> Result<(SessionId, Question), ApiError> {
        let url = self.endpoint(&["exam", "adaptive", "start"])?;
        let payload = StartSectionRequest {
            email: &context.email,
            exam_type: &context.exam_type,
            test_name: &context.test_name,
            section: section.as_str(),
            resume_session_id: resume.map(SessionId::as_str),
        };
        let response = self.client.post(url).json(&payload).send().await?;
        let body: StartSectionResponse = ensure_success(response)?.json().await?;

        let session_id = body
            .session_id
            .parse::<SessionId>()
            .map_err(|err| ApiError::Contract(err.to_string()))?;
        Ok((session_id, body.question.into_question()?))
    }

    async fn submit_answer(
        &self,
        session: &SessionId,
        section: &SectionKey,
        question_id: QuestionId,
        selected: &Selection,
    ) -> Result<AdaptiveStep, ApiError> {
        let url = self.endpoint(&["exam", "adaptive", "submit"])?;
        let payload = SubmitAnswerRequest {
            session_id: session.as_str(),
            section: section.as_str(),
            question_id: question_id.value(),
            selected,
        };
        let response = self.client.post(url).json(&payload).send().await?;
        let body: SubmitAnswerResponse = ensure_success(response)?.json().await?;

        if body.finished {
            return Ok(AdaptiveStep::Finished);
        }
        match body.next_question {
            Some(question) => Ok(AdaptiveStep::Next(question.into_question()?)),
            None => Err(ApiError::Contract(
                "submit response had neither a next question nor the finished flag".into(),
            )),
        }
    }

    async fn auto_submit(
        &self,
        session: &SessionId,
        section: &SectionKey,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["exam", "adaptive", "submit"])?;
        let payload = AutoSubmitRequest {
            session_id: session.as_str(),
            section: section.as_str(),
            auto_submit: true,
        };
        let response = self.client.post(url).json(&payload).send().await?;
        ensure_success(response)?;
        Ok(())
    }

    async fn finish_section(
        &self,
        session: &SessionId,
        section: &SectionKey,
        auto: bool,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["exam", "adaptive", "finish"])?;
        let payload = FinishSectionRequest {
            session_id: session.as_str(),
            section: section.as_str(),
            auto_submit: auto,
        };
        let response = self.client.post(url).json(&payload).send().await?;
        ensure_success(response)?;
        Ok(())
    }

    async fn fetch_bulk_questions(
        &self,
        context: &ExamContext,
        path: &str,
    ) -> Result<Vec<Question>, ApiError> {
        let url = self.endpoint(&["exam", "adaptive", path])?;
        let response = self
            .client
            .get(url)
            .query(&[
                ("email", context.email.as_str()),
                ("examType", context.exam_type.as_str()),
                ("testName", context.test_name.as_str()),
            ])
            .send()
            .await?;
        let body: BulkQuestionsResponse = ensure_success(response)?.json().await?;

        if body.status != BULK_STATUS_OK {
            return Err(ApiError::Rejected {
                message: body
                    .message
                    .unwrap_or_else(|| "bulk question fetch failed".to_owned()),
            });
        }
        body.data
            .into_iter()
            .map(wire::QuestionDto::into_question)
            .collect()
    }

    async fn submit_bulk_answers(
        &self,
        context: &ExamContext,
        path: &str,
        answers: &[SubmittedAnswer],
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["exam", "adaptive", path, "submit"])?;
        let payload = BulkSubmitRequest {
            email: &context.email,
            exam_type: &context.exam_type,
            test_name: &context.test_name,
            answers,
        };
        let response = self.client.post(url).json(&payload).send().await?;
        ensure_success(response)?;
        Ok(())
    }

    async fn fetch_summary(&self, email: &str) -> Result<Vec<ExamSummary>, ApiError> {
        let url = self.endpoint(&["exam", "results", "summary", email])?;
        let response = self.client.get(url).send().await?;
        Ok(ensure_success(response)?.json().await?)
    }

    async fn fetch_attempt(
        &self,
        exam_type: &str,
        test_name: &str,
        attempt: u32,
        email: &str,
    ) -> Result<AttemptReport, ApiError> {
        let attempt = attempt.to_string();
        let url = self.endpoint(&["exam", "results", exam_type, test_name, &attempt])?;
        let response = self.client.get(url).query(&[("email", email)]).send().await?;
        Ok(ensure_success(response)?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_api(base: &str) -> HttpExamApi {
        HttpExamApi::new(ExamApiConfig {
            base_url: base.to_owned(),
        })
    }

    #[test]
    fn endpoint_joins_and_encodes_segments() {
        let api = build_api("https://exam.example.com/api");
        let url = api
            .endpoint(&["exam", "results", "gmat", "Mock Test 1", "2"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://exam.example.com/api/exam/results/gmat/Mock%20Test%201/2"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let api = build_api("https://exam.example.com/api/");
        let url = api.endpoint(&["exam", "adaptive", "start"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://exam.example.com/api/exam/adaptive/start"
        );
    }

    #[test]
    fn config_rejects_garbage_urls() {
        let err = ExamApiConfig::new("not a url").unwrap_err();
        assert!(matches!(err, ApiError::Contract(_)));
    }
}
