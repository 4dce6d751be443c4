//! Wire shapes of the exam service contract.
//!
//! Requests mirror what the service expects field for field; responses are
//! decoded into domain types here so the rest of the crate never sees raw
//! JSON. The question payload is a bag of optional fields whose `type` string
//! picks the kind and decides which fields must be present.

use serde::{Deserialize, Serialize};

use exam_core::model::{
    DataTable, Prompt, Question, QuestionBody, QuestionId, Selection, SourceTab, SubmittedAnswer,
};

use crate::error::ApiError;

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartSectionRequest<'a> {
    pub email: &'a str,
    pub exam_type: &'a str,
    pub test_name: &'a str,
    pub section: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_session_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitAnswerRequest<'a> {
    pub session_id: &'a str,
    pub section: &'a str,
    pub question_id: u64,
    pub selected: &'a Selection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AutoSubmitRequest<'a> {
    pub session_id: &'a str,
    pub section: &'a str,
    pub auto_submit: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinishSectionRequest<'a> {
    pub session_id: &'a str,
    pub section: &'a str,
    pub auto_submit: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BulkSubmitRequest<'a> {
    pub email: &'a str,
    pub exam_type: &'a str,
    pub test_name: &'a str,
    pub answers: &'a [SubmittedAnswer],
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartSectionResponse {
    pub session_id: String,
    pub question: QuestionDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitAnswerResponse {
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub next_question: Option<QuestionDto>,
}

/// Envelope of the bulk question fetch; `status` 1 means success and anything
/// else carries a human-readable `message`.
#[derive(Debug, Deserialize)]
pub(crate) struct BulkQuestionsResponse {
    pub status: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<QuestionDto>,
}

pub(crate) const BULK_STATUS_OK: i64 = 1;

//
// ─── QUESTION DECODING ─────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionDto {
    pub id: u64,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub passage: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub prompts: Option<Vec<PromptDto>>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub rows: Option<Vec<String>>,
    #[serde(default)]
    pub statements: Option<Vec<String>>,
    #[serde(default)]
    pub table: Option<TableDto>,
    #[serde(default)]
    pub tabs: Option<Vec<TabDto>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PromptDto {
    #[serde(default)]
    pub label: String,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TableDto {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TabDto {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl QuestionDto {
    /// Decode into the domain question, enforcing the kind contract.
    ///
    /// A missing `type` string falls back to a plain single-choice question,
    /// which is how the service sends standard quant and verbal items.
    pub(crate) fn into_question(self) -> Result<Question, ApiError> {
        let kind = self.kind.as_deref().unwrap_or("singleChoice").to_owned();
        let body = match kind.as_str() {
            "singleChoice" => QuestionBody::SingleChoice {
                options: require(self.options, &kind, "options")?,
            },
            "graphicsInterpretation" => QuestionBody::GraphicsInterpretation {
                image_url: self.image_url,
                prompts: require(self.prompts, &kind, "prompts")?
                    .into_iter()
                    .map(|prompt| Prompt::new(prompt.label, prompt.options))
                    .collect(),
            },
            "twoPartAnalysis" => QuestionBody::TwoPartAnalysis {
                columns: require(self.columns, &kind, "columns")?,
                rows: require(self.rows, &kind, "rows")?,
            },
            "dataSufficiency" => QuestionBody::DataSufficiency {
                statements: self.statements.unwrap_or_default(),
                options: require(self.options, &kind, "options")?,
            },
            "tableAnalysis" => QuestionBody::TableAnalysis {
                table: self
                    .table
                    .map(|table| DataTable {
                        headers: table.headers,
                        rows: table.rows,
                    })
                    .unwrap_or_default(),
                statements: require(self.statements, &kind, "statements")?,
            },
            "multiSourceReasoningTabs" => QuestionBody::MultiSourceReasoningTabs {
                tabs: decode_tabs(require(self.tabs, &kind, "tabs")?),
                statements: require(self.statements, &kind, "statements")?,
            },
            "multiSourceReasoningOptions" => QuestionBody::MultiSourceReasoningOptions {
                options: require(self.options, &kind, "options")?,
            },
            other => {
                return Err(ApiError::Contract(format!("unknown question type: {other}")));
            }
        };

        let question = Question::new(QuestionId::new(self.id), self.text, body)
            .map_err(|err| ApiError::Contract(err.to_string()))?;
        Ok(match self.passage {
            Some(passage) => question.with_passage(passage),
            None => question,
        })
    }
}

fn decode_tabs(tabs: Vec<TabDto>) -> Vec<SourceTab> {
    tabs.into_iter()
        .map(|tab| SourceTab::new(tab.title, tab.content))
        .collect()
}

fn require<T>(value: Option<T>, kind: &str, field: &'static str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Contract(format!("{kind} question is missing {field}")))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Question, ApiError> {
        let dto: QuestionDto = serde_json::from_str(json).unwrap();
        dto.into_question()
    }

    #[test]
    fn missing_type_decodes_as_single_choice() {
        let question = decode(r#"{"id": 7, "text": "2+2?", "options": ["3", "4"]}"#).unwrap();
        assert_eq!(question.id().value(), 7);
        assert_eq!(question.body().kind_name(), "singleChoice");
        assert_eq!(question.body().option_count(0), Some(2));
    }

    #[test]
    fn passage_rides_along_when_present() {
        let question = decode(
            r#"{"id": 1, "text": "Main idea?", "passage": "Some reading.", "options": ["A", "B"]}"#,
        )
        .unwrap();
        assert_eq!(question.passage(), Some("Some reading."));
    }

    #[test]
    fn two_part_analysis_needs_columns_and_rows() {
        let question = decode(
            r#"{
                "id": 3,
                "text": "Pick one per column",
                "type": "twoPartAnalysis",
                "columns": ["Rate", "Time"],
                "rows": ["10", "20", "30"]
            }"#,
        )
        .unwrap();
        assert_eq!(question.body().kind_name(), "twoPartAnalysis");
        assert_eq!(question.prompt_count(), 2);

        let err = decode(r#"{"id": 3, "text": "broken", "type": "twoPartAnalysis"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Contract(_)));
    }

    #[test]
    fn table_analysis_tolerates_missing_table() {
        let question = decode(
            r#"{
                "id": 4,
                "text": "True or false per row",
                "type": "tableAnalysis",
                "statements": ["s1", "s2"]
            }"#,
        )
        .unwrap();
        assert_eq!(question.prompt_count(), 2);
    }

    #[test]
    fn multi_source_tabs_decode_with_content() {
        let question = decode(
            r#"{
                "id": 5,
                "text": "Combine the sources",
                "type": "multiSourceReasoningTabs",
                "tabs": [
                    {"title": "Email 1", "content": "Hello"},
                    {"title": "Email 2", "content": "World"}
                ],
                "statements": ["s1", "s2"]
            }"#,
        )
        .unwrap();
        assert_eq!(question.body().kind_name(), "multiSourceReasoningTabs");
        assert_eq!(question.prompt_count(), 2);
    }

    #[test]
    fn multi_source_options_decode_without_tabs() {
        let question = decode(
            r#"{
                "id": 8,
                "text": "Which conclusion holds?",
                "type": "multiSourceReasoningOptions",
                "options": ["A", "B", "C"]
            }"#,
        )
        .unwrap();
        assert_eq!(question.body().kind_name(), "multiSourceReasoningOptions");
        assert_eq!(question.prompt_count(), 1);
        assert_eq!(question.body().option_count(0), Some(3));
    }

    #[test]
    fn unknown_type_is_a_contract_violation() {
        let err =
            decode(r#"{"id": 9, "text": "?", "type": "essayResponse", "options": []}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("essayResponse"), "{message}");
    }

    #[test]
    fn graphics_interpretation_accepts_image_alias() {
        let question = decode(
            r#"{
                "id": 6,
                "text": "Read the chart",
                "type": "graphicsInterpretation",
                "image": "https://cdn.example.com/chart.png",
                "prompts": [
                    {"label": "The slope is", "options": ["rising", "falling"]}
                ]
            }"#,
        )
        .unwrap();
        match question.body() {
            QuestionBody::GraphicsInterpretation { image_url, .. } => {
                assert_eq!(image_url.as_deref(), Some("https://cdn.example.com/chart.png"));
            }
            other => panic!("wrong body: {other:?}"),
        }
    }

    #[test]
    fn start_request_omits_resume_id_when_absent() {
        let fresh = StartSectionRequest {
            email: "a@b.com",
            exam_type: "gmat",
            test_name: "Mock Test 1",
            section: "quant",
            resume_session_id: None,
        };
        let json = serde_json::to_value(&fresh).unwrap();
        assert!(json.get("resumeSessionId").is_none());
        assert_eq!(json["examType"], "gmat");

        let resumed = StartSectionRequest {
            resume_session_id: Some("sess-42"),
            ..fresh
        };
        let json = serde_json::to_value(&resumed).unwrap();
        assert_eq!(json["resumeSessionId"], "sess-42");
    }

    #[test]
    fn auto_submit_request_carries_the_flag() {
        let request = AutoSubmitRequest {
            session_id: "sess-1",
            section: "quant",
            auto_submit: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["autoSubmit"], true);
        assert_eq!(json["sessionId"], "sess-1");
    }

    #[test]
    fn bulk_envelope_decodes_failure_message() {
        let body: BulkQuestionsResponse =
            serde_json::from_str(r#"{"status": 0, "message": "no questions uploaded"}"#).unwrap();
        assert_ne!(body.status, BULK_STATUS_OK);
        assert_eq!(body.message.as_deref(), Some("no questions uploaded"));
        assert!(body.data.is_empty());
    }
}
