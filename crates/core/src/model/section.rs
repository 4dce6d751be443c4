use thiserror::Error;

use crate::model::ids::SectionKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("an exam plan needs at least one section")]
    EmptySections,

    #[error("section {key} has a zero duration")]
    ZeroDuration { key: String },

    #[error("section key {key} appears more than once")]
    DuplicateKey { key: String },
}

/// How a section's questions reach the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryProtocol {
    /// Server-driven, one question at a time. Each answer is a round trip that
    /// returns either the next question or a finished signal.
    Adaptive,
    /// The full question list is fetched up front from the given endpoint path
    /// segment, and one submission at the end carries every answer.
    Bulk { path: String },
}

/// One timed, independently scored portion of an exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPlan {
    key: SectionKey,
    title: String,
    duration_seconds: u32,
    delivery: DeliveryProtocol,
    finish_on_complete: bool,
}

impl SectionPlan {
    /// # Errors
    ///
    /// Returns `PlanError::ZeroDuration` when the section would expire
    /// immediately.
    pub fn new(
        key: SectionKey,
        title: impl Into<String>,
        duration_seconds: u32,
        delivery: DeliveryProtocol,
    ) -> Result<Self, PlanError> {
        if duration_seconds == 0 {
            return Err(PlanError::ZeroDuration {
                key: key.as_str().to_owned(),
            });
        }
        Ok(Self {
            key,
            title: title.into(),
            duration_seconds,
            delivery,
            finish_on_complete: false,
        })
    }

    /// Request an explicit finish call once the last adaptive answer is in.
    #[must_use]
    pub fn with_finish_on_complete(mut self, finish: bool) -> Self {
        self.finish_on_complete = finish;
        self
    }

    #[must_use]
    pub fn key(&self) -> &SectionKey {
        &self.key
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    #[must_use]
    pub fn delivery(&self) -> &DeliveryProtocol {
        &self.delivery
    }

    #[must_use]
    pub fn finish_on_complete(&self) -> bool {
        self.finish_on_complete
    }

    #[must_use]
    pub fn is_bulk(&self) -> bool {
        matches!(self.delivery, DeliveryProtocol::Bulk { .. })
    }
}

//
// ─── EXAM PLAN ─────────────────────────────────────────────────────────────────
//

/// Seconds of instruction time before each section auto-begins.
const PRESTART_SECONDS: u32 = 60;

/// Section length of the stock mock exam.
const MOCK_SECTION_SECONDS: u32 = 15 * 60;

/// The fixed, ordered sequence of sections for one exam attempt.
///
/// The order is set at construction and never changes; the orchestrator walks
/// it strictly forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamPlan {
    exam_type: String,
    test_name: String,
    prestart_seconds: u32,
    sections: Vec<SectionPlan>,
}

impl ExamPlan {
    /// # Errors
    ///
    /// Returns `PlanError::EmptySections` for an empty plan and
    /// `PlanError::DuplicateKey` when two sections share a key.
    pub fn new(
        exam_type: impl Into<String>,
        test_name: impl Into<String>,
        sections: Vec<SectionPlan>,
    ) -> Result<Self, PlanError> {
        if sections.is_empty() {
            return Err(PlanError::EmptySections);
        }
        for (i, section) in sections.iter().enumerate() {
            if sections[..i].iter().any(|other| other.key == section.key) {
                return Err(PlanError::DuplicateKey {
                    key: section.key.as_str().to_owned(),
                });
            }
        }
        Ok(Self {
            exam_type: exam_type.into(),
            test_name: test_name.into(),
            prestart_seconds: PRESTART_SECONDS,
            sections,
        })
    }

    /// Override the instruction-phase countdown length.
    #[must_use]
    pub fn with_prestart_seconds(mut self, seconds: u32) -> Self {
        self.prestart_seconds = seconds;
        self
    }

    /// The stock three-section mock: adaptive quantitative and verbal
    /// reasoning, then bulk data insights, fifteen minutes each.
    #[must_use]
    pub fn gmat_mock(exam_type: impl Into<String>, test_name: impl Into<String>) -> Self {
        let sections = vec![
            SectionPlan {
                key: SectionKey::new("quant"),
                title: "Quantitative Reasoning".into(),
                duration_seconds: MOCK_SECTION_SECONDS,
                delivery: DeliveryProtocol::Adaptive,
                finish_on_complete: false,
            },
            SectionPlan {
                key: SectionKey::new("verbal"),
                title: "Verbal Reasoning".into(),
                duration_seconds: MOCK_SECTION_SECONDS,
                delivery: DeliveryProtocol::Adaptive,
                finish_on_complete: true,
            },
            SectionPlan {
                key: SectionKey::new("datainsights"),
                title: "Data Insights".into(),
                duration_seconds: MOCK_SECTION_SECONDS,
                delivery: DeliveryProtocol::Bulk {
                    path: "data-insights".into(),
                },
                finish_on_complete: false,
            },
        ];
        Self {
            exam_type: exam_type.into(),
            test_name: test_name.into(),
            prestart_seconds: PRESTART_SECONDS,
            sections,
        }
    }

    #[must_use]
    pub fn exam_type(&self) -> &str {
        &self.exam_type
    }

    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    #[must_use]
    pub fn prestart_seconds(&self) -> u32 {
        self.prestart_seconds
    }

    #[must_use]
    pub fn sections(&self) -> &[SectionPlan] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&SectionPlan> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
