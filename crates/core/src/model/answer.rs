use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::QuestionId;
use crate::model::question::Question;

/// Selected options for one question, keyed by prompt index.
///
/// Single-answer questions use prompt `0`; composite questions carry one entry
/// per answered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerRecord {
    selections: BTreeMap<usize, usize>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the selection for one prompt, replacing any previous choice for
    /// that prompt and leaving sibling prompts untouched.
    pub fn set(&mut self, prompt: usize, option: usize) {
        self.selections.insert(prompt, option);
    }

    #[must_use]
    pub fn selection(&self, prompt: usize) -> Option<usize> {
        self.selections.get(&prompt).copied()
    }

    #[must_use]
    pub fn answered_prompts(&self) -> usize {
        self.selections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Iterates `(prompt, option)` pairs in ascending prompt order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.selections.iter().map(|(p, o)| (*p, *o))
    }
}

/// A recorded selection as submitted to the exam service: a bare option index
/// for single-answer questions, one index per prompt for composites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Index(usize),
    Many(Vec<usize>),
}

impl Selection {
    /// Build the wire selection for a record, shaped by whether the question
    /// is composite. Returns `None` for an empty record.
    #[must_use]
    pub fn from_record(record: &AnswerRecord, composite: bool) -> Option<Self> {
        if record.is_empty() {
            return None;
        }
        if composite {
            Some(Selection::Many(
                record.iter().map(|(_, option)| option).collect(),
            ))
        } else {
            record.selection(0).map(Selection::Index)
        }
    }
}

/// The wire shape of one answered question in a submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected: Selection,
}

//
// ─── ANSWER SHEET ──────────────────────────────────────────────────────────────
//

/// Per-question answers captured during the active section.
///
/// Recording merges into existing records so composite questions can be
/// answered one prompt at a time without losing sibling selections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerSheet {
    entries: BTreeMap<QuestionId, AnswerRecord>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one selection into the sheet.
    pub fn record(&mut self, question_id: QuestionId, prompt: usize, option: usize) {
        self.entries.entry(question_id).or_default().set(prompt, option);
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&AnswerRecord> {
        self.entries.get(&question_id)
    }

    /// Reinstate a cached record, used when resuming a crashed section.
    pub fn restore(&mut self, question_id: QuestionId, record: AnswerRecord) {
        self.entries.insert(question_id, record);
    }

    /// Number of questions with at least one recorded selection.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every recorded answer. Called only after a confirmed submission.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns true when every prompt of `question` has a selection.
    #[must_use]
    pub fn is_complete_for(&self, question: &Question) -> bool {
        self.get(question.id())
            .is_some_and(|record| question.is_complete(record))
    }

    /// The wire selection for `question`, if anything was recorded.
    #[must_use]
    pub fn selection_for(&self, question: &Question) -> Option<Selection> {
        self.get(question.id())
            .and_then(|record| Selection::from_record(record, question.is_composite()))
    }

    /// Flatten the sheet into one submission entry per answered question,
    /// ordered by the given question sequence.
    #[must_use]
    pub fn to_submission_payload(&self, questions: &[Question]) -> Vec<SubmittedAnswer> {
        questions
            .iter()
            .filter_map(|question| {
                self.selection_for(question).map(|selected| SubmittedAnswer {
                    question_id: question.id(),
                    selected,
                })
            })
            .collect()
    }

    /// Iterates records in ascending question-id order.
    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &AnswerRecord)> + '_ {
        self.entries.iter().map(|(id, record)| (*id, record))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
