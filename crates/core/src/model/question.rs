use thiserror::Error;

use crate::model::answer::AnswerRecord;
use crate::model::ids::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("{kind} question has no answerable prompts")]
    NoPrompts { kind: &'static str },

    #[error("prompt {prompt} of {kind} question has no selectable options")]
    EmptyPrompt { kind: &'static str, prompt: usize },
}

/// One independently answered sub-prompt of a composite question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub label: String,
    pub options: Vec<String>,
}

impl Prompt {
    #[must_use]
    pub fn new(label: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            label: label.into(),
            options,
        }
    }
}

/// Tabular data displayed alongside a table-analysis question.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One tabbed source document of a multi-source reasoning question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTab {
    pub title: String,
    pub content: String,
}

impl SourceTab {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

//
// ─── QUESTION BODY ─────────────────────────────────────────────────────────────
//

/// Kind-specific content of a question.
///
/// Every variant knows how many prompts must be answered and how many options
/// each prompt offers, which drives answer validation without any per-kind
/// branching elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionBody {
    /// Standard multiple choice with a single correct option.
    SingleChoice { options: Vec<String> },
    /// A chart or graphic with one dropdown selection per embedded prompt.
    GraphicsInterpretation {
        image_url: Option<String>,
        prompts: Vec<Prompt>,
    },
    /// Two linked selections, one per column, each choosing among the same rows.
    TwoPartAnalysis {
        columns: Vec<String>,
        rows: Vec<String>,
    },
    /// Numbered statements judged against the standard sufficiency options.
    DataSufficiency {
        statements: Vec<String>,
        options: Vec<String>,
    },
    /// A sortable table with a yes/no judgment per statement.
    TableAnalysis {
        table: DataTable,
        statements: Vec<String>,
    },
    /// Tabbed source documents with a yes/no judgment per statement.
    MultiSourceReasoningTabs {
        tabs: Vec<SourceTab>,
        statements: Vec<String>,
    },
    /// Follow-up single selection on sources shown earlier, without the tabs.
    MultiSourceReasoningOptions { options: Vec<String> },
}

// Yes/no statements always offer exactly two options.
const YES_NO_OPTIONS: usize = 2;

impl QuestionBody {
    /// Stable name of this question kind, as used on the wire.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            QuestionBody::SingleChoice { .. } => "singleChoice",
            QuestionBody::GraphicsInterpretation { .. } => "graphicsInterpretation",
            QuestionBody::TwoPartAnalysis { .. } => "twoPartAnalysis",
            QuestionBody::DataSufficiency { .. } => "dataSufficiency",
            QuestionBody::TableAnalysis { .. } => "tableAnalysis",
            QuestionBody::MultiSourceReasoningTabs { .. } => "multiSourceReasoningTabs",
            QuestionBody::MultiSourceReasoningOptions { .. } => "multiSourceReasoningOptions",
        }
    }

    /// Number of prompts that must each receive a selection.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        match self {
            QuestionBody::SingleChoice { .. }
            | QuestionBody::DataSufficiency { .. }
            | QuestionBody::MultiSourceReasoningOptions { .. } => 1,
            QuestionBody::GraphicsInterpretation { prompts, .. } => prompts.len(),
            QuestionBody::TwoPartAnalysis { columns, .. } => columns.len(),
            QuestionBody::TableAnalysis { statements, .. }
            | QuestionBody::MultiSourceReasoningTabs { statements, .. } => statements.len(),
        }
    }

    /// Number of selectable options for the given prompt, if the prompt exists.
    #[must_use]
    pub fn option_count(&self, prompt: usize) -> Option<usize> {
        match self {
            QuestionBody::SingleChoice { options }
            | QuestionBody::DataSufficiency { options, .. }
            | QuestionBody::MultiSourceReasoningOptions { options } => {
                (prompt == 0).then_some(options.len())
            }
            QuestionBody::GraphicsInterpretation { prompts, .. } => {
                prompts.get(prompt).map(|p| p.options.len())
            }
            QuestionBody::TwoPartAnalysis { columns, rows } => {
                (prompt < columns.len()).then_some(rows.len())
            }
            QuestionBody::TableAnalysis { statements, .. }
            | QuestionBody::MultiSourceReasoningTabs { statements, .. } => {
                (prompt < statements.len()).then_some(YES_NO_OPTIONS)
            }
        }
    }

    /// Returns true when the kind carries more than one prompt.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.prompt_count() > 1
    }

    fn validate(&self) -> Result<(), QuestionError> {
        let kind = self.kind_name();
        if self.prompt_count() == 0 {
            return Err(QuestionError::NoPrompts { kind });
        }
        for prompt in 0..self.prompt_count() {
            if self.option_count(prompt) == Some(0) {
                return Err(QuestionError::EmptyPrompt { kind, prompt });
            }
        }
        Ok(())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single exam question as delivered by the exam service.
///
/// The descriptor is immutable once received; advancing to the next question
/// replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    passage: Option<String>,
    body: QuestionBody,
}

impl Question {
    /// Build a question, checking that every prompt can actually be answered.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::NoPrompts` for a kind without prompts and
    /// `QuestionError::EmptyPrompt` when a prompt offers no options.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        body: QuestionBody,
    ) -> Result<Self, QuestionError> {
        body.validate()?;
        Ok(Self {
            id,
            text: text.into(),
            passage: None,
            body,
        })
    }

    /// Attach the reading passage shown alongside the question.
    #[must_use]
    pub fn with_passage(mut self, passage: impl Into<String>) -> Self {
        self.passage = Some(passage.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    #[must_use]
    pub fn body(&self) -> &QuestionBody {
        &self.body
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.body.kind_name()
    }

    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.body.prompt_count()
    }

    #[must_use]
    pub fn option_count(&self, prompt: usize) -> Option<usize> {
        self.body.option_count(prompt)
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.body.is_composite()
    }

    /// Returns true when `option` is a selectable answer for `prompt`.
    #[must_use]
    pub fn accepts(&self, prompt: usize, option: usize) -> bool {
        self.option_count(prompt).is_some_and(|count| option < count)
    }

    /// Returns true when every prompt of this question has a selection.
    #[must_use]
    pub fn is_complete(&self, record: &AnswerRecord) -> bool {
        (0..self.prompt_count()).all(|prompt| record.selection(prompt).is_some())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
