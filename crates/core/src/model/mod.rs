mod answer;
mod identity;
mod ids;
mod question;
mod report;
mod section;

pub use answer::{AnswerRecord, AnswerSheet, Selection, SubmittedAnswer};
pub use identity::{Candidate, IdentityError};
pub use ids::{AttemptId, ParseIdError, QuestionId, SectionKey, SessionId};
pub use question::{DataTable, Prompt, Question, QuestionBody, QuestionError, SourceTab};
pub use report::{
    AttemptRef, AttemptReport, ExamSummary, QuestionReview, ReportMetrics, SectionReport,
    group_by_exam_type,
};
pub use section::{DeliveryProtocol, ExamPlan, PlanError, SectionPlan};
