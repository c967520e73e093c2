mod coordinator;
mod error;
mod lifecycle;
#[cfg(test)]
pub(crate) mod memory;
mod payload;
mod ports;
mod report;
mod scoring;
mod window;


pub(crate) use coordinator::{AttemptRef, GradingRules, GradingService, SubmissionView};
pub(crate) use error::{GradingError, StoreError};
pub(crate) use lifecycle::{AnswerInput, ScoreInput};
pub(crate) use ports::{QuestionCatalog, Roster, SubmissionStore, SubmissionTx, UnitDirectory};
pub(crate) use report::AggregateReport;
#[cfg(test)]
pub(crate) use report::ReportStatus;
pub(crate) use scoring::AnswerKey;
pub(crate) use window::{validate_window, WindowPolicy};
