use std::collections::HashMap;

use serde::Serialize;
use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::services::grading::window::WindowPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ReportStatus {
    NotSubmitted,
    Taking,
    Submitted,
    Graded,
}

impl From<SubmissionStatus> for ReportStatus {
    fn from(status: SubmissionStatus) -> Self {
        match status {
            SubmissionStatus::Taking => Self::Taking,
            SubmissionStatus::Submitted => Self::Submitted,
            SubmissionStatus::Graded => Self::Graded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StudentGradeStatus {
    pub(crate) student_id: String,
    pub(crate) status: ReportStatus,
    pub(crate) grade: Option<f64>,
    pub(crate) submission_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct SubmissionStats {
    pub(crate) total_students: usize,
    pub(crate) total_submissions: usize,
    pub(crate) graded_submissions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AggregateReport {
    pub(crate) unit_id: String,
    pub(crate) closed: bool,
    pub(crate) students: Vec<StudentGradeStatus>,
    pub(crate) stats: SubmissionStats,
}

/// Derives one row per enrolled student. Absentees count as graded zero once
/// the unit has closed; nothing is persisted for them.
pub(crate) fn build_report(
    unit_id: &str,
    policy: &WindowPolicy,
    roster: &[String],
    submissions: &[Submission],
    now: PrimitiveDateTime,
) -> AggregateReport {
    let closed = policy.has_closed(now);
    let by_student: HashMap<&str, &Submission> = submissions
        .iter()
        .map(|submission| (submission.student_id.as_str(), submission))
        .collect();

    let students: Vec<StudentGradeStatus> = roster
        .iter()
        .map(|student_id| match by_student.get(student_id.as_str()) {
            Some(submission) => StudentGradeStatus {
                student_id: student_id.clone(),
                status: submission.status.into(),
                grade: submission.grade,
                submission_id: Some(submission.id.clone()),
            },
            None if closed => StudentGradeStatus {
                student_id: student_id.clone(),
                status: ReportStatus::Graded,
                grade: Some(0.0),
                submission_id: None,
            },
            None => StudentGradeStatus {
                student_id: student_id.clone(),
                status: ReportStatus::NotSubmitted,
                grade: None,
                submission_id: None,
            },
        })
        .collect();

    let graded_rows = submissions
        .iter()
        .filter(|submission| submission.status == SubmissionStatus::Graded)
        .count();
    let auto_zeroed = students
        .iter()
        .filter(|row| row.submission_id.is_none() && row.status == ReportStatus::Graded)
        .count();

    AggregateReport {
        unit_id: unit_id.to_string(),
        closed,
        stats: SubmissionStats {
            total_students: roster.len(),
            total_submissions: submissions.len(),
            graded_submissions: graded_rows + auto_zeroed,
        },
        students,
    }
}
