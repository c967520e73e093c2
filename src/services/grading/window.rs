use time::{Duration, PrimitiveDateTime};

use crate::db::models::Unit;
use crate::db::types::UnitKind;
use crate::services::grading::error::GradingError;

/// When a unit accepts submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowPolicy {
    /// Assignments: open until the due date; no due date means always open.
    Deadline { due: Option<PrimitiveDateTime> },
    /// Exams: each attempt is timed from its own start. `start`/`end` only
    /// decide whether the exam is listed as available.
    Timed { start: Option<PrimitiveDateTime>, end: Option<PrimitiveDateTime>, limit: Duration },
}

impl WindowPolicy {
    pub(crate) fn for_unit(unit: &Unit) -> Result<Self, GradingError> {
        match unit.kind {
            UnitKind::Assignment => Ok(Self::Deadline { due: unit.due_date }),
            UnitKind::Exam => {
                let minutes = unit
                    .time_limit_minutes
                    .filter(|minutes| *minutes > 0)
                    .ok_or_else(|| GradingError::Validation("exam has no time limit".to_string()))?;
                Ok(Self::Timed {
                    start: unit.start_time,
                    end: unit.end_time,
                    limit: Duration::minutes(i64::from(minutes)),
                })
            }
        }
    }

    pub(crate) fn has_attempt_state(&self) -> bool {
        matches!(self, Self::Timed { .. })
    }

    pub(crate) fn closes_at(&self) -> Option<PrimitiveDateTime> {
        match self {
            Self::Deadline { due } => *due,
            Self::Timed { end, .. } => *end,
        }
    }

    /// Closed strictly after the closing instant.
    pub(crate) fn has_closed(&self, now: PrimitiveDateTime) -> bool {
        self.closes_at().is_some_and(|closes_at| now > closes_at)
    }

    /// Whether a new submission may be created now. Exams can always be started.
    pub(crate) fn is_open(&self, now: PrimitiveDateTime) -> bool {
        match self {
            Self::Deadline { .. } => !self.has_closed(now),
            Self::Timed { .. } => true,
        }
    }

    /// Whether the unit should be shown to learners as currently running.
    pub(crate) fn is_available(&self, now: PrimitiveDateTime) -> bool {
        match self {
            Self::Deadline { .. } => self.is_open(now),
            Self::Timed { start, end, .. } => {
                start.map_or(true, |start| now >= start) && end.map_or(true, |end| now <= end)
            }
        }
    }

    /// Whether an attempt that began at `started_at` may no longer submit.
    pub(crate) fn has_expired(
        &self,
        started_at: Option<PrimitiveDateTime>,
        now: PrimitiveDateTime,
        enforce_end_time: bool,
    ) -> bool {
        match self {
            Self::Deadline { .. } => !self.is_open(now),
            Self::Timed { end, limit, .. } => {
                let Some(started_at) = started_at else {
                    return true;
                };
                if now - started_at > *limit {
                    return true;
                }
                enforce_end_time && end.is_some_and(|end| now > end)
            }
        }
    }
}

/// Checks the window fields a teacher supplies for a unit.
pub(crate) fn validate_window(
    kind: UnitKind,
    due_date: Option<PrimitiveDateTime>,
    start_time: Option<PrimitiveDateTime>,
    end_time: Option<PrimitiveDateTime>,
    time_limit_minutes: Option<i32>,
) -> Result<(), GradingError> {
    match kind {
        UnitKind::Assignment => {
            if start_time.is_some() || end_time.is_some() || time_limit_minutes.is_some() {
                return Err(GradingError::Validation(
                    "start_time, end_time and time_limit_minutes apply to exams only".to_string(),
                ));
            }
            Ok(())
        }
        UnitKind::Exam => {
            if due_date.is_some() {
                return Err(GradingError::Validation(
                    "due_date applies to assignments only".to_string(),
                ));
            }
            let minutes = time_limit_minutes.ok_or_else(|| {
                GradingError::Validation("time_limit_minutes is required for exams".to_string())
            })?;
            if minutes <= 0 {
                return Err(GradingError::Validation(
                    "time_limit_minutes must be positive".to_string(),
                ));
            }
            if let (Some(start), Some(end)) = (start_time, end_time) {
                if start >= end {
                    return Err(GradingError::Validation(
                        "start_time must be before end_time".to_string(),
                    ));
                }
                if end - start < Duration::minutes(i64::from(minutes)) {
                    return Err(GradingError::Validation(
                        "exam window is shorter than its time limit".to_string(),
                    ));
                }
            }
            Ok(())
        }
    }
}
