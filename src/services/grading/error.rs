use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conflicting write: {0}")]
    Conflict(&'static str),
}

#[derive(Debug, Error)]
pub(crate) enum GradingError {
    #[error("{0}")]
    Validation(String),
    #[error("submission window is closed")]
    WindowClosed,
    #[error("submission is already finalized")]
    AlreadyFinalized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("submission has not been submitted yet")]
    NotSubmitted,
    #[error("{0}")]
    InvalidAnswers(String),
    #[error("exams are the only units with an attempt to start")]
    NotApplicable,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GradingError {
    /// Label used for the rejection counter and warn logs.
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::WindowClosed => "window_closed",
            Self::AlreadyFinalized => "already_finalized",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::NotSubmitted => "not_submitted",
            Self::InvalidAnswers(_) => "invalid_answers",
            Self::NotApplicable => "not_applicable",
            Self::Store(_) => "store",
        }
    }
}

impl From<sqlx::Error> for GradingError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(err))
    }
}
