pub(crate) mod authoring;
pub(crate) mod grading;
