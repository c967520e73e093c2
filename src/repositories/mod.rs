pub(crate) mod answers;
pub(crate) mod grading;
pub(crate) mod memberships;
pub(crate) mod questions;
pub(crate) mod submissions;
pub(crate) mod units;
