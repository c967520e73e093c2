mod commands;
mod queries;
mod types;

pub(crate) use commands::{insert_if_absent, lock_attempt, save};
pub(crate) use queries::{find_by_id, find_for_student, find_for_update, list_by_unit};
