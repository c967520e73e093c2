pub(crate) const COLUMNS: &str = "\
    id, unit_id, course_id, student_id, status, started_at, submitted_at, grade, feedback, \
    created_at, updated_at";
