use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binds a caller-chosen session id to one course.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CourseSession {
    pub session_id: String,
    pub course_id: String,
    pub owner: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
