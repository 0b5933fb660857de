use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::question::Question;

/// Per-module slice of a final quiz: what was budgeted and what the model delivered.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FinalQuizSection {
    pub module_number: u32,
    pub requested: usize,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FinalQuiz {
    pub id: String,
    pub course_id: String,
    pub user_id: String,
    pub questions: Vec<Question>,
    pub sections: Vec<FinalQuizSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FinalQuiz {
    pub fn new(
        course_id: &str,
        user_id: &str,
        questions: Vec<Question>,
        sections: Vec<FinalQuizSection>,
    ) -> Self {
        FinalQuiz {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            user_id: user_id.to_string(),
            questions,
            sections,
            created_at: Some(Utc::now()),
        }
    }

    pub fn requested_total(&self) -> usize {
        self.sections.iter().map(|s| s.requested).sum()
    }
}
