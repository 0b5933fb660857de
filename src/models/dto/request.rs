use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{Answer, CourseScope, JobStatus};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateCourseRequest {
    #[validate(length(min = 1, max = 100))]
    pub owner: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 50, message = "Provide between 1 and 50 source files"))]
    pub source_paths: Vec<String>,
}

impl GenerateCourseRequest {
    pub fn scope(&self) -> CourseScope {
        CourseScope::new(self.owner.trim(), self.title.trim())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteCourseRequest {
    #[validate(length(min = 1, max = 100))]
    pub owner: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerInput {
    pub question_index: usize,
    pub is_correct: Option<bool>,
}

impl From<AnswerInput> for Answer {
    fn from(input: AnswerInput) -> Self {
        Answer {
            question_index: input.question_index,
            is_correct: input.is_correct,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordAttemptRequest {
    #[validate(length(min = 1))]
    pub course_id: String,

    #[validate(length(min = 1, max = 100))]
    pub user_id: String,

    #[validate(range(min = 1))]
    pub module_number: u32,

    #[validate(length(min = 1, message = "An attempt needs at least one answer"))]
    pub answers: Vec<AnswerInput>,

    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModuleQuizRequest {
    #[validate(length(min = 1))]
    pub attempt_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FinalQuizRequest {
    #[validate(length(min = 1))]
    pub course_id: String,

    #[validate(length(min = 1, max = 100))]
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 8, max = 128))]
    pub session_id: String,

    #[validate(length(min = 1))]
    pub course_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
}
