use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Answer, QuizAttempt},
        dto::request::RecordAttemptRequest,
    },
    repositories::{CourseRepository, QuizAttemptRepository},
};

pub struct QuizAttemptService {
    attempts: Arc<dyn QuizAttemptRepository>,
    courses: Arc<dyn CourseRepository>,
}

impl QuizAttemptService {
    pub fn new(
        attempts: Arc<dyn QuizAttemptRepository>,
        courses: Arc<dyn CourseRepository>,
    ) -> Self {
        Self { attempts, courses }
    }

    /// Stores an already graded attempt against the module's current question bank.
    pub async fn record_attempt(&self, request: RecordAttemptRequest) -> AppResult<QuizAttempt> {
        request.validate()?;

        let course = self
            .courses
            .find_by_id(&request.course_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Course with id '{}' not found", request.course_id))
            })?;
        let module = course.module(request.module_number).ok_or_else(|| {
            AppError::NotFound(format!(
                "Module {} not found in course '{}'",
                request.module_number, course.title
            ))
        })?;

        let bank_len = module.questions.len();
        if let Some(answer) = request
            .answers
            .iter()
            .find(|answer| answer.question_index >= bank_len)
        {
            return Err(AppError::ValidationError(format!(
                "Question index {} is outside module {}'s bank of {} questions",
                answer.question_index, module.number, bank_len
            )));
        }

        let now = Utc::now();
        let attempt = QuizAttempt {
            id: Uuid::new_v4().to_string(),
            course_id: course.id.clone(),
            user_id: request.user_id,
            module_number: module.number,
            bank_snapshot_id: module.bank_snapshot_id.clone(),
            answers: request.answers.into_iter().map(Answer::from).collect(),
            is_completed: request.is_completed,
            created_at: Some(now),
            modified_at: Some(now),
        };

        let attempt = self.attempts.create(attempt).await?;
        log::info!(
            "Recorded attempt {} for user {} on module {} ({} incorrect)",
            attempt.id,
            attempt.user_id,
            attempt.module_number,
            attempt.incorrect_count()
        );
        Ok(attempt)
    }

    pub async fn get_attempt(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz attempt '{}' not found", attempt_id)))
    }
}
