use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult, GenerationOutcome, NotGeneratedReason},
    models::{
        domain::{FinalQuiz, QuizAttempt},
        dto::request::{FinalQuizRequest, ModuleQuizRequest},
    },
    repositories::{CourseRepository, FinalQuizRepository, QuizAttemptRepository},
    services::{final_exam_allocator::FinalExamAllocator, module_quiz_selector::ModuleQuizSelector},
};

pub struct QuizService {
    courses: Arc<dyn CourseRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    final_quizzes: Arc<dyn FinalQuizRepository>,
    selector: ModuleQuizSelector,
    allocator: FinalExamAllocator,
}

impl QuizService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        final_quizzes: Arc<dyn FinalQuizRepository>,
        selector: ModuleQuizSelector,
        allocator: FinalExamAllocator,
    ) -> Self {
        Self {
            courses,
            attempts,
            final_quizzes,
            selector,
            allocator,
        }
    }

    /// Builds a follow-up quiz for the module of `attempt_id`, stored as a new pending attempt.
    pub async fn generate_module_quiz(
        &self,
        request: ModuleQuizRequest,
    ) -> AppResult<GenerationOutcome<QuizAttempt>> {
        request.validate()?;

        let Some(attempt) = self.attempts.find_by_id(&request.attempt_id).await? else {
            return Ok(GenerationOutcome::NotGenerated(
                NotGeneratedReason::AttemptNotFound {
                    attempt_id: request.attempt_id,
                },
            ));
        };
        let Some(course) = self.courses.find_by_id(&attempt.course_id).await? else {
            return Ok(GenerationOutcome::NotGenerated(
                NotGeneratedReason::CourseNotFound {
                    course_id: attempt.course_id,
                },
            ));
        };
        let Some(module) = course.module(attempt.module_number) else {
            return Ok(GenerationOutcome::NotGenerated(
                NotGeneratedReason::ModuleNotFound {
                    module_number: attempt.module_number,
                },
            ));
        };
        if attempt.bank_snapshot_id != module.bank_snapshot_id {
            return Ok(GenerationOutcome::NotGenerated(
                NotGeneratedReason::StaleQuestionBank {
                    attempt_snapshot: attempt.bank_snapshot_id,
                    current_snapshot: module.bank_snapshot_id.clone(),
                },
            ));
        }

        let indices = match self.selector.select(&attempt, module).await? {
            GenerationOutcome::Generated(indices) => indices,
            GenerationOutcome::NotGenerated(reason) => {
                return Ok(GenerationOutcome::NotGenerated(reason))
            }
        };

        let quiz = self
            .attempts
            .create(QuizAttempt::pending(
                &course.id,
                &attempt.user_id,
                module.number,
                &module.bank_snapshot_id,
                &indices,
            ))
            .await?;
        log::info!(
            "Module quiz {} created from attempt {} with {} questions",
            quiz.id,
            attempt.id,
            indices.len()
        );
        Ok(GenerationOutcome::Generated(quiz))
    }

    /// Generates the user's final quiz for a course, replacing any earlier one.
    pub async fn generate_final_quiz(
        &self,
        request: FinalQuizRequest,
    ) -> AppResult<GenerationOutcome<FinalQuiz>> {
        request.validate()?;

        let Some(course) = self.courses.find_by_id(&request.course_id).await? else {
            return Ok(GenerationOutcome::NotGenerated(
                NotGeneratedReason::CourseNotFound {
                    course_id: request.course_id,
                },
            ));
        };
        let attempts = self
            .attempts
            .find_by_course_and_user(&course.id, &request.user_id)
            .await?;

        match self
            .allocator
            .generate(&course, &request.user_id, &attempts)
            .await?
        {
            GenerationOutcome::Generated(quiz) => {
                let quiz = self.final_quizzes.replace_for_course_and_user(quiz).await?;
                log::info!(
                    "Final quiz {} stored for user {} in course {} ({} questions)",
                    quiz.id,
                    quiz.user_id,
                    quiz.course_id,
                    quiz.questions.len()
                );
                Ok(GenerationOutcome::Generated(quiz))
            }
            GenerationOutcome::NotGenerated(reason) => {
                log::info!(
                    "Final quiz not generated for user {} in course {}: {}",
                    request.user_id,
                    course.id,
                    reason
                );
                Ok(GenerationOutcome::NotGenerated(reason))
            }
        }
    }

    pub async fn get_final_quiz(&self, course_id: &str, user_id: &str) -> AppResult<FinalQuiz> {
        self.final_quizzes
            .find_by_course_and_user(course_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No final quiz for user {} in course {}",
                    user_id, course_id
                ))
            })
    }
}
