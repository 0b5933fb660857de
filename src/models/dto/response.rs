use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{
    FinalQuiz, FinalQuizSection, GenerationJob, JobStatus, PipelineStage, QuizAttempt,
};

#[derive(Debug, Clone, Serialize)]
pub struct GenerationJobDto {
    pub job_id: String,
    pub owner: String,
    pub course_title: String,
    pub status: JobStatus,
    pub completed_stages: Vec<PipelineStage>,
    pub next_stage: Option<PipelineStage>,
    pub course_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<GenerationJob> for GenerationJobDto {
    fn from(job: GenerationJob) -> Self {
        GenerationJobDto {
            completed_stages: job.completed_stages(),
            next_stage: job.get_current_step().map(|step| step.stage),
            job_id: job.id,
            owner: job.owner,
            course_title: job.course_title,
            status: job.status,
            course_id: job.checkpoint.course_id,
            error_message: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleQuizDto {
    pub quiz_attempt_id: String,
    pub module_number: u32,
    pub question_indices: Vec<usize>,
}

impl From<QuizAttempt> for ModuleQuizDto {
    fn from(attempt: QuizAttempt) -> Self {
        ModuleQuizDto {
            question_indices: attempt.question_indices(),
            quiz_attempt_id: attempt.id,
            module_number: attempt.module_number,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalQuizDto {
    pub final_quiz_id: String,
    pub question_count: usize,
    pub requested_count: usize,
    pub sections: Vec<FinalQuizSection>,
}

impl From<FinalQuiz> for FinalQuizDto {
    fn from(quiz: FinalQuiz) -> Self {
        FinalQuizDto {
            question_count: quiz.questions.len(),
            requested_count: quiz.requested_total(),
            final_quiz_id: quiz.id,
            sections: quiz.sections,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteCourseResponse {
    pub message: String,
    pub vectors_deleted: bool,
    pub chunks_deleted: u64,
    pub course_deleted: bool,
    pub attempts_deleted: u64,
    pub final_quizzes_deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
