use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Course, CourseScope, GenerationJob, JobStatus},
        dto::{
            request::{DeleteCourseRequest, GenerateCourseRequest},
            response::DeleteCourseResponse,
        },
    },
    repositories::{
        CourseRepository, FinalQuizRepository, GenerationJobRepository, QuizAttemptRepository,
    },
    services::{
        job_runner::JobRunner, orchestrator_steps::create_course_generation_steps,
        retrieval::ChunkRetriever,
    },
};

pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    jobs: Arc<dyn GenerationJobRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    final_quizzes: Arc<dyn FinalQuizRepository>,
    retriever: Arc<ChunkRetriever>,
    runner: Arc<JobRunner>,
}

impl CourseService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        jobs: Arc<dyn GenerationJobRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        final_quizzes: Arc<dyn FinalQuizRepository>,
        retriever: Arc<ChunkRetriever>,
        runner: Arc<JobRunner>,
    ) -> Self {
        Self {
            courses,
            jobs,
            attempts,
            final_quizzes,
            retriever,
            runner,
        }
    }

    /// Records a new generation job for the scope and starts it in the background.
    pub async fn start_generation(
        &self,
        request: GenerateCourseRequest,
    ) -> AppResult<GenerationJob> {
        request.validate()?;
        let scope = request.scope();
        if scope.owner.is_empty() || scope.course.is_empty() {
            return Err(AppError::ValidationError(
                "Owner and title must not be blank".to_string(),
            ));
        }

        if self
            .courses
            .find_by_owner_and_title(&scope.owner, &scope.course)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(format!(
                "Course '{}' already exists for owner {}",
                scope.course, scope.owner
            )));
        }

        let indexed = self.retriever.indexed_count(&scope).await?;
        if indexed > 0 {
            return Err(AppError::AlreadyExists(format!(
                "Vector index already holds {} points for '{}'; resume its job or delete the course first",
                indexed, scope.course
            )));
        }

        if self.active_job_for(&scope).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "A generation job for '{}' is already in progress",
                scope.course
            )));
        }

        let job = self
            .jobs
            .create(GenerationJob::new(
                &scope,
                request.source_paths,
                create_course_generation_steps(),
            ))
            .await?;
        log::info!(
            "Created generation job {} for '{}' (owner {})",
            job.id,
            job.course_title,
            job.owner
        );

        self.runner.spawn(&job.id).await;
        Ok(job)
    }

    pub async fn get_job(&self, job_id: &str) -> AppResult<GenerationJob> {
        self.jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Generation job {} not found", job_id)))
    }

    pub async fn list_jobs(&self, status: Option<JobStatus>) -> AppResult<Vec<GenerationJob>> {
        self.jobs.list(status).await
    }

    pub async fn get_course(&self, course_id: &str) -> AppResult<Course> {
        self.courses
            .find_by_id(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course with id '{}' not found", course_id)))
    }

    pub async fn delete_course(
        &self,
        request: DeleteCourseRequest,
    ) -> AppResult<DeleteCourseResponse> {
        request.validate()?;
        let scope = CourseScope::new(request.owner.trim(), request.title.trim());

        if let Some(job) = self.active_job_for(&scope).await? {
            return Err(AppError::ValidationError(format!(
                "Generation job {} for '{}' is still running; cancel it first",
                job.id, scope.course
            )));
        }

        let mut response = DeleteCourseResponse {
            vectors_deleted: self.retriever.indexed_count(&scope).await? > 0,
            ..Default::default()
        };
        response.chunks_deleted = self.retriever.clear(&scope).await?;

        if let Some(course) = self
            .courses
            .find_by_owner_and_title(&scope.owner, &scope.course)
            .await?
        {
            response.attempts_deleted = self.attempts.delete_by_course(&course.id).await?;
            response.final_quizzes_deleted = self.final_quizzes.delete_by_course(&course.id).await?;
            response.course_deleted = self
                .courses
                .delete_by_owner_and_title(&scope.owner, &scope.course)
                .await?
                > 0;
        }

        if !response.vectors_deleted && response.chunks_deleted == 0 && !response.course_deleted {
            return Err(AppError::NotFound(format!(
                "Nothing stored for course '{}' of owner {}",
                scope.course, scope.owner
            )));
        }

        log::info!(
            "Deleted course '{}' (owner {}): {} chunks, {} attempts, {} final quizzes",
            scope.course,
            scope.owner,
            response.chunks_deleted,
            response.attempts_deleted,
            response.final_quizzes_deleted
        );
        response.message = format!("Course '{}' deleted", scope.course);
        Ok(response)
    }

    async fn active_job_for(&self, scope: &CourseScope) -> AppResult<Option<GenerationJob>> {
        for status in [JobStatus::Pending, JobStatus::Running] {
            if let Some(job) = self
                .jobs
                .list(Some(status))
                .await?
                .into_iter()
                .find(|job| job.owner == scope.owner && job.course_title == scope.course)
            {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }
}
