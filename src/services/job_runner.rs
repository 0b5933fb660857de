use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{GenerationJob, JobStatus},
    repositories::GenerationJobRepository,
    services::{course_pipeline::CoursePipeline, job_events::JobEventKind},
};

/// Background executor for generation jobs, one tokio task per running job.
pub struct JobRunner {
    pipeline: Arc<CoursePipeline>,
    jobs: Arc<dyn GenerationJobRepository>,
    handles: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
}

impl JobRunner {
    pub fn new(pipeline: Arc<CoursePipeline>, jobs: Arc<dyn GenerationJobRepository>) -> Self {
        Self {
            pipeline,
            jobs,
            handles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn is_running(&self, job_id: &str) -> bool {
        self.handles
            .read()
            .await
            .get(job_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the pipeline for `job_id` in the background.
    pub async fn spawn(&self, job_id: &str) {
        let pipeline = self.pipeline.clone();
        let handles = self.handles.clone();
        let id = job_id.to_string();

        // Held across spawn so the task cannot deregister before it is registered.
        let mut registered = self.handles.write().await;
        let handle = tokio::spawn(async move {
            match pipeline.run(&id).await {
                Ok(job) => log::info!("Generation job {} ended as {}", id, job.status),
                Err(e) => log::error!("Generation job {} stopped: {}", id, e),
            }
            handles.write().await.remove(&id);
        });
        registered.insert(job_id.to_string(), handle);
    }

    pub async fn cancel(&self, job_id: &str) -> AppResult<GenerationJob> {
        let job = self.find_job(job_id).await?;
        if !matches!(job.status, JobStatus::Pending | JobStatus::Running) {
            return Err(AppError::ValidationError(format!(
                "Job {} is {}, only pending or running jobs can be cancelled",
                job_id, job.status
            )));
        }

        let handle = self.handles.write().await.remove(job_id);
        if let Some(handle) = handle {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    log::warn!("Job {} task ended abnormally: {}", job_id, e);
                }
            }
        }

        // Reload so progress saved before the abort is kept.
        let mut job = self.find_job(job_id).await?;
        if job.status == JobStatus::Completed {
            return Err(AppError::ValidationError(format!(
                "Job {} completed before it could be cancelled",
                job_id
            )));
        }
        job.mark_cancelled();
        self.jobs.save(&job).await?;
        log::info!("Cancelled generation job {}", job_id);
        self.pipeline
            .events()
            .publish(job_id, JobEventKind::JobCancelled);
        Ok(job)
    }

    /// Restarts a failed or cancelled job from its first unfinished stage.
    pub async fn resume(&self, job_id: &str) -> AppResult<GenerationJob> {
        let job = self.find_job(job_id).await?;
        if !job.status.is_resumable() {
            return Err(AppError::ValidationError(format!(
                "Job {} is {}, only failed or cancelled jobs can be resumed",
                job_id, job.status
            )));
        }
        if self.is_running(job_id).await {
            return Err(AppError::AlreadyExists(format!(
                "Job {} is already running",
                job_id
            )));
        }

        log::info!(
            "Resuming generation job {} at step {}",
            job_id,
            job.current_step_index
        );
        self.spawn(job_id).await;
        Ok(job)
    }

    /// Marks jobs left running by a previous process as failed so they can be resumed.
    pub async fn recover_interrupted(&self) -> AppResult<usize> {
        let mut recovered = 0;
        for status in [JobStatus::Running, JobStatus::Pending] {
            for mut job in self.jobs.list(Some(status)).await? {
                if self.is_running(&job.id).await {
                    continue;
                }
                job.mark_failed("interrupted by server restart");
                self.jobs.save(&job).await?;
                recovered += 1;
            }
        }
        if recovered > 0 {
            log::warn!("Marked {} interrupted generation jobs as failed", recovered);
        }
        Ok(recovered)
    }

    async fn find_job(&self, job_id: &str) -> AppResult<GenerationJob> {
        self.jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Generation job {} not found", job_id)))
    }
}
