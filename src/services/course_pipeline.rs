use std::sync::Arc;
use std::time::Duration;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        Chunk, Course, GenerationJob, JobStatus, JobStep, PipelineCheckpoint, PipelineStage,
    },
    repositories::{CourseRepository, GenerationJobRepository},
    services::{
        chunker::{load_sources, ChunkingOptions},
        content_generator::ContentGenerator,
        job_events::{JobEventBroadcaster, JobEventKind},
        question_bank::QuestionBankGenerator,
        retrieval::ChunkRetriever,
        summarizer::{estimate_total_tokens, module_count_for, Summarizer},
        toc_synthesizer::TocSynthesizer,
    },
};

/// Stage workers the pipeline drives, one per concern.
pub struct PipelineComponents {
    pub retriever: Arc<ChunkRetriever>,
    pub summarizer: Arc<Summarizer>,
    pub toc: Arc<TocSynthesizer>,
    pub content: Arc<ContentGenerator>,
    pub questions: Arc<QuestionBankGenerator>,
    pub chunking: ChunkingOptions,
}

/// Runs a generation job stage by stage, saving the checkpoint after each one.
pub struct CoursePipeline {
    jobs: Arc<dyn GenerationJobRepository>,
    courses: Arc<dyn CourseRepository>,
    components: PipelineComponents,
    events: JobEventBroadcaster,
}

impl CoursePipeline {
    pub fn new(
        jobs: Arc<dyn GenerationJobRepository>,
        courses: Arc<dyn CourseRepository>,
        components: PipelineComponents,
        events: JobEventBroadcaster,
    ) -> Self {
        Self {
            jobs,
            courses,
            components,
            events,
        }
    }

    pub fn events(&self) -> &JobEventBroadcaster {
        &self.events
    }

    /// Executes the job from its first unfinished stage to completion.
    pub async fn run(&self, job_id: &str) -> AppResult<GenerationJob> {
        let mut job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Generation job {} not found", job_id)))?;

        if job.status == JobStatus::Completed {
            log::info!("Job {} already completed, nothing to run", job.id);
            return Ok(job);
        }

        let resume_from = job.get_current_step().map(|step| step.stage);
        job.mark_running();
        self.jobs.save(&job).await?;
        log::info!(
            "Running generation job {} for '{}' (owner {}) from stage {:?}",
            job.id,
            job.course_title,
            job.owner,
            resume_from
        );
        self.events
            .publish(&job.id, JobEventKind::JobStarted { resume_from });

        while let Some(step) = job.get_current_step().cloned() {
            self.events
                .publish(&job.id, JobEventKind::StageStarted { stage: step.stage });

            match self.execute_step(&step, &job).await {
                Ok(checkpoint) => {
                    job.checkpoint = checkpoint;
                    job.advance();
                    self.jobs.save(&job).await?;
                    log::info!("Job {} finished stage {}", job.id, step.stage);
                    self.events
                        .publish(&job.id, JobEventKind::StageCompleted { stage: step.stage });
                }
                Err(err) => {
                    log::error!("Job {} failed at stage {}: {}", job.id, step.stage, err);
                    job.mark_failed(format!("{} stage failed: {}", step.stage, err));
                    if let Err(save_err) = self.jobs.save(&job).await {
                        log::error!("Failed to record failure of job {}: {}", job.id, save_err);
                    }
                    self.events.publish(
                        &job.id,
                        JobEventKind::JobFailed {
                            stage: Some(step.stage),
                            error: err.to_string(),
                        },
                    );
                    return Err(err);
                }
            }
        }

        self.events.publish(
            &job.id,
            JobEventKind::JobCompleted {
                course_id: job.checkpoint.course_id.clone(),
            },
        );
        Ok(job)
    }

    async fn execute_step(
        &self,
        step: &JobStep,
        job: &GenerationJob,
    ) -> AppResult<PipelineCheckpoint> {
        let work = self.execute_stage(step.stage, job);
        match step.timeout_seconds {
            Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), work)
                .await
                .map_err(|_| {
                    AppError::Timeout(format!("{} stage exceeded {}s", step.stage, seconds))
                })?,
            None => work.await,
        }
    }

    /// Produces the checkpoint after `stage`; the job itself is only updated on success.
    async fn execute_stage(
        &self,
        stage: PipelineStage,
        job: &GenerationJob,
    ) -> AppResult<PipelineCheckpoint> {
        let mut checkpoint = job.checkpoint.clone();
        match stage {
            PipelineStage::Ingest => self.handle_ingest(job, &mut checkpoint).await?,
            PipelineStage::Summarize => self.handle_summarize(job, &mut checkpoint).await?,
            PipelineStage::Index => self.handle_index(job, &mut checkpoint).await?,
            PipelineStage::Outline => self.handle_outline(job, &mut checkpoint).await?,
            PipelineStage::Author => self.handle_author(job, &mut checkpoint).await?,
            PipelineStage::Assess => self.handle_assess(job, &mut checkpoint).await?,
            PipelineStage::Persist => self.handle_persist(job, &mut checkpoint).await?,
        }
        Ok(checkpoint)
    }

    async fn handle_ingest(
        &self,
        job: &GenerationJob,
        checkpoint: &mut PipelineCheckpoint,
    ) -> AppResult<()> {
        let chunks = load_sources(&job.source_paths, &self.components.chunking).await?;
        let token_count = estimate_total_tokens(&chunks);
        let module_count = module_count_for(token_count);
        log::info!(
            "Job {}: {} chunks, ~{} tokens, targeting {} modules",
            job.id,
            chunks.len(),
            token_count,
            module_count
        );

        checkpoint.chunks = chunks;
        checkpoint.token_count = token_count;
        checkpoint.module_count = module_count;
        Ok(())
    }

    async fn handle_summarize(
        &self,
        job: &GenerationJob,
        checkpoint: &mut PipelineCheckpoint,
    ) -> AppResult<()> {
        log::info!("Job {}: summarizing {} chunks", job.id, checkpoint.chunks.len());
        checkpoint.chunk_summaries = self
            .components
            .summarizer
            .summarize(&checkpoint.chunks)
            .await?;
        Ok(())
    }

    async fn handle_index(
        &self,
        job: &GenerationJob,
        checkpoint: &mut PipelineCheckpoint,
    ) -> AppResult<()> {
        if checkpoint.chunks.len() != checkpoint.chunk_summaries.len() {
            return Err(AppError::InvariantViolation(format!(
                "{} chunks but {} summaries",
                checkpoint.chunks.len(),
                checkpoint.chunk_summaries.len()
            )));
        }

        let scope = job.scope();
        // A retried index stage must not leave vectors from the earlier run.
        let cleared = self.components.retriever.clear(&scope).await?;
        if cleared > 0 {
            log::warn!("Job {}: removed {} stale chunks before indexing", job.id, cleared);
        }

        let chunks = checkpoint
            .chunks
            .iter()
            .zip(&checkpoint.chunk_summaries)
            .map(|(text, summary)| Chunk::new(&scope, text, summary))
            .collect();
        checkpoint.chunk_ids = self.components.retriever.index_chunks(&scope, chunks).await?;
        Ok(())
    }

    async fn handle_outline(
        &self,
        job: &GenerationJob,
        checkpoint: &mut PipelineCheckpoint,
    ) -> AppResult<()> {
        let reduction = self
            .components
            .summarizer
            .reduce(checkpoint.chunk_summaries.clone())
            .await?;
        log::info!(
            "Job {}: course summary ready after {} reduction rounds",
            job.id,
            reduction.rounds
        );

        checkpoint.toc = self
            .components
            .toc
            .synthesize(&reduction.summary, checkpoint.module_count)
            .await?;
        Ok(())
    }

    async fn handle_author(
        &self,
        job: &GenerationJob,
        checkpoint: &mut PipelineCheckpoint,
    ) -> AppResult<()> {
        let scope = job.scope();
        checkpoint.modules = self
            .components
            .content
            .author_modules(&scope, &checkpoint.toc, |module| {
                self.events.publish(
                    &job.id,
                    JobEventKind::ModuleAuthored {
                        module_number: module.number,
                        title: module.title.clone(),
                    },
                );
            })
            .await?;
        Ok(())
    }

    async fn handle_assess(
        &self,
        job: &GenerationJob,
        checkpoint: &mut PipelineCheckpoint,
    ) -> AppResult<()> {
        log::info!("Job {}: generating question banks", job.id);
        checkpoint.modules = self
            .components
            .questions
            .assess_modules(checkpoint.modules.clone())
            .await?;
        Ok(())
    }

    async fn handle_persist(
        &self,
        job: &GenerationJob,
        checkpoint: &mut PipelineCheckpoint,
    ) -> AppResult<()> {
        let scope = job.scope();
        if let Some(existing) = self
            .courses
            .find_by_owner_and_title(&scope.owner, &scope.course)
            .await?
        {
            // Written by an earlier run of this job whose checkpoint save was lost.
            if checkpoint.course_id.as_deref() == Some(existing.id.as_str())
                || existing.modules == checkpoint.modules
            {
                checkpoint.course_id = Some(existing.id);
                return Ok(());
            }
            return Err(AppError::AlreadyExists(format!(
                "Course '{}' for owner {} was created by another job",
                scope.course, scope.owner
            )));
        }

        let course = self
            .courses
            .create(Course::new(&scope, checkpoint.modules.clone()))
            .await?;
        log::info!(
            "Job {}: persisted course {} with {} modules",
            job.id,
            course.id,
            course.modules.len()
        );
        checkpoint.course_id = Some(course.id);
        Ok(())
    }
}
