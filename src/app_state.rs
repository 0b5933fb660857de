use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{Config, VectorBackend},
    db::Database,
    errors::AppResult,
    repositories::{
        ChunkRepository, CourseRepository, FinalQuizRepository, GenerationJobRepository,
        MongoChunkRepository, MongoCourseRepository, MongoFinalQuizRepository,
        MongoGenerationJobRepository, MongoQuizAttemptRepository, QuizAttemptRepository,
    },
    services::{
        chunker::ChunkingOptions,
        completion::{CompletionService, OpenAiCompletionService, RetryingCompletionService},
        content_generator::ContentGenerator,
        course_pipeline::{CoursePipeline, PipelineComponents},
        course_service::CourseService,
        embedding::{Embedder, HttpEmbedder},
        final_exam_allocator::FinalExamAllocator,
        job_events::JobEventBroadcaster,
        job_runner::JobRunner,
        module_quiz_selector::ModuleQuizSelector,
        question_bank::QuestionBankGenerator,
        quiz_attempt_service::QuizAttemptService,
        quiz_service::QuizService,
        retrieval::ChunkRetriever,
        session_store::{InMemorySessionStore, SessionStore},
        summarizer::Summarizer,
        toc_synthesizer::TocSynthesizer,
    },
    vector::{memory::InMemoryVectorIndex, qdrant::QdrantVectorIndex, VectorIndex},
};

/// Storage and model adapters the services are built from.
pub struct Backends {
    pub courses: Arc<dyn CourseRepository>,
    pub jobs: Arc<dyn GenerationJobRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub final_quizzes: Arc<dyn FinalQuizRepository>,
    pub chunks: Arc<dyn ChunkRepository>,
    pub vector_index: Arc<dyn VectorIndex>,
    pub embedder: Arc<dyn Embedder>,
    /// Serves TOC synthesis, module content and quiz selection.
    pub completion: Arc<dyn CompletionService>,
    /// Serves chunk summaries, question banks and final exam questions.
    pub light_completion: Arc<dyn CompletionService>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub course_service: Arc<CourseService>,
    pub quiz_service: Arc<QuizService>,
    pub quiz_attempt_service: Arc<QuizAttemptService>,
    pub job_runner: Arc<JobRunner>,
    pub events: JobEventBroadcaster,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let courses = Arc::new(MongoCourseRepository::new(&db));
        courses.ensure_indexes().await?;
        let jobs = Arc::new(MongoGenerationJobRepository::new(&db));
        jobs.ensure_indexes().await?;
        let attempts = Arc::new(MongoQuizAttemptRepository::new(&db));
        attempts.ensure_indexes().await?;
        let final_quizzes = Arc::new(MongoFinalQuizRepository::new(&db));
        final_quizzes.ensure_indexes().await?;
        let chunks = Arc::new(MongoChunkRepository::new(&db));
        chunks.ensure_indexes().await?;

        let vector_index: Arc<dyn VectorIndex> = match config.vector_backend {
            VectorBackend::Qdrant => Arc::new(QdrantVectorIndex::from_config(&config)?),
            VectorBackend::Memory => {
                log::warn!("Using in-memory vector index; indexes are lost on restart");
                Arc::new(InMemoryVectorIndex::new())
            }
        };

        let embedder = Arc::new(HttpEmbedder::new(
            config.embedding_api_base.clone(),
            config.embedding_api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?);

        let backends = Backends {
            courses,
            jobs,
            attempts,
            final_quizzes,
            chunks,
            vector_index,
            embedder,
            completion: Self::retrying(&config, &config.llm_model),
            light_completion: Self::retrying(&config, &config.llm_small_model),
        };

        let state = Self::from_backends(config, db, backends);
        state.job_runner.recover_interrupted().await?;
        Ok(state)
    }

    fn retrying(config: &Config, model: &str) -> Arc<dyn CompletionService> {
        let client = Arc::new(OpenAiCompletionService::new(
            &config.llm_api_base,
            &config.llm_api_key,
            model,
        ));
        Arc::new(RetryingCompletionService::new(
            client,
            config.completion_max_retries,
            Duration::from_millis(config.completion_retry_base_ms),
        ))
    }

    /// Wires every service on top of the given adapters.
    pub fn from_backends(config: Config, db: Database, backends: Backends) -> Self {
        let concurrency = config.generation_concurrency;
        let events = JobEventBroadcaster::default();

        let retriever = Arc::new(ChunkRetriever::new(
            backends.embedder,
            backends.vector_index,
            backends.chunks,
            concurrency,
        ));

        let components = PipelineComponents {
            retriever: retriever.clone(),
            summarizer: Arc::new(Summarizer::new(
                backends.light_completion.clone(),
                config.context_window_threshold,
                config.summary_group_size,
                config.max_reduction_rounds,
                concurrency,
            )),
            toc: Arc::new(TocSynthesizer::new(backends.completion.clone())),
            content: Arc::new(ContentGenerator::new(
                backends.completion.clone(),
                retriever.clone(),
                config.retrieval_top_k,
                concurrency,
            )),
            questions: Arc::new(QuestionBankGenerator::new(
                backends.light_completion.clone(),
                concurrency,
            )),
            chunking: ChunkingOptions::default(),
        };

        let pipeline = Arc::new(CoursePipeline::new(
            backends.jobs.clone(),
            backends.courses.clone(),
            components,
            events.clone(),
        ));
        let job_runner = Arc::new(JobRunner::new(pipeline, backends.jobs.clone()));

        let course_service = Arc::new(CourseService::new(
            backends.courses.clone(),
            backends.jobs,
            backends.attempts.clone(),
            backends.final_quizzes.clone(),
            retriever,
            job_runner.clone(),
        ));
        let quiz_service = Arc::new(QuizService::new(
            backends.courses.clone(),
            backends.attempts.clone(),
            backends.final_quizzes,
            ModuleQuizSelector::new(backends.completion, config.module_quiz_size),
            FinalExamAllocator::new(
                backends.light_completion,
                config.final_exam_total,
                concurrency,
            ),
        ));
        let quiz_attempt_service = Arc::new(QuizAttemptService::new(
            backends.attempts,
            backends.courses,
        ));

        Self {
            db,
            course_service,
            quiz_service,
            quiz_attempt_service,
            job_runner,
            events,
            sessions: Arc::new(InMemorySessionStore::new()),
            config: Arc::new(config),
        }
    }
}
