mod common;

use std::sync::{atomic::Ordering, Arc};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use coursegen_server::{
    errors::{AppError, AppResult},
    models::{
        domain::{Chunk, CourseScope, GenerationJob, JobStatus, PipelineStage},
        dto::request::{
            AnswerInput, DeleteCourseRequest, FinalQuizRequest, GenerateCourseRequest,
            ModuleQuizRequest, RecordAttemptRequest,
        },
    },
    repositories::{
        ChunkRepository, CourseRepository, FinalQuizRepository, GenerationJobRepository,
        QuizAttemptRepository,
    },
    services::{
        chunker::ChunkingOptions,
        completion::CompletionService,
        content_generator::ContentGenerator,
        course_pipeline::{CoursePipeline, PipelineComponents},
        course_service::CourseService,
        final_exam_allocator::FinalExamAllocator,
        job_events::{JobEvent, JobEventBroadcaster, JobEventKind},
        job_runner::JobRunner,
        module_quiz_selector::ModuleQuizSelector,
        orchestrator_steps::create_course_generation_steps,
        question_bank::QuestionBankGenerator,
        quiz_attempt_service::QuizAttemptService,
        quiz_service::QuizService,
        retrieval::ChunkRetriever,
        summarizer::Summarizer,
        toc_synthesizer::TocSynthesizer,
    },
    vector::{memory::InMemoryVectorIndex, VectorIndex},
};

use common::{
    HashingEmbedder, InMemoryChunkRepository, InMemoryCourseRepository,
    InMemoryFinalQuizRepository, InMemoryGenerationJobRepository, InMemoryQuizAttemptRepository,
    PromptKind, ScriptedCompletion,
};

const SOURCE: &str = "# Attention\n\
Attention lets a model weigh every token of the input when producing an output.\n\n\
# Multi-head attention\n\
Several attention heads run in parallel and their outputs are concatenated.\n\n\
# Positional encoding\n\
Sinusoidal encodings add order information to token embeddings.\n";

/// Writes `text` to a fresh file under the system temp dir.
fn source_file(text: &str) -> String {
    let path = std::env::temp_dir().join(format!("coursegen-{}.md", uuid::Uuid::new_v4()));
    std::fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

fn small_chunks() -> ChunkingOptions {
    ChunkingOptions {
        combine_under_chars: 10,
        new_after_chars: 40,
        max_chars: 200,
    }
}

struct Harness {
    courses: Arc<InMemoryCourseRepository>,
    jobs: Arc<InMemoryGenerationJobRepository>,
    attempts: Arc<InMemoryQuizAttemptRepository>,
    final_quizzes: Arc<InMemoryFinalQuizRepository>,
    chunks: Arc<InMemoryChunkRepository>,
    index: Arc<InMemoryVectorIndex>,
    retriever: Arc<ChunkRetriever>,
    pipeline: Arc<CoursePipeline>,
    runner: Arc<JobRunner>,
    events: JobEventBroadcaster,
}

impl Harness {
    fn new(completion: Arc<dyn CompletionService>) -> Self {
        let courses = Arc::new(InMemoryCourseRepository::default());
        let jobs = Arc::new(InMemoryGenerationJobRepository::default());
        let attempts = Arc::new(InMemoryQuizAttemptRepository::default());
        let final_quizzes = Arc::new(InMemoryFinalQuizRepository::default());
        let chunks = Arc::new(InMemoryChunkRepository::default());
        let index = Arc::new(InMemoryVectorIndex::new());
        let events = JobEventBroadcaster::new(256);

        let retriever = Arc::new(ChunkRetriever::new(
            Arc::new(HashingEmbedder),
            index.clone(),
            chunks.clone(),
            2,
        ));
        let components = PipelineComponents {
            retriever: retriever.clone(),
            summarizer: Arc::new(Summarizer::new(completion.clone(), 100_000, 4, 8, 2)),
            toc: Arc::new(TocSynthesizer::new(completion.clone())),
            content: Arc::new(ContentGenerator::new(
                completion.clone(),
                retriever.clone(),
                2,
                2,
            )),
            questions: Arc::new(QuestionBankGenerator::new(completion, 2)),
            chunking: small_chunks(),
        };
        let pipeline = Arc::new(CoursePipeline::new(
            jobs.clone(),
            courses.clone(),
            components,
            events.clone(),
        ));
        let runner = Arc::new(JobRunner::new(pipeline.clone(), jobs.clone()));

        Self {
            courses,
            jobs,
            attempts,
            final_quizzes,
            chunks,
            index,
            retriever,
            pipeline,
            runner,
            events,
        }
    }

    fn course_service(&self) -> CourseService {
        CourseService::new(
            self.courses.clone(),
            self.jobs.clone(),
            self.attempts.clone(),
            self.final_quizzes.clone(),
            self.retriever.clone(),
            self.runner.clone(),
        )
    }

    fn quiz_service(&self, completion: Arc<dyn CompletionService>) -> QuizService {
        QuizService::new(
            self.courses.clone(),
            self.attempts.clone(),
            self.final_quizzes.clone(),
            ModuleQuizSelector::new(completion.clone(), 10),
            FinalExamAllocator::new(completion, 30, 2),
        )
    }

    async fn insert_job(&self, scope: &CourseScope, source: String) -> GenerationJob {
        self.jobs
            .create(GenerationJob::new(
                scope,
                vec![source],
                create_course_generation_steps(),
            ))
            .await
            .unwrap()
    }
}

fn drain(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEventKind> {
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind);
    }
    kinds
}

async fn wait_for_terminal(rx: &mut broadcast::Receiver<JobEvent>, job_id: &str) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.job_id == job_id && event.is_terminal() {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn pipeline_builds_course_and_reports_every_stage() {
    let completion = ScriptedCompletion::new();
    let harness = Harness::new(completion.clone());
    let scope = CourseScope::new("alice", "Transformers");
    let job = harness.insert_job(&scope, source_file(SOURCE)).await;
    let mut rx = harness.events.subscribe();

    let finished = harness.pipeline.run(&job.id).await.unwrap();

    assert_eq!(finished.status, JobStatus::Completed);
    assert!(finished.error_message.is_none());
    let course_id = finished.checkpoint.course_id.clone().unwrap();

    let course = harness.courses.find_by_id(&course_id).await.unwrap().unwrap();
    assert_eq!(course.owner, "alice");
    assert_eq!(course.title, "Transformers");
    assert_eq!(course.modules.len(), finished.checkpoint.module_count);
    for (i, module) in course.modules.iter().enumerate() {
        assert_eq!(module.number as usize, i + 1);
        assert!(module.content.starts_with("## Lesson"));
        assert_eq!(module.questions.len(), 20);
        assert!(!module.bank_snapshot_id.is_empty());
    }

    let chunk_count = finished.checkpoint.chunks.len();
    assert!(chunk_count > 1);
    assert_eq!(finished.checkpoint.chunk_summaries.len(), chunk_count);
    assert_eq!(finished.checkpoint.chunk_ids.len(), chunk_count);
    assert_eq!(harness.index.count(&scope).await.unwrap(), chunk_count as u64);
    assert_eq!(harness.chunks.count_by_scope(&scope).await.unwrap(), chunk_count as u64);
    assert_eq!(completion.calls(PromptKind::Summary).await, chunk_count);

    let events = drain(&mut rx);
    assert_eq!(
        events.first(),
        Some(&JobEventKind::JobStarted {
            resume_from: Some(PipelineStage::Ingest)
        })
    );
    let completed: Vec<PipelineStage> = events
        .iter()
        .filter_map(|kind| match kind {
            JobEventKind::StageCompleted { stage } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        completed,
        vec![
            PipelineStage::Ingest,
            PipelineStage::Summarize,
            PipelineStage::Index,
            PipelineStage::Outline,
            PipelineStage::Author,
            PipelineStage::Assess,
            PipelineStage::Persist,
        ]
    );
    let authored = events
        .iter()
        .filter(|kind| matches!(kind, JobEventKind::ModuleAuthored { .. }))
        .count();
    assert_eq!(authored, course.modules.len());
    assert_eq!(
        events.last(),
        Some(&JobEventKind::JobCompleted {
            course_id: Some(course_id)
        })
    );
}

#[tokio::test]
async fn failed_job_resumes_at_failed_stage_without_repeating_work() {
    let completion = ScriptedCompletion::new();
    completion.fail_content.store(true, Ordering::SeqCst);
    let harness = Harness::new(completion.clone());
    let scope = CourseScope::new("alice", "Transformers");
    let job = harness.insert_job(&scope, source_file(SOURCE)).await;
    let mut rx = harness.events.subscribe();

    let result = harness.pipeline.run(&job.id).await;
    assert!(matches!(result, Err(AppError::UpstreamError(_))));

    let failed = harness.jobs.find_by_id(&job.id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.get_current_step().map(|s| s.stage), Some(PipelineStage::Author));
    assert!(failed.error_message.as_deref().unwrap().contains("author"));
    assert!(failed.checkpoint.modules.is_empty());
    assert!(!failed.checkpoint.toc.is_empty());
    assert!(matches!(
        drain(&mut rx).last(),
        Some(JobEventKind::JobFailed {
            stage: Some(PipelineStage::Author),
            ..
        })
    ));

    let summaries_before = completion.calls(PromptKind::Summary).await;
    let outlines_before = completion.calls(PromptKind::Toc).await;
    completion.fail_content.store(false, Ordering::SeqCst);

    let resumed = harness.pipeline.run(&job.id).await.unwrap();

    assert_eq!(resumed.status, JobStatus::Completed);
    assert!(resumed.error_message.is_none());
    assert_eq!(completion.calls(PromptKind::Summary).await, summaries_before);
    assert_eq!(completion.calls(PromptKind::Toc).await, outlines_before);
    assert_eq!(
        drain(&mut rx).first(),
        Some(&JobEventKind::JobStarted {
            resume_from: Some(PipelineStage::Author)
        })
    );
    assert!(harness
        .courses
        .find_by_owner_and_title("alice", "Transformers")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn rerunning_completed_job_is_a_no_op() {
    let completion = ScriptedCompletion::new();
    let harness = Harness::new(completion.clone());
    let job = harness
        .insert_job(&CourseScope::new("alice", "Transformers"), source_file(SOURCE))
        .await;

    harness.pipeline.run(&job.id).await.unwrap();
    let calls = completion.total_calls.load(Ordering::SeqCst);
    let again = harness.pipeline.run(&job.id).await.unwrap();

    assert_eq!(again.status, JobStatus::Completed);
    assert_eq!(completion.total_calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn missing_source_fails_ingest() {
    let harness = Harness::new(ScriptedCompletion::new());
    let job = harness
        .insert_job(
            &CourseScope::new("alice", "Ghost"),
            "/nonexistent/coursegen/source.md".to_string(),
        )
        .await;

    let result = harness.pipeline.run(&job.id).await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
    let failed = harness.jobs.find_by_id(&job.id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.current_step_index, 0);
}

#[tokio::test]
async fn retrieval_never_crosses_course_scopes() {
    let harness = Harness::new(ScriptedCompletion::new());
    let alice_rust = CourseScope::new("alice", "Rust");
    let alice_go = CourseScope::new("alice", "Go");
    let bob_rust = CourseScope::new("bob", "Rust");

    for scope in [&alice_rust, &alice_go, &bob_rust] {
        let chunks = vec![
            Chunk::new(scope, "ownership text", "ownership and borrowing"),
            Chunk::new(scope, "lifetime text", "lifetimes of references"),
        ];
        harness.retriever.index_chunks(scope, chunks).await.unwrap();
    }

    let hits = harness
        .retriever
        .retrieve(&alice_rust, "ownership and borrowing", 10)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|chunk| chunk.belongs_to(&alice_rust)));
    assert_eq!(hits[0].summary, "ownership and borrowing");

    assert_eq!(harness.retriever.clear(&alice_rust).await.unwrap(), 2);
    assert_eq!(harness.retriever.indexed_count(&alice_rust).await.unwrap(), 0);
    assert_eq!(harness.retriever.indexed_count(&bob_rust).await.unwrap(), 2);
}

#[tokio::test]
async fn short_summaries_reduce_without_model_calls() {
    let completion = ScriptedCompletion::new();
    let summarizer = Summarizer::new(completion.clone(), 1_000, 4, 8, 2);
    let summaries: Vec<String> = (1..=4).map(|i| format!("summary {}", i)).collect();

    let reduction = summarizer.reduce(summaries).await.unwrap();

    assert_eq!(reduction.rounds, 0);
    assert_eq!(reduction.summary, "summary 1\nsummary 2\nsummary 3\nsummary 4");
    assert_eq!(completion.total_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generated_course_supports_full_quiz_flow() {
    let completion = ScriptedCompletion::new();
    let harness = Harness::new(completion.clone());
    let courses = harness.course_service();
    let mut rx = harness.events.subscribe();

    let job = courses
        .start_generation(GenerateCourseRequest {
            owner: "alice".to_string(),
            title: "Transformers".to_string(),
            source_paths: vec![source_file(SOURCE)],
        })
        .await
        .unwrap();
    let terminal = wait_for_terminal(&mut rx, &job.id).await;
    let JobEventKind::JobCompleted {
        course_id: Some(course_id),
    } = terminal.kind
    else {
        panic!("job did not complete: {:?}", terminal.kind);
    };
    let course = courses.get_course(&course_id).await.unwrap();

    let recorder = QuizAttemptService::new(harness.attempts.clone(), harness.courses.clone());
    let mut first_attempt = None;
    for module in &course.modules {
        let attempt = recorder
            .record_attempt(RecordAttemptRequest {
                course_id: course_id.clone(),
                user_id: "bob".to_string(),
                module_number: module.number,
                answers: vec![
                    AnswerInput {
                        question_index: 3,
                        is_correct: Some(module.number != 1),
                    },
                    AnswerInput {
                        question_index: 4,
                        is_correct: Some(true),
                    },
                ],
                is_completed: true,
            })
            .await
            .unwrap();
        first_attempt.get_or_insert(attempt);
    }

    let quizzes = harness.quiz_service(completion.clone());
    let module_quiz = quizzes
        .generate_module_quiz(ModuleQuizRequest {
            attempt_id: first_attempt.unwrap().id,
        })
        .await
        .unwrap()
        .generated()
        .unwrap();
    assert_eq!(module_quiz.module_number, 1);
    assert_eq!(module_quiz.answers.len(), 10);
    assert!(module_quiz.question_indices().contains(&3));
    assert!(!module_quiz.is_completed);

    let final_quiz = quizzes
        .generate_final_quiz(FinalQuizRequest {
            course_id: course_id.clone(),
            user_id: "bob".to_string(),
        })
        .await
        .unwrap()
        .generated()
        .unwrap();
    assert_eq!(final_quiz.requested_total(), 30);
    assert_eq!(final_quiz.questions.len(), 30);
    assert_eq!(final_quiz.sections.len(), course.modules.len());
    assert!(final_quiz.sections[0].requested >= final_quiz.sections[1].requested);

    let stored = quizzes.get_final_quiz(&course_id, "bob").await.unwrap();
    assert_eq!(stored.id, final_quiz.id);

    let deleted = courses
        .delete_course(DeleteCourseRequest {
            owner: "alice".to_string(),
            title: "Transformers".to_string(),
        })
        .await
        .unwrap();
    assert!(deleted.course_deleted);
    assert!(harness.courses.find_by_id(&course_id).await.unwrap().is_none());
    assert!(harness
        .attempts
        .find_by_course_and_user(&course_id, "bob")
        .await
        .unwrap()
        .is_empty());
    assert!(quizzes.get_final_quiz(&course_id, "bob").await.is_err());
    assert_eq!(
        harness
            .retriever
            .indexed_count(&CourseScope::new("alice", "Transformers"))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn second_generation_for_same_course_is_rejected() {
    let harness = Harness::new(ScriptedCompletion::new());
    let courses = harness.course_service();
    let mut rx = harness.events.subscribe();
    let request = || GenerateCourseRequest {
        owner: "alice".to_string(),
        title: "Transformers".to_string(),
        source_paths: vec![source_file(SOURCE)],
    };

    let job = courses.start_generation(request()).await.unwrap();
    wait_for_terminal(&mut rx, &job.id).await;

    let again = courses.start_generation(request()).await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));
    assert_eq!(courses.list_jobs(None).await.unwrap().len(), 1);
}

/// Model that never answers, so jobs stay in their first model-bound stage.
struct StalledCompletion;

#[async_trait]
impl CompletionService for StalledCompletion {
    async fn complete(&self, _prompt: &str) -> AppResult<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(AppError::Timeout("stalled".to_string()))
    }
}

#[tokio::test]
async fn cancelling_running_job_keeps_finished_stages() {
    let harness = Harness::new(Arc::new(StalledCompletion));
    let job = harness
        .insert_job(&CourseScope::new("alice", "Transformers"), source_file(SOURCE))
        .await;
    let mut rx = harness.events.subscribe();

    harness.runner.spawn(&job.id).await;
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let JobEventKind::StageStarted {
                stage: PipelineStage::Summarize,
            } = rx.recv().await.unwrap().kind
            {
                break;
            }
        }
    })
    .await
    .unwrap();
    assert!(harness.runner.is_running(&job.id).await);

    let cancelled = harness.runner.cancel(&job.id).await.unwrap();

    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert_eq!(cancelled.completed_stages(), vec![PipelineStage::Ingest]);
    assert!(!cancelled.checkpoint.chunks.is_empty());
    assert!(!harness.runner.is_running(&job.id).await);
    assert_eq!(
        wait_for_terminal(&mut rx, &job.id).await.kind,
        JobEventKind::JobCancelled
    );

    let stored = harness.jobs.find_by_id(&job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Cancelled);
    assert!(stored.status.is_resumable());

    let twice = harness.runner.cancel(&job.id).await;
    assert!(matches!(twice, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn interrupted_jobs_are_marked_failed_on_recovery() {
    let harness = Harness::new(ScriptedCompletion::new());
    let scope = CourseScope::new("alice", "Transformers");
    let mut job = harness.insert_job(&scope, source_file(SOURCE)).await;
    job.mark_running();
    job.advance();
    harness.jobs.save(&job).await.unwrap();
    harness.insert_job(&CourseScope::new("bob", "Go"), source_file(SOURCE)).await;

    let recovered = harness.runner.recover_interrupted().await.unwrap();

    assert_eq!(recovered, 2);
    let failed = harness.jobs.list(Some(JobStatus::Failed)).await.unwrap();
    assert_eq!(failed.len(), 2);
    let resumed_from = harness.jobs.find_by_id(&job.id).await.unwrap().unwrap();
    assert_eq!(resumed_from.current_step_index, 1);
    assert!(resumed_from
        .error_message
        .as_deref()
        .unwrap()
        .contains("interrupted"));
}
