#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use coursegen_server::{
    errors::{AppError, AppResult},
    models::domain::{Chunk, Course, CourseScope, FinalQuiz, GenerationJob, JobStatus, QuizAttempt},
    repositories::{
        chunk_repository::order_by_ids, ChunkRepository, CourseRepository, FinalQuizRepository,
        GenerationJobRepository, QuizAttemptRepository,
    },
    services::{completion::CompletionService, embedding::Embedder},
};

#[derive(Default)]
pub struct InMemoryCourseRepository {
    courses: RwLock<HashMap<String, Course>>,
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn create(&self, course: Course) -> AppResult<Course> {
        let mut courses = self.courses.write().await;
        if courses
            .values()
            .any(|c| c.owner == course.owner && c.title == course.title)
        {
            return Err(AppError::AlreadyExists(format!(
                "Course '{}' for owner '{}'",
                course.title, course.owner
            )));
        }
        courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>> {
        Ok(self.courses.read().await.get(id).cloned())
    }

    async fn find_by_owner_and_title(&self, owner: &str, title: &str) -> AppResult<Option<Course>> {
        Ok(self
            .courses
            .read()
            .await
            .values()
            .find(|c| c.owner == owner && c.title == title)
            .cloned())
    }

    async fn delete_by_owner_and_title(&self, owner: &str, title: &str) -> AppResult<u64> {
        let mut courses = self.courses.write().await;
        let before = courses.len();
        courses.retain(|_, c| !(c.owner == owner && c.title == title));
        Ok((before - courses.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryGenerationJobRepository {
    jobs: RwLock<HashMap<String, GenerationJob>>,
}

#[async_trait]
impl GenerationJobRepository for InMemoryGenerationJobRepository {
    async fn create(&self, job: GenerationJob) -> AppResult<GenerationJob> {
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, job_id: &str) -> AppResult<Option<GenerationJob>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn save(&self, job: &GenerationJob) -> AppResult<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id) {
            Some(stored) => {
                *stored = job.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Generation job {}", job.id))),
        }
    }

    async fn list(&self, status_filter: Option<JobStatus>) -> AppResult<Vec<GenerationJob>> {
        let mut jobs: Vec<GenerationJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| status_filter.map_or(true, |status| job.status == status))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}

#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: RwLock<Vec<QuizAttempt>>,
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        self.attempts.write().await.push(attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        Ok(self.attempts.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_course_and_user(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .filter(|a| a.course_id == course_id && a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_by_course(&self, course_id: &str) -> AppResult<u64> {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|a| a.course_id != course_id);
        Ok((before - attempts.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryFinalQuizRepository {
    quizzes: RwLock<Vec<FinalQuiz>>,
}

#[async_trait]
impl FinalQuizRepository for InMemoryFinalQuizRepository {
    async fn replace_for_course_and_user(&self, quiz: FinalQuiz) -> AppResult<FinalQuiz> {
        let mut quizzes = self.quizzes.write().await;
        quizzes.retain(|q| !(q.course_id == quiz.course_id && q.user_id == quiz.user_id));
        quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn find_by_course_and_user(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> AppResult<Option<FinalQuiz>> {
        Ok(self
            .quizzes
            .read()
            .await
            .iter()
            .find(|q| q.course_id == course_id && q.user_id == user_id)
            .cloned())
    }

    async fn delete_by_course(&self, course_id: &str) -> AppResult<u64> {
        let mut quizzes = self.quizzes.write().await;
        let before = quizzes.len();
        quizzes.retain(|q| q.course_id != course_id);
        Ok((before - quizzes.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryChunkRepository {
    chunks: RwLock<Vec<Chunk>>,
}

#[async_trait]
impl ChunkRepository for InMemoryChunkRepository {
    async fn insert_many(&self, chunks: Vec<Chunk>) -> AppResult<usize> {
        let count = chunks.len();
        self.chunks.write().await.extend(chunks);
        Ok(count)
    }

    async fn find_by_ids(&self, scope: &CourseScope, ids: &[String]) -> AppResult<Vec<Chunk>> {
        let found = self
            .chunks
            .read()
            .await
            .iter()
            .filter(|c| c.belongs_to(scope) && ids.contains(&c.id))
            .cloned()
            .collect();
        Ok(order_by_ids(found, ids))
    }

    async fn count_by_scope(&self, scope: &CourseScope) -> AppResult<u64> {
        Ok(self.chunks.read().await.iter().filter(|c| c.belongs_to(scope)).count() as u64)
    }

    async fn delete_by_scope(&self, scope: &CourseScope) -> AppResult<u64> {
        let mut chunks = self.chunks.write().await;
        let before = chunks.len();
        chunks.retain(|c| !c.belongs_to(scope));
        Ok((before - chunks.len()) as u64)
    }
}

pub const EMBEDDING_DIMENSION: usize = 32;

/// Bag-of-words embedding: texts sharing words land close together.
pub struct HashingEmbedder;

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vector = vec![0.0f32; EMBEDDING_DIMENSION];
        for word in text.split_whitespace() {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % EMBEDDING_DIMENSION] += 1.0;
        }
        if vector.iter().all(|v| *v == 0.0) {
            vector[0] = 1.0;
        }
        Ok(vector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Summary,
    Toc,
    Content,
    QuestionBank,
    Selection,
    FinalExam,
}

impl PromptKind {
    pub fn of(prompt: &str) -> Option<Self> {
        if prompt.contains("tasked with summarizing text") {
            Some(PromptKind::Summary)
        } else if prompt.contains("high-level course outline") {
            Some(PromptKind::Toc)
        } else if prompt.contains("**Current Module Summary:**") {
            Some(PromptKind::Content)
        } else if prompt.contains("multiple-choice questions (MCQs)") {
            Some(PromptKind::QuestionBank)
        } else if prompt.contains("personalized quiz") {
            Some(PromptKind::Selection)
        } else if prompt.contains("part of a final exam") {
            Some(PromptKind::FinalExam)
        } else {
            None
        }
    }
}

/// Number following `marker` in `prompt`, e.g. "exactly 7".
fn number_after(prompt: &str, marker: &str) -> Option<usize> {
    let rest = &prompt[prompt.find(marker)? + marker.len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

pub fn mcq_block(count: usize, prefix: &str) -> String {
    (1..=count)
        .map(|i| {
            format!(
                "{i}. {prefix} question {i}?\na) alpha\nb) beta\nc) gamma\nd) delta\nAnswer: c\n"
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministic model that answers every prompt kind the services send.
#[derive(Default)]
pub struct ScriptedCompletion {
    calls: RwLock<HashMap<PromptKind, usize>>,
    pub fail_content: AtomicBool,
    pub total_calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn calls(&self, kind: PromptKind) -> usize {
        self.calls.read().await.get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let kind = PromptKind::of(prompt)
            .ok_or_else(|| AppError::UpstreamError("unrecognised prompt".to_string()))?;
        *self.calls.write().await.entry(kind).or_default() += 1;

        match kind {
            PromptKind::Summary => {
                let text = prompt.rsplit("Text chunk:\n").next().unwrap_or_default();
                let words: Vec<&str> = text.split_whitespace().take(6).collect();
                Ok(format!("Summary: {}", words.join(" ")))
            }
            PromptKind::Toc => {
                // "Exactly {min}-{max} modules": answer with the maximum.
                let count = prompt
                    .find("Exactly ")
                    .and_then(|start| number_after(&prompt[start..], "-"))
                    .unwrap_or(2);
                Ok((1..=count)
                    .map(|i| {
                        format!(
                            "**Module {i}: Topic {i}**\nSummary: Attention heads and topic {i} keywords.\n"
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            PromptKind::Content => {
                if self.fail_content.load(Ordering::SeqCst) {
                    return Err(AppError::UpstreamError("content model unavailable".to_string()));
                }
                let summary = prompt
                    .split("**Current Module Summary:**\n")
                    .nth(1)
                    .and_then(|rest| rest.lines().next())
                    .unwrap_or_default();
                Ok(format!("## Lesson\n\n{}", summary))
            }
            PromptKind::QuestionBank => Ok(mcq_block(20, "Bank")),
            PromptKind::Selection => {
                let count = number_after(prompt, "select **exactly ").unwrap_or(0);
                Ok((1..=count).map(|n| n.to_string()).collect::<Vec<_>>().join(", "))
            }
            PromptKind::FinalExam => {
                let count = number_after(prompt, "Generate exactly ").unwrap_or(0);
                Ok(mcq_block(count, "Final"))
            }
        }
    }
}
