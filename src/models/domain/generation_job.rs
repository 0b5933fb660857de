use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::chunk::CourseScope;
use crate::models::domain::course::{Module, ModuleDescriptor};

/// Job status stored in MongoDB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_resumable(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Ingest,
    Summarize,
    Index,
    Outline,
    Author,
    Assess,
    Persist,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Ingest => "ingest",
            PipelineStage::Summarize => "summarize",
            PipelineStage::Index => "index",
            PipelineStage::Outline => "outline",
            PipelineStage::Author => "author",
            PipelineStage::Assess => "assess",
            PipelineStage::Persist => "persist",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a job step to be executed sequentially
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStep {
    pub id: String,
    pub stage: PipelineStage,
    pub description: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl JobStep {
    pub fn new(stage: PipelineStage) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stage,
            description: None,
            timeout_seconds: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

/// Everything a finished stage produced, so a resumed job skips it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineCheckpoint {
    #[serde(default)]
    pub chunks: Vec<String>,
    #[serde(default)]
    pub token_count: usize,
    #[serde(default)]
    pub module_count: usize,
    #[serde(default)]
    pub chunk_summaries: Vec<String>,
    #[serde(default)]
    pub chunk_ids: Vec<String>,
    #[serde(default)]
    pub toc: Vec<ModuleDescriptor>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub course_id: Option<String>,
}

/// Job document stored in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: String,
    pub owner: String,
    pub course_title: String,
    pub source_paths: Vec<String>,
    pub status: JobStatus,
    pub steps: Vec<JobStep>,
    pub current_step_index: usize,
    pub checkpoint: PipelineCheckpoint,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(scope: &CourseScope, source_paths: Vec<String>, steps: Vec<JobStep>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: scope.owner.clone(),
            course_title: scope.course.clone(),
            source_paths,
            status: JobStatus::Pending,
            steps,
            current_step_index: 0,
            checkpoint: PipelineCheckpoint::default(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn scope(&self) -> CourseScope {
        CourseScope::new(self.owner.clone(), self.course_title.clone())
    }

    pub fn get_current_step(&self) -> Option<&JobStep> {
        self.steps.get(self.current_step_index)
    }

    pub fn is_complete(&self) -> bool {
        self.current_step_index >= self.steps.len()
    }

    pub fn completed_stages(&self) -> Vec<PipelineStage> {
        self.steps
            .iter()
            .take(self.current_step_index)
            .map(|step| step.stage)
            .collect()
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.error_message = None;
        self.completed_at = None;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    pub fn advance(&mut self) {
        self.current_step_index += 1;
        if self.is_complete() {
            self.status = JobStatus::Completed;
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }
}
