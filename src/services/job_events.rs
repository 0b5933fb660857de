use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::domain::PipelineStage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEventKind {
    JobStarted { resume_from: Option<PipelineStage> },
    StageStarted { stage: PipelineStage },
    StageCompleted { stage: PipelineStage },
    ModuleAuthored { module_number: u32, title: String },
    JobCompleted { course_id: Option<String> },
    JobFailed { stage: Option<PipelineStage>, error: String },
    JobCancelled,
}

/// Progress notification for one generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: String,
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: JobEventKind,
}

impl JobEvent {
    pub fn new(job_id: impl Into<String>, kind: JobEventKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Whether no further events follow for this job run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            JobEventKind::JobCompleted { .. }
                | JobEventKind::JobFailed { .. }
                | JobEventKind::JobCancelled
        )
    }

    pub fn to_sse(&self) -> String {
        format!(
            "id: {}\ndata: {}\n\n",
            self.id,
            serde_json::to_string(&self).unwrap_or_else(|_| "{}".to_string())
        )
    }
}

#[derive(Debug, Clone)]
pub struct JobEventBroadcaster {
    tx: broadcast::Sender<JobEvent>,
}

impl JobEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Sends to current subscribers; having none is not an error.
    pub fn publish(&self, job_id: &str, kind: JobEventKind) {
        let event = JobEvent::new(job_id, kind);
        if self.tx.send(event).is_err() {
            log::debug!("No subscribers for events of job {}", job_id);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(1024)
    }
}
