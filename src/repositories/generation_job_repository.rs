use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, GENERATION_JOBS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::{GenerationJob, JobStatus},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationJobRepository: Send + Sync {
    async fn create(&self, job: GenerationJob) -> AppResult<GenerationJob>;
    async fn find_by_id(&self, job_id: &str) -> AppResult<Option<GenerationJob>>;
    /// Persists the whole job document, checkpoint included.
    async fn save(&self, job: &GenerationJob) -> AppResult<()>;
    async fn list(&self, status_filter: Option<JobStatus>) -> AppResult<Vec<GenerationJob>>;
}

pub struct MongoGenerationJobRepository {
    collection: Collection<GenerationJob>,
}

impl MongoGenerationJobRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(GENERATION_JOBS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for generation_jobs collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder().keys(doc! { "status": 1 }).build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(status_index).await?;

        log::info!("Successfully created indexes for generation_jobs collection");
        Ok(())
    }
}

#[async_trait]
impl GenerationJobRepository for MongoGenerationJobRepository {
    async fn create(&self, job: GenerationJob) -> AppResult<GenerationJob> {
        self.collection.insert_one(&job).await?;
        Ok(job)
    }

    async fn find_by_id(&self, job_id: &str) -> AppResult<Option<GenerationJob>> {
        let job = self.collection.find_one(doc! { "id": job_id }).await?;
        Ok(job)
    }

    async fn save(&self, job: &GenerationJob) -> AppResult<()> {
        let result = self
            .collection
            .replace_one(doc! { "id": &job.id }, job)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Generation job {}", job.id)));
        }
        Ok(())
    }

    async fn list(&self, status_filter: Option<JobStatus>) -> AppResult<Vec<GenerationJob>> {
        let filter = match status_filter {
            Some(status) => doc! { "status": status.to_string() },
            None => doc! {},
        };

        let jobs = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(jobs)
    }
}
