use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, COURSES_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::Course,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, course: Course) -> AppResult<Course>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>>;
    async fn find_by_owner_and_title(&self, owner: &str, title: &str) -> AppResult<Option<Course>>;
    async fn delete_by_owner_and_title(&self, owner: &str, title: &str) -> AppResult<u64>;
}

pub struct MongoCourseRepository {
    collection: Collection<Course>,
}

impl MongoCourseRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(COURSES_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for courses collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let owner_title_index = IndexModel::builder()
            .keys(doc! { "owner": 1, "title": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("owner_title_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(owner_title_index).await?;

        log::info!("Successfully created indexes for courses collection");
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for MongoCourseRepository {
    async fn create(&self, course: Course) -> AppResult<Course> {
        if self
            .find_by_owner_and_title(&course.owner, &course.title)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(format!(
                "Course '{}' for owner '{}'",
                course.title, course.owner
            )));
        }

        self.collection.insert_one(&course).await?;
        Ok(course)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>> {
        let course = self.collection.find_one(doc! { "id": id }).await?;
        Ok(course)
    }

    async fn find_by_owner_and_title(&self, owner: &str, title: &str) -> AppResult<Option<Course>> {
        let course = self
            .collection
            .find_one(doc! { "owner": owner, "title": title })
            .await?;
        Ok(course)
    }

    async fn delete_by_owner_and_title(&self, owner: &str, title: &str) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "owner": owner, "title": title })
            .await?;
        Ok(result.deleted_count)
    }
}
