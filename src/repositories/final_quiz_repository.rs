use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, FINAL_QUIZZES_COLLECTION},
    errors::AppResult,
    models::domain::FinalQuiz,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FinalQuizRepository: Send + Sync {
    /// Stores `quiz` as the only final quiz for its (course, user) pair.
    async fn replace_for_course_and_user(&self, quiz: FinalQuiz) -> AppResult<FinalQuiz>;
    async fn find_by_course_and_user(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> AppResult<Option<FinalQuiz>>;
    async fn delete_by_course(&self, course_id: &str) -> AppResult<u64>;
}

pub struct MongoFinalQuizRepository {
    collection: Collection<FinalQuiz>,
}

impl MongoFinalQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(FINAL_QUIZZES_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for final_quizzes collection");

        let course_user_index = IndexModel::builder()
            .keys(doc! { "course_id": 1, "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("course_user_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(course_user_index).await?;

        log::info!("Successfully created indexes for final_quizzes collection");
        Ok(())
    }
}

#[async_trait]
impl FinalQuizRepository for MongoFinalQuizRepository {
    async fn replace_for_course_and_user(&self, quiz: FinalQuiz) -> AppResult<FinalQuiz> {
        self.collection
            .replace_one(
                doc! { "course_id": &quiz.course_id, "user_id": &quiz.user_id },
                &quiz,
            )
            .upsert(true)
            .await?;
        Ok(quiz)
    }

    async fn find_by_course_and_user(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> AppResult<Option<FinalQuiz>> {
        let quiz = self
            .collection
            .find_one(doc! { "course_id": course_id, "user_id": user_id })
            .await?;
        Ok(quiz)
    }

    async fn delete_by_course(&self, course_id: &str) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "course_id": course_id })
            .await?;
        Ok(result.deleted_count)
    }
}
