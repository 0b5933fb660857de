use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, CHUNKS_COLLECTION},
    errors::AppResult,
    models::domain::{Chunk, CourseScope},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    async fn insert_many(&self, chunks: Vec<Chunk>) -> AppResult<usize>;
    /// Returns the chunks in the order of `ids`, skipping ids outside `scope`.
    async fn find_by_ids(&self, scope: &CourseScope, ids: &[String]) -> AppResult<Vec<Chunk>>;
    async fn count_by_scope(&self, scope: &CourseScope) -> AppResult<u64>;
    async fn delete_by_scope(&self, scope: &CourseScope) -> AppResult<u64>;
}

pub struct MongoChunkRepository {
    collection: Collection<Chunk>,
}

impl MongoChunkRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(CHUNKS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for chunks collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let scope_index = IndexModel::builder()
            .keys(doc! { "owner": 1, "course": 1 })
            .options(IndexOptions::builder().name("owner_course".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(scope_index).await?;

        log::info!("Successfully created indexes for chunks collection");
        Ok(())
    }
}

/// Reorders `chunks` to follow `ids`; unknown ids are dropped.
pub fn order_by_ids(chunks: Vec<Chunk>, ids: &[String]) -> Vec<Chunk> {
    let mut by_id: HashMap<String, Chunk> = chunks
        .into_iter()
        .map(|chunk| (chunk.id.clone(), chunk))
        .collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

#[async_trait]
impl ChunkRepository for MongoChunkRepository {
    async fn insert_many(&self, chunks: Vec<Chunk>) -> AppResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let result = self.collection.insert_many(&chunks).await?;
        Ok(result.inserted_ids.len())
    }

    async fn find_by_ids(&self, scope: &CourseScope, ids: &[String]) -> AppResult<Vec<Chunk>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let chunks: Vec<Chunk> = self
            .collection
            .find(doc! {
                "owner": &scope.owner,
                "course": &scope.course,
                "id": { "$in": ids },
            })
            .await?
            .try_collect()
            .await?;

        Ok(order_by_ids(chunks, ids))
    }

    async fn count_by_scope(&self, scope: &CourseScope) -> AppResult<u64> {
        let count = self
            .collection
            .count_documents(doc! { "owner": &scope.owner, "course": &scope.course })
            .await?;
        Ok(count)
    }

    async fn delete_by_scope(&self, scope: &CourseScope) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "owner": &scope.owner, "course": &scope.course })
            .await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_by_ids_follows_request_order() {
        let scope = CourseScope::new("alice", "Attention");
        let first = Chunk::new(&scope, "first", "s1");
        let second = Chunk::new(&scope, "second", "s2");
        let ids = vec![second.id.clone(), "missing".to_string(), first.id.clone()];

        let ordered = order_by_ids(vec![first.clone(), second.clone()], &ids);

        assert_eq!(ordered, vec![second, first]);
    }
}
