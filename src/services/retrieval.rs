use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};

use crate::{
    errors::AppResult,
    models::domain::{Chunk, CourseScope},
    repositories::ChunkRepository,
    services::embedding::Embedder,
    vector::{VectorIndex, VectorPoint},
};

/// Stores chunks with their summary embeddings and finds the ones closest to a query.
pub struct ChunkRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunks: Arc<dyn ChunkRepository>,
    concurrency: usize,
}

impl ChunkRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chunks: Arc<dyn ChunkRepository>,
        concurrency: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            chunks,
            concurrency: concurrency.max(1),
        }
    }

    /// Persists `chunks` and upserts one vector per chunk summary.
    pub async fn index_chunks(
        &self,
        scope: &CourseScope,
        chunks: Vec<Chunk>,
    ) -> AppResult<Vec<String>> {
        let points: Vec<VectorPoint> = stream::iter(chunks.iter().cloned())
            .map(|chunk| async move {
                let vector = self.embedder.embed(&chunk.summary).await?;
                Ok::<_, crate::errors::AppError>(VectorPoint {
                    id: chunk.id.clone(),
                    vector,
                    scope: scope.clone(),
                    summary: chunk.summary.clone(),
                })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let ids: Vec<String> = chunks.iter().map(|chunk| chunk.id.clone()).collect();
        self.chunks.insert_many(chunks).await?;
        self.index.upsert(points).await?;

        log::info!("Indexed {} chunks for {}", ids.len(), scope);
        Ok(ids)
    }

    /// Top-`k` chunks for `query` in score order, never leaving `scope`.
    pub async fn retrieve(
        &self,
        scope: &CourseScope,
        query: &str,
        k: usize,
    ) -> AppResult<Vec<Chunk>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.index.search(vector, scope, k).await?;

        let ids: Vec<String> = hits
            .into_iter()
            .filter_map(|hit| {
                if &hit.scope == scope {
                    Some(hit.id)
                } else {
                    log::warn!(
                        "Dropping retrieval hit {} from {} while searching {}",
                        hit.id,
                        hit.scope,
                        scope
                    );
                    None
                }
            })
            .collect();

        let chunks = self.chunks.find_by_ids(scope, &ids).await?;
        Ok(chunks
            .into_iter()
            .filter(|chunk| chunk.belongs_to(scope))
            .collect())
    }

    pub async fn indexed_count(&self, scope: &CourseScope) -> AppResult<u64> {
        self.index.count(scope).await
    }

    /// Removes the scope's vectors and chunks; returns the number of chunks deleted.
    pub async fn clear(&self, scope: &CourseScope) -> AppResult<u64> {
        self.index.delete(scope).await?;
        self.chunks.delete_by_scope(scope).await
    }
}
