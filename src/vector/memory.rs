use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{cosine_similarity, SearchHit, VectorIndex, VectorPoint};
use crate::{errors::AppResult, models::domain::CourseScope};

/// Brute-force cosine index for tests and local runs without Qdrant.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    points: RwLock<HashMap<String, VectorPoint>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn search(
        &self,
        vector: Vec<f32>,
        scope: &CourseScope,
        k: usize,
    ) -> AppResult<Vec<SearchHit>> {
        let points = self.points.read().await;

        let mut hits: Vec<SearchHit> = points
            .values()
            .filter(|point| &point.scope == scope)
            .map(|point| SearchHit {
                id: point.id.clone(),
                score: cosine_similarity(&vector, &point.vector),
                scope: point.scope.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> AppResult<()> {
        let mut stored = self.points.write().await;
        for point in points {
            stored.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn count(&self, scope: &CourseScope) -> AppResult<u64> {
        let points = self.points.read().await;
        Ok(points.values().filter(|point| &point.scope == scope).count() as u64)
    }

    async fn delete(&self, scope: &CourseScope) -> AppResult<()> {
        self.points.write().await.retain(|_, point| &point.scope != scope);
        Ok(())
    }
}
