pub mod memory;
pub mod qdrant;

use async_trait::async_trait;

use crate::{errors::AppResult, models::domain::CourseScope};

pub use memory::InMemoryVectorIndex;
pub use qdrant::QdrantVectorIndex;

/// An embedded chunk summary; `id` is the chunk id.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub scope: CourseScope,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub scope: CourseScope,
}

/// Similarity index over chunk summaries, always filtered by owner and course.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(
        &self,
        vector: Vec<f32>,
        scope: &CourseScope,
        k: usize,
    ) -> AppResult<Vec<SearchHit>>;
    async fn upsert(&self, points: Vec<VectorPoint>) -> AppResult<()>;
    async fn count(&self, scope: &CourseScope) -> AppResult<u64>;
    async fn delete(&self, scope: &CourseScope) -> AppResult<()>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
