use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        vectors_config::Config as VectorsConfigKind, Condition, CountPointsBuilder,
        CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId, PointStruct,
        ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParams,
        VectorsConfig,
    },
    Qdrant,
};
use secrecy::ExposeSecret;
use tokio::sync::OnceCell;

use super::{SearchHit, VectorIndex, VectorPoint};
use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::domain::CourseScope,
};

pub struct QdrantVectorIndex {
    client: Qdrant,
    collection_name: String,
    embedding_dimension: usize,
    collection_ready: OnceCell<()>,
}

impl QdrantVectorIndex {
    pub fn new(client: Qdrant, collection_name: String, embedding_dimension: usize) -> Self {
        Self {
            client,
            collection_name,
            embedding_dimension,
            collection_ready: OnceCell::new(),
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let mut builder = Qdrant::from_url(&config.qdrant_url);
        if let Some(api_key) = &config.qdrant_api_key {
            builder = builder.api_key(api_key.expose_secret().to_string());
        }
        let client = builder.build()?;

        log::info!(
            "Using Qdrant collection '{}' at {}",
            config.qdrant_collection,
            config.qdrant_url
        );

        Ok(Self::new(
            client,
            config.qdrant_collection.clone(),
            config.embedding_dimension,
        ))
    }

    async fn ensure_collection(&self) -> AppResult<()> {
        self.collection_ready
            .get_or_try_init(|| async {
                let collections = self.client.list_collections().await?;
                let exists = collections
                    .collections
                    .iter()
                    .any(|c| c.name == self.collection_name);

                if !exists {
                    log::info!("Creating Qdrant collection '{}'", self.collection_name);
                    let request = CreateCollectionBuilder::new(self.collection_name.clone())
                        .vectors_config(VectorsConfig {
                            config: Some(VectorsConfigKind::Params(VectorParams {
                                size: self.embedding_dimension as u64,
                                distance: Distance::Cosine.into(),
                                ..Default::default()
                            })),
                        });
                    self.client.create_collection(request).await?;
                }
                Ok::<(), AppError>(())
            })
            .await?;
        Ok(())
    }

    fn scope_filter(scope: &CourseScope) -> Filter {
        Filter::all(vec![
            Condition::matches("owner", scope.owner.clone()),
            Condition::matches("course", scope.course.clone()),
        ])
    }

    fn to_point(point: VectorPoint) -> PointStruct {
        let payload: HashMap<String, QdrantValue> = HashMap::from([
            ("id".to_string(), point.id.clone().into()),
            ("owner".to_string(), point.scope.owner.into()),
            ("course".to_string(), point.scope.course.into()),
            ("summary".to_string(), point.summary.into()),
        ]);

        PointStruct {
            id: Some(PointId::from(point.id)),
            vectors: Some(point.vector.into()),
            payload,
        }
    }

    fn payload_str(point: &ScoredPoint, key: &str) -> Option<String> {
        point.payload.get(key).and_then(|v| {
            let v: serde_json::Value = v.clone().into();
            v.as_str().map(|s| s.to_string())
        })
    }

    fn to_hit(point: ScoredPoint) -> Option<SearchHit> {
        let id = Self::payload_str(&point, "id")?;
        let owner = Self::payload_str(&point, "owner")?;
        let course = Self::payload_str(&point, "course")?;
        Some(SearchHit {
            id,
            score: point.score,
            scope: CourseScope::new(owner, course),
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn search(
        &self,
        vector: Vec<f32>,
        scope: &CourseScope,
        k: usize,
    ) -> AppResult<Vec<SearchHit>> {
        self.ensure_collection().await?;

        let request = SearchPointsBuilder::new(self.collection_name.clone(), vector, k as u64)
            .with_payload(true)
            .filter(Self::scope_filter(scope));

        let response = self.client.search_points(request).await?;
        let total = response.result.len();
        let hits: Vec<SearchHit> = response.result.into_iter().filter_map(Self::to_hit).collect();
        if hits.len() < total {
            log::warn!(
                "Dropped {} Qdrant hits with incomplete payload for {}",
                total - hits.len(),
                scope
            );
        }
        Ok(hits)
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> AppResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        self.ensure_collection().await?;

        let points: Vec<PointStruct> = points.into_iter().map(Self::to_point).collect();
        let request = UpsertPointsBuilder::new(self.collection_name.clone(), points).wait(true);
        self.client.upsert_points(request).await?;
        Ok(())
    }

    async fn count(&self, scope: &CourseScope) -> AppResult<u64> {
        self.ensure_collection().await?;

        let request = CountPointsBuilder::new(self.collection_name.clone())
            .filter(Self::scope_filter(scope))
            .exact(true);
        let response = self.client.count(request).await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn delete(&self, scope: &CourseScope) -> AppResult<()> {
        self.ensure_collection().await?;

        let request = DeletePointsBuilder::new(self.collection_name.clone())
            .points(Self::scope_filter(scope))
            .wait(true);
        self.client.delete_points(request).await?;
        log::info!("Deleted vectors for {}", scope);
        Ok(())
    }
}
