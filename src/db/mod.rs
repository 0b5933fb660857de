use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};
use std::time::Duration;

use crate::{config::Config, errors::AppResult};

pub const CHUNKS_COLLECTION: &str = "chunks";
pub const COURSES_COLLECTION: &str = "courses";
pub const QUIZ_ATTEMPTS_COLLECTION: &str = "quiz_attempts";
pub const FINAL_QUIZZES_COLLECTION: &str = "final_quizzes";
pub const GENERATION_JOBS_COLLECTION: &str = "generation_jobs";

#[derive(Clone)]
pub struct Database {
    client: Client,
    db_name: String,
}

impl Database {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let database = Self::lazy(config).await?;
        database.health_check().await?;

        log::info!("Connected to MongoDB database '{}'", config.mongo_db_name);
        Ok(database)
    }

    /// Builds the client without contacting the server; the first operation connects.
    pub async fn lazy(config: &Config) -> AppResult<Self> {
        let mut client_options = ClientOptions::parse(&config.mongo_conn_string).await?;

        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);
        client_options.max_pool_size = Some(10);
        client_options.min_pool_size = Some(2);
        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));
        client_options.app_name = Some("coursegen-server".to_string());

        let client = Client::with_options(client_options)?;

        Ok(Self {
            client,
            db_name: config.mongo_db_name.clone(),
        })
    }

    pub fn get_collection<T>(&self, collection_name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.client
            .database(&self.db_name)
            .collection(collection_name)
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}
