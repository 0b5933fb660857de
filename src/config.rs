use std::env;
use std::str::FromStr;

use secrecy::SecretString;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    Qdrant,
    Memory,
}

impl FromStr for VectorBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "qdrant" => Ok(VectorBackend::Qdrant),
            "memory" => Ok(VectorBackend::Memory),
            other => Err(format!("unknown vector backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,

    pub llm_api_base: String,
    pub llm_api_key: SecretString,
    pub llm_model: String,
    pub llm_small_model: String,

    pub embedding_api_base: String,
    pub embedding_api_key: SecretString,
    pub embedding_model: String,
    pub embedding_dimension: usize,

    pub vector_backend: VectorBackend,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<SecretString>,
    pub qdrant_collection: String,

    pub context_window_threshold: usize,
    pub summary_group_size: usize,
    pub max_reduction_rounds: usize,
    pub retrieval_top_k: usize,
    pub generation_concurrency: usize,
    pub completion_max_retries: u32,
    pub completion_retry_base_ms: u64,
    pub module_quiz_size: usize,
    pub final_exam_total: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

const DEFAULT_LLM_KEY: &str = "llm_api_key";
const DEFAULT_EMBEDDING_KEY: &str = "embedding_api_key";

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env_or("MONGO_CONN_STRING", "mongodb://localhost:27017"),
            mongo_db_name: env_or("MONGO_DB_NAME", "coursegen-local"),
            web_server_host: env_or("WEB_SERVER_HOST", "localhost"),
            web_server_port: env_parsed("WEB_SERVER_PORT", 8080),

            llm_api_base: env_or("LLM_API_BASE", "https://api.openai.com/v1"),
            llm_api_key: SecretString::from(env_or("LLM_API_KEY", DEFAULT_LLM_KEY)),
            llm_model: env_or("LLM_MODEL", "gpt-4o"),
            llm_small_model: env_or("LLM_SMALL_MODEL", "gpt-4o-mini"),

            embedding_api_base: env_or("EMBEDDING_API_BASE", "http://localhost:8081/v1"),
            embedding_api_key: SecretString::from(env_or(
                "EMBEDDING_API_KEY",
                DEFAULT_EMBEDDING_KEY,
            )),
            embedding_model: env_or("EMBEDDING_MODEL", "all-MiniLM-L6-v2"),
            embedding_dimension: env_parsed("EMBEDDING_DIMENSION", 384),

            vector_backend: env_parsed("VECTOR_BACKEND", VectorBackend::Qdrant),
            qdrant_url: env_or("QDRANT_URL", "http://localhost:6334"),
            qdrant_api_key: env::var("QDRANT_API_KEY").ok().map(SecretString::from),
            qdrant_collection: env_or("QDRANT_COLLECTION", "course_chunks"),

            context_window_threshold: env_parsed("CONTEXT_WINDOW_THRESHOLD", 100_000),
            summary_group_size: env_parsed("SUMMARY_GROUP_SIZE", 4),
            max_reduction_rounds: env_parsed("MAX_REDUCTION_ROUNDS", 8),
            retrieval_top_k: env_parsed("RETRIEVAL_TOP_K", 10),
            generation_concurrency: env_parsed("GENERATION_CONCURRENCY", 4),
            completion_max_retries: env_parsed("COMPLETION_MAX_RETRIES", 3),
            completion_retry_base_ms: env_parsed("COMPLETION_RETRY_BASE_MS", 500),
            module_quiz_size: env_parsed("MODULE_QUIZ_SIZE", 10),
            final_exam_total: env_parsed("FINAL_EXAM_TOTAL", 30),
        }
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        if self.llm_api_key.expose_secret() == DEFAULT_LLM_KEY {
            panic!(
                "FATAL: LLM_API_KEY is using default value! Set LLM_API_KEY environment variable."
            );
        }

        if self.embedding_api_key.expose_secret() == DEFAULT_EMBEDDING_KEY {
            panic!(
                "FATAL: EMBEDDING_API_KEY is using default value! Set EMBEDDING_API_KEY environment variable."
            );
        }

        if self.vector_backend == VectorBackend::Memory {
            panic!(
                "FATAL: VECTOR_BACKEND=memory loses every index on restart. Use qdrant in production."
            );
        }

        if self.summary_group_size < 2 {
            panic!(
                "FATAL: SUMMARY_GROUP_SIZE must be at least 2 (got {}), otherwise reduction never shrinks.",
                self.summary_group_size
            );
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "coursegen-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            llm_api_base: "http://localhost:9999/v1".to_string(),
            llm_api_key: SecretString::from("test_llm_key".to_string()),
            llm_model: "test-model".to_string(),
            llm_small_model: "test-small-model".to_string(),
            embedding_api_base: "http://localhost:9998/v1".to_string(),
            embedding_api_key: SecretString::from("test_embedding_key".to_string()),
            embedding_model: "test-embedding".to_string(),
            embedding_dimension: 8,
            vector_backend: VectorBackend::Memory,
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
            qdrant_collection: "course_chunks_test".to_string(),
            context_window_threshold: 1_000,
            summary_group_size: 4,
            max_reduction_rounds: 8,
            retrieval_top_k: 10,
            generation_concurrency: 2,
            completion_max_retries: 0,
            completion_retry_base_ms: 1,
            module_quiz_size: 10,
            final_exam_total: 30,
        }
    }
}
