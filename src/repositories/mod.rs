pub mod chunk_repository;
pub mod course_repository;
pub mod final_quiz_repository;
pub mod generation_job_repository;
pub mod quiz_attempt_repository;

pub use chunk_repository::{ChunkRepository, MongoChunkRepository};
pub use course_repository::{CourseRepository, MongoCourseRepository};
pub use final_quiz_repository::{FinalQuizRepository, MongoFinalQuizRepository};
pub use generation_job_repository::{GenerationJobRepository, MongoGenerationJobRepository};
pub use quiz_attempt_repository::{MongoQuizAttemptRepository, QuizAttemptRepository};
