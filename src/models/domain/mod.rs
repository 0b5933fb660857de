pub mod chunk;
pub mod course;
pub mod final_quiz;
pub mod generation_job;
pub mod question;
pub mod quiz_attempt;
pub mod session;

pub use chunk::{Chunk, CourseScope};
pub use course::{Course, Module, ModuleDescriptor};
pub use final_quiz::{FinalQuiz, FinalQuizSection};
pub use generation_job::{GenerationJob, JobStatus, JobStep, PipelineCheckpoint, PipelineStage};
pub use question::{OptionLabel, ParseYield, ParsedQuestions, Question, QuestionOptions};
pub use quiz_attempt::{Answer, QuizAttempt};
pub use session::CourseSession;
