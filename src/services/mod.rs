pub mod chunker;
pub mod completion;
pub mod content_generator;
pub mod course_pipeline;
pub mod course_service;
pub mod embedding;
pub mod final_exam_allocator;
pub mod job_events;
pub mod job_runner;
pub mod module_quiz_selector;
pub mod orchestrator_steps;
pub mod question_bank;
pub mod quiz_attempt_service;
pub mod quiz_service;
pub mod retrieval;
pub mod session_store;
pub mod summarizer;
pub mod toc_synthesizer;
