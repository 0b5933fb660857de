use crate::models::domain::{JobStep, PipelineStage};

const INGEST_TIMEOUT: u64 = 60;
const SUMMARIZE_TIMEOUT: u64 = 1800;
const INDEX_TIMEOUT: u64 = 600;
const OUTLINE_TIMEOUT: u64 = 300;
const AUTHOR_TIMEOUT: u64 = 3600;
const ASSESS_TIMEOUT: u64 = 1800;
const PERSIST_TIMEOUT: u64 = 30;

pub fn create_course_generation_steps() -> Vec<JobStep> {
    vec![
        ingest_step(),
        summarize_step(),
        index_step(),
        outline_step(),
        author_step(),
        assess_step(),
        persist_step(),
    ]
}

fn ingest_step() -> JobStep {
    JobStep::new(PipelineStage::Ingest)
        .with_description("Read source files and split them into chunks by title")
        .with_timeout(INGEST_TIMEOUT)
}

fn summarize_step() -> JobStep {
    JobStep::new(PipelineStage::Summarize)
        .with_description("Summarize every chunk with the light model")
        .with_timeout(SUMMARIZE_TIMEOUT)
}

fn index_step() -> JobStep {
    JobStep::new(PipelineStage::Index)
        .with_description("Store chunks and embed their summaries into the vector index")
        .with_timeout(INDEX_TIMEOUT)
}

fn outline_step() -> JobStep {
    JobStep::new(PipelineStage::Outline)
        .with_description("Reduce chunk summaries and synthesize the table of contents")
        .with_timeout(OUTLINE_TIMEOUT)
}

fn author_step() -> JobStep {
    JobStep::new(PipelineStage::Author)
        .with_description("Write module content from retrieved context")
        .with_timeout(AUTHOR_TIMEOUT)
}

fn assess_step() -> JobStep {
    JobStep::new(PipelineStage::Assess)
        .with_description("Generate and parse each module's question bank")
        .with_timeout(ASSESS_TIMEOUT)
}

fn persist_step() -> JobStep {
    JobStep::new(PipelineStage::Persist)
        .with_description("Write the finished course record")
        .with_timeout(PERSIST_TIMEOUT)
}
