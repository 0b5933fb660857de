use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};

use crate::{
    constants::prompts::{render, MODULE_CONTENT_PROMPT_TEMPLATE},
    errors::{AppError, AppResult},
    models::domain::{Chunk, CourseScope, Module, ModuleDescriptor},
    services::{
        completion::CompletionService, retrieval::ChunkRetriever, toc_synthesizer::render_toc,
    },
};

pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

pub struct ContentGenerator {
    completion: Arc<dyn CompletionService>,
    retriever: Arc<ChunkRetriever>,
    top_k: usize,
    concurrency: usize,
}

impl ContentGenerator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        retriever: Arc<ChunkRetriever>,
        top_k: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            completion,
            retriever,
            top_k,
            concurrency: concurrency.max(1),
        }
    }

    /// Writes one module's teaching content from its retrieved context.
    pub async fn author_module(
        &self,
        scope: &CourseScope,
        toc_text: &str,
        descriptor: ModuleDescriptor,
    ) -> AppResult<Module> {
        let chunks = self
            .retriever
            .retrieve(scope, &descriptor.summary, self.top_k)
            .await?;
        if chunks.is_empty() {
            log::warn!(
                "No reference context retrieved for module {} '{}'",
                descriptor.number,
                descriptor.title
            );
        }

        let prompt = render(
            MODULE_CONTENT_PROMPT_TEMPLATE,
            &[
                ("toc", toc_text),
                ("summary", &descriptor.summary),
                ("context", &build_context(&chunks)),
            ],
        );
        let content = self.completion.complete(&prompt).await?;

        if content.trim().is_empty() {
            return Err(AppError::UpstreamError(format!(
                "Empty content generated for module {} '{}'",
                descriptor.number, descriptor.title
            )));
        }

        Ok(Module::from_descriptor(descriptor, content))
    }

    /// Authors every module against the full table of contents, preserving TOC order.
    /// `on_authored` sees each module as soon as it is ready.
    pub async fn author_modules<F>(
        &self,
        scope: &CourseScope,
        toc: &[ModuleDescriptor],
        on_authored: F,
    ) -> AppResult<Vec<Module>>
    where
        F: Fn(&Module) + Send + Sync,
    {
        let toc_text = render_toc(toc);
        stream::iter(toc.iter().cloned())
            .map(|descriptor| self.author_module(scope, &toc_text, descriptor))
            .buffered(self.concurrency)
            .inspect_ok(|module| on_authored(module))
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::chunk_repository::MockChunkRepository;
    use crate::services::completion::MockCompletionService;
    use crate::services::embedding::MockEmbedder;
    use crate::vector::MockVectorIndex;

    fn retriever_returning(chunks: Vec<Chunk>) -> Arc<ChunkRetriever> {
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().returning(|_| Ok(vec![1.0]));

        let mut index = MockVectorIndex::new();
        index.expect_search().returning(|_, _, _| Ok(vec![]));

        let mut repository = MockChunkRepository::new();
        repository
            .expect_find_by_ids()
            .returning(move |_, _| Ok(chunks.clone()));

        Arc::new(ChunkRetriever::new(
            Arc::new(embedder),
            Arc::new(index),
            Arc::new(repository),
            1,
        ))
    }

    fn toc() -> Vec<ModuleDescriptor> {
        vec![
            ModuleDescriptor {
                number: 1,
                title: "Ownership".to_string(),
                summary: "moves and borrows".to_string(),
            },
            ModuleDescriptor {
                number: 2,
                title: "Traits".to_string(),
                summary: "shared behaviour".to_string(),
            },
        ]
    }

    #[test]
    fn context_uses_visible_delimiter() {
        let scope = CourseScope::new("alice", "rust");
        let chunks = vec![Chunk::new(&scope, "one", ""), Chunk::new(&scope, "two", "")];
        assert_eq!(build_context(&chunks), "one\n\n---\n\ntwo");
    }

    #[tokio::test]
    async fn prompt_carries_full_toc_and_context() {
        let scope = CourseScope::new("alice", "rust");
        let retriever = retriever_returning(vec![Chunk::new(&scope, "Box<T> owns heap data", "")]);

        let mut completion = MockCompletionService::new();
        completion
            .expect_complete()
            .withf(|prompt| {
                prompt.contains("1. Ownership")
                    && prompt.contains("2. Traits")
                    && prompt.contains("Box<T> owns heap data")
            })
            .times(2)
            .returning(|prompt| {
                Ok(if prompt.contains("**Current Module Summary:**\nshared behaviour") {
                    "## Traits body".to_string()
                } else {
                    "## Ownership body".to_string()
                })
            });

        let modules = ContentGenerator::new(Arc::new(completion), retriever, 10, 2)
            .author_modules(&scope, &toc(), |_| {})
            .await
            .unwrap();

        assert_eq!(modules[0].content, "## Ownership body");
        assert_eq!(modules[1].content, "## Traits body");
        assert_eq!(modules[1].number, 2);
    }

    #[tokio::test]
    async fn blank_content_fails_and_names_module() {
        let scope = CourseScope::new("alice", "rust");
        let retriever = retriever_returning(vec![]);

        let mut completion = MockCompletionService::new();
        completion.expect_complete().returning(|_| Ok("  \n".to_string()));

        let result = ContentGenerator::new(Arc::new(completion), retriever, 10, 1)
            .author_modules(&scope, &toc(), |_| {})
            .await;

        assert!(matches!(
            result,
            Err(AppError::UpstreamError(message)) if message.contains("module 1 'Ownership'")
        ));
    }
}
