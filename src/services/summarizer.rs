use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};

use crate::{
    constants::prompts::CHUNK_SUMMARY_PROMPT,
    errors::{AppError, AppResult},
    services::completion::CompletionService,
};

pub const MAX_MODULES: usize = 30;

/// Rough token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

pub fn estimate_total_tokens(texts: &[String]) -> usize {
    texts.iter().map(|text| estimate_tokens(text)).sum()
}

/// Target module count for a course built from `token_count` tokens of source text.
pub fn module_count_for(token_count: usize) -> usize {
    let root = (token_count as f64 / 1000.0).sqrt().floor() as usize;
    (root + 2).min(MAX_MODULES)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub summary: String,
    pub rounds: usize,
}

pub struct Summarizer {
    completion: Arc<dyn CompletionService>,
    context_window_threshold: usize,
    group_size: usize,
    max_rounds: usize,
    concurrency: usize,
}

impl Summarizer {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        context_window_threshold: usize,
        group_size: usize,
        max_rounds: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            completion,
            context_window_threshold,
            group_size: group_size.max(2),
            max_rounds,
            concurrency: concurrency.max(1),
        }
    }

    async fn summarize_one(&self, text: &str) -> AppResult<String> {
        let prompt = format!("{}{}", CHUNK_SUMMARY_PROMPT, text);
        let summary = self.completion.complete(&prompt).await?;
        Ok(summary.trim().to_string())
    }

    /// One summary per chunk, in chunk order.
    pub async fn summarize(&self, chunks: &[String]) -> AppResult<Vec<String>> {
        stream::iter(chunks.iter().cloned())
            .map(|chunk| async move { self.summarize_one(&chunk).await })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Collapses summaries group by group until they fit the context window.
    pub async fn reduce(&self, summaries: Vec<String>) -> AppResult<Reduction> {
        let mut current = summaries;
        let mut rounds = 0;

        loop {
            let tokens = estimate_total_tokens(&current);
            if tokens < self.context_window_threshold {
                log::info!(
                    "Course summary ready after {} reduction rounds ({} tokens)",
                    rounds,
                    tokens
                );
                return Ok(Reduction {
                    summary: current.join("\n"),
                    rounds,
                });
            }

            if rounds >= self.max_rounds {
                return Err(AppError::InvariantViolation(format!(
                    "Summary still {} tokens after {} reduction rounds",
                    tokens, rounds
                )));
            }
            rounds += 1;

            let groups: Vec<String> = current
                .chunks(self.group_size)
                .map(|group| group.join("\n"))
                .collect();
            log::info!(
                "Reduction round {}: {} summaries ({} tokens) into {} groups",
                rounds,
                current.len(),
                tokens,
                groups.len()
            );

            let next = self.summarize(&groups).await?;
            let next_tokens = estimate_total_tokens(&next);
            if next_tokens >= tokens {
                return Err(AppError::InvariantViolation(format!(
                    "Reduction round {} did not shrink the summary ({} -> {} tokens)",
                    rounds, tokens, next_tokens
                )));
            }
            current = next;
        }
    }
}
