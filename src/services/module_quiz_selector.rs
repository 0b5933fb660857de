use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;

use crate::{
    constants::prompts::{render, MODULE_QUIZ_SELECTION_PROMPT},
    errors::{AppError, AppResult, GenerationOutcome, NotGeneratedReason},
    models::domain::{Module, QuizAttempt},
    services::{completion::CompletionService, question_bank::render_bank},
};

/// `count` distinct indices drawn uniformly from `[0, bank_len)`.
pub fn sample_indices<R: Rng + ?Sized>(rng: &mut R, bank_len: usize, count: usize) -> Vec<usize> {
    rand::seq::index::sample(rng, bank_len, count.min(bank_len)).into_vec()
}

/// Parses a comma-separated list of 1-based question numbers into 0-based indices.
pub fn parse_selection(
    reply: &str,
    expected: usize,
    bank_len: usize,
) -> AppResult<GenerationOutcome<Vec<usize>>> {
    let numbers = reply
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<usize>().map_err(|_| {
                AppError::ParseError(format!(
                    "Selection token '{}' is not a question number",
                    token
                ))
            })
        })
        .collect::<AppResult<Vec<usize>>>()?;

    if numbers.len() != expected {
        return Ok(GenerationOutcome::NotGenerated(
            NotGeneratedReason::SelectionCountMismatch {
                expected,
                actual: numbers.len(),
            },
        ));
    }

    let mut seen = HashSet::new();
    let mut indices = Vec::with_capacity(numbers.len());
    for number in numbers {
        if number == 0 || number > bank_len {
            return Ok(GenerationOutcome::NotGenerated(
                NotGeneratedReason::SelectionOutOfRange { number, bank_len },
            ));
        }
        if !seen.insert(number) {
            return Ok(GenerationOutcome::NotGenerated(
                NotGeneratedReason::DuplicateSelection { number },
            ));
        }
        indices.push(number - 1);
    }
    Ok(GenerationOutcome::Generated(indices))
}

pub struct ModuleQuizSelector {
    completion: Arc<dyn CompletionService>,
    quiz_size: usize,
}

impl ModuleQuizSelector {
    pub fn new(completion: Arc<dyn CompletionService>, quiz_size: usize) -> Self {
        Self {
            completion,
            quiz_size,
        }
    }

    pub fn quiz_size_for(&self, bank_len: usize) -> usize {
        self.quiz_size.min(bank_len)
    }

    /// Picks the question indices for a follow-up quiz on `module` after `attempt`.
    pub async fn select(
        &self,
        attempt: &QuizAttempt,
        module: &Module,
    ) -> AppResult<GenerationOutcome<Vec<usize>>> {
        let bank_len = module.questions.len();
        if bank_len == 0 {
            return Ok(GenerationOutcome::NotGenerated(
                NotGeneratedReason::EmptyQuestionBank {
                    module_number: module.number,
                },
            ));
        }
        let size = self.quiz_size_for(bank_len);

        let mut incorrect: Vec<usize> = attempt
            .incorrect_indices()
            .into_iter()
            .filter(|&index| index < bank_len)
            .collect();
        incorrect.sort_unstable();
        incorrect.dedup();

        if incorrect.is_empty() {
            let indices = sample_indices(&mut rand::thread_rng(), bank_len, size);
            log::info!(
                "No mistakes in attempt {}, sampled {} questions at random",
                attempt.id,
                indices.len()
            );
            return Ok(GenerationOutcome::Generated(indices));
        }

        let incorrect_text: String = incorrect
            .iter()
            .map(|&index| format!("{}\n", module.questions[index].render(index + 1)))
            .collect();
        let prompt = render(
            MODULE_QUIZ_SELECTION_PROMPT,
            &[
                ("count", &size.to_string()),
                ("incorrect", &incorrect_text),
                ("questions", &render_bank(&module.questions)),
            ],
        );

        let reply = self.completion.complete(&prompt).await?;
        let outcome = parse_selection(&reply, size, bank_len)?;
        if let Some(reason) = outcome.reason() {
            log::warn!("Module quiz selection for attempt {} rejected: {}", attempt.id, reason);
        }
        Ok(outcome)
    }
}
