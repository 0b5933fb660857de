use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};

use crate::{
    constants::prompts::{render, FINAL_EXAM_FRESH_PROMPT, FINAL_EXAM_WEIGHTED_PROMPT},
    errors::{AppError, AppResult, GenerationOutcome, NotGeneratedReason},
    models::domain::{Course, FinalQuiz, FinalQuizSection, Module, Question, QuizAttempt},
    services::{
        completion::CompletionService,
        question_bank::{parse_questions, render_bank},
    },
};

/// Mistake history of one learner in one module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleMistakeStats {
    pub module_number: u32,
    pub attempts: usize,
    pub incorrect_answers: usize,
    /// Distinct bank indices answered wrong in attempts on the current bank.
    pub incorrect_indices: BTreeSet<usize>,
}

impl ModuleMistakeStats {
    /// Average number of incorrect answers per attempt.
    pub fn mistake_score(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.incorrect_answers as f64 / self.attempts as f64
        }
    }
}

/// Groups the learner's graded attempts by module. Every module must have at least one.
/// Pending quizzes that were generated but never answered are ignored.
pub fn collect_stats(
    course: &Course,
    attempts: &[QuizAttempt],
) -> Result<Vec<ModuleMistakeStats>, NotGeneratedReason> {
    let mut by_module: BTreeMap<u32, Vec<&QuizAttempt>> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| a.course_id == course.id && a.is_graded()) {
        by_module.entry(attempt.module_number).or_default().push(attempt);
    }

    course
        .modules
        .iter()
        .map(|module| {
            let module_attempts = by_module
                .get(&module.number)
                .filter(|list| !list.is_empty())
                .ok_or(NotGeneratedReason::ModuleNotAttempted {
                    module_number: module.number,
                })?;

            let incorrect_indices = module_attempts
                .iter()
                .filter(|a| a.bank_snapshot_id == module.bank_snapshot_id)
                .flat_map(|a| a.incorrect_indices())
                .filter(|&index| index < module.questions.len())
                .collect();

            Ok(ModuleMistakeStats {
                module_number: module.number,
                attempts: module_attempts.len(),
                incorrect_answers: module_attempts.iter().map(|a| a.incorrect_count()).sum(),
                incorrect_indices,
            })
        })
        .collect()
}

/// Adds the mean score to every score so no module ends with zero weight.
pub fn smooth(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    scores.iter().map(|score| score + mean).collect()
}

/// Share of the exam per module: `smoothed_i / (2 * sum(raw))`, uniform when no mistakes exist.
pub fn mistake_shares(raw_scores: &[f64]) -> Vec<f64> {
    let n = raw_scores.len();
    let raw_total: f64 = raw_scores.iter().sum();
    if n == 0 {
        return Vec::new();
    }
    if raw_total <= 0.0 {
        return vec![1.0 / n as f64; n];
    }
    smooth(raw_scores)
        .into_iter()
        .map(|smoothed| smoothed / (2.0 * raw_total))
        .collect()
}

/// Integer apportionment of `values` (expected to sum to `total`) that sums exactly to `total`.
/// Leftover units go to the largest fractional remainders, ties to the lower index.
pub fn largest_remainder(values: &[f64], total: usize) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut allocation: Vec<usize> = values
        .iter()
        .map(|value| {
            if value.is_finite() && *value > 0.0 {
                value.floor() as usize
            } else {
                0
            }
        })
        .collect();

    let mut by_remainder: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let remainder = if value.is_finite() && *value > 0.0 {
                value - value.floor()
            } else {
                0.0
            };
            (i, remainder)
        })
        .collect();
    by_remainder.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut assigned: usize = allocation.iter().sum();
    let mut cursor = 0;
    while assigned < total {
        allocation[by_remainder[cursor % by_remainder.len()].0] += 1;
        assigned += 1;
        cursor += 1;
    }
    // Only reachable when `values` overshoot `total`.
    let mut cursor = by_remainder.len();
    while assigned > total {
        cursor = if cursor == 0 { by_remainder.len() - 1 } else { cursor - 1 };
        let slot = by_remainder[cursor].0;
        if allocation[slot] > 0 {
            allocation[slot] -= 1;
            assigned -= 1;
        }
    }
    allocation
}

/// Splits `total` proportionally to non-negative `weights`; uniform when all weights are zero.
pub fn allocate_budget(weights: &[f64], total: usize) -> Vec<usize> {
    let weight_sum: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    let values: Vec<f64> = if weight_sum > 0.0 {
        weights
            .iter()
            .map(|w| {
                if w.is_finite() && *w > 0.0 {
                    w / weight_sum * total as f64
                } else {
                    0.0
                }
            })
            .collect()
    } else {
        vec![total as f64 / weights.len().max(1) as f64; weights.len()]
    };
    largest_remainder(&values, total)
}

/// Question budget per module from the raw mistake scores.
pub fn allocate_exam(raw_scores: &[f64], total: usize) -> Vec<usize> {
    let values: Vec<f64> = mistake_shares(raw_scores)
        .into_iter()
        .map(|share| share * total as f64)
        .collect();
    largest_remainder(&values, total)
}

/// The per-module budgets must add up to the exam size.
pub fn check_allocation(allocation: &[usize], total: usize) -> Result<(), NotGeneratedReason> {
    let allocated: usize = allocation.iter().sum();
    if allocated == total {
        Ok(())
    } else {
        Err(NotGeneratedReason::AllocationSumMismatch {
            expected: total,
            actual: allocated,
        })
    }
}

pub struct FinalExamAllocator {
    completion: Arc<dyn CompletionService>,
    total_questions: usize,
    concurrency: usize,
}

impl FinalExamAllocator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        total_questions: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            completion,
            total_questions,
            concurrency: concurrency.max(1),
        }
    }

    fn prompt_for(module: &Module, stats: &ModuleMistakeStats, count: usize) -> String {
        if stats.incorrect_indices.is_empty() {
            return render(
                FINAL_EXAM_FRESH_PROMPT,
                &[("count", &count.to_string()), ("content", &module.content)],
            );
        }

        let incorrect: String = stats
            .incorrect_indices
            .iter()
            .map(|&index| format!("{}\n", module.questions[index].render(index + 1)))
            .collect();
        render(
            FINAL_EXAM_WEIGHTED_PROMPT,
            &[
                ("count", &count.to_string()),
                ("incorrect", &incorrect),
                ("questions", &render_bank(&module.questions)),
            ],
        )
    }

    async fn generate_section(
        &self,
        module: &Module,
        stats: &ModuleMistakeStats,
        requested: usize,
    ) -> AppResult<(Vec<Question>, FinalQuizSection)> {
        let mut section = FinalQuizSection {
            module_number: module.number,
            requested,
            accepted: 0,
            rejected: 0,
        };
        if requested == 0 {
            return Ok((Vec::new(), section));
        }

        let reply = self
            .completion
            .complete(&Self::prompt_for(module, stats, requested))
            .await?;
        let mut parsed = parse_questions(&reply)?;
        parsed.questions.truncate(requested);

        section.accepted = parsed.questions.len();
        section.rejected = parsed.rejected;
        if section.accepted < requested {
            log::warn!(
                "Final exam module {} yielded {} of {} questions ({} rejected)",
                module.number,
                section.accepted,
                requested,
                section.rejected
            );
        }
        Ok((parsed.questions, section))
    }

    /// Builds a final quiz weighted toward the modules where the learner made the most mistakes.
    pub async fn generate(
        &self,
        course: &Course,
        user_id: &str,
        attempts: &[QuizAttempt],
    ) -> AppResult<GenerationOutcome<FinalQuiz>> {
        let stats = match collect_stats(course, attempts) {
            Ok(stats) => stats,
            Err(reason) => return Ok(GenerationOutcome::NotGenerated(reason)),
        };

        let raw_scores: Vec<f64> = stats.iter().map(ModuleMistakeStats::mistake_score).collect();
        let allocation = allocate_exam(&raw_scores, self.total_questions);
        if let Err(reason) = check_allocation(&allocation, self.total_questions) {
            return Ok(GenerationOutcome::NotGenerated(reason));
        }
        log::info!(
            "Final exam allocation for course {} user {}: {:?}",
            course.id,
            user_id,
            allocation
        );

        let sections: Vec<(Vec<Question>, FinalQuizSection)> = stream::iter(
            course.modules.iter().zip(stats.iter()).zip(allocation.iter().copied()),
        )
        .map(|((module, module_stats), requested)| {
            self.generate_section(module, module_stats, requested)
        })
        .buffered(self.concurrency)
        .try_collect()
        .await?;

        let (question_groups, sections): (Vec<Vec<Question>>, Vec<FinalQuizSection>) =
            sections.into_iter().unzip();
        let questions: Vec<Question> = question_groups.into_iter().flatten().collect();

        if questions.is_empty() {
            return Err(AppError::ParseError(
                "Final exam generation produced no parseable questions".to_string(),
            ));
        }

        Ok(GenerationOutcome::Generated(FinalQuiz::new(
            &course.id, user_id, questions, sections,
        )))
    }
}
