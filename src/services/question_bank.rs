use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    constants::prompts::{render, QUESTION_BANK_PROMPT},
    errors::{AppError, AppResult},
    models::domain::{Module, OptionLabel, ParsedQuestions, Question, QuestionOptions},
    services::completion::CompletionService,
};

pub const QUESTIONS_PER_MODULE: usize = 20;

static MCQ_PATTERN: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(
        r"(?mx)
        ^\d+\.\s*(?P<question>.+?)\s*
        a\)\s*(?P<a>.+?)\s*
        b\)\s*(?P<b>.+?)\s*
        c\)\s*(?P<c>.+?)\s*
        d\)\s*(?P<d>.+?)\s*
        (?i:answer):\s*(?P<answer>[a-dA-D])
        ",
    )
});

static QUESTION_ANCHOR: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.\s"));

fn compiled(pattern: &'static Lazy<Result<Regex, regex::Error>>) -> AppResult<&'static Regex> {
    pattern
        .as_ref()
        .map_err(|e| AppError::InternalError(format!("Invalid question pattern: {}", e)))
}

/// Extracts every well-formed numbered MCQ from `text`. Entries missing any part
/// are skipped and counted as rejected.
pub fn parse_questions(text: &str) -> AppResult<ParsedQuestions> {
    let pattern = compiled(&MCQ_PATTERN)?;
    let anchors = compiled(&QUESTION_ANCHOR)?.find_iter(text).count();

    let questions: Vec<Question> = pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let field = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());
            let options = QuestionOptions {
                a: field("a")?,
                b: field("b")?,
                c: field("c")?,
                d: field("d")?,
            };
            if options.iter().any(|(_, text)| text.is_empty()) {
                return None;
            }
            Some(Question {
                question: field("question")?,
                options,
                answer: OptionLabel::from_letter(caps.name("answer")?.as_str())?,
            })
        })
        .collect();

    let rejected = anchors.saturating_sub(questions.len());
    Ok(ParsedQuestions {
        questions,
        rejected,
    })
}

pub fn render_bank(questions: &[Question]) -> String {
    questions
        .iter()
        .enumerate()
        .map(|(i, question)| format!("{}\n", question.render(i + 1)))
        .collect()
}

pub struct QuestionBankGenerator {
    completion: Arc<dyn CompletionService>,
    concurrency: usize,
}

impl QuestionBankGenerator {
    pub fn new(completion: Arc<dyn CompletionService>, concurrency: usize) -> Self {
        Self {
            completion,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn generate(&self, content: &str) -> AppResult<ParsedQuestions> {
        let prompt = format!(
            "{}{}",
            render(QUESTION_BANK_PROMPT, &[("count", &QUESTIONS_PER_MODULE.to_string())]),
            content
        );
        let response = self.completion.complete(&prompt).await?;
        parse_questions(&response)
    }

    /// Fills each module's question bank. A module with no parseable questions fails the batch.
    pub async fn assess_modules(&self, modules: Vec<Module>) -> AppResult<Vec<Module>> {
        stream::iter(modules)
            .map(|mut module| async move {
                let parsed = self.generate(&module.content).await?;
                let stats = parsed.yield_stats();

                if stats.is_empty() {
                    return Err(AppError::ParseError(format!(
                        "Module {} '{}' produced no parseable questions ({} rejected)",
                        module.number, module.title, stats.rejected
                    )));
                }
                if stats.is_below(QUESTIONS_PER_MODULE) {
                    log::warn!(
                        "Module {} '{}' yielded only {} of {} questions ({} rejected)",
                        module.number,
                        module.title,
                        stats.accepted,
                        QUESTIONS_PER_MODULE,
                        stats.rejected
                    );
                }

                module.install_question_bank(parsed);
                log::info!(
                    "Module {} question bank: {} accepted, {} rejected",
                    module.number,
                    stats.accepted,
                    stats.rejected
                );
                Ok(module)
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}
