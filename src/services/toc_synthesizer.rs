use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    constants::prompts::{render, TOC_PROMPT_TEMPLATE},
    errors::{AppError, AppResult},
    models::domain::ModuleDescriptor,
    services::completion::CompletionService,
};

static MODULE_TITLE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^\*\*Module\s+(\d+):\s*(.*?)\*\*"));

const SUMMARY_PREFIX: &str = "summary:";

fn module_title_regex() -> AppResult<&'static Regex> {
    MODULE_TITLE
        .as_ref()
        .map_err(|e| AppError::InternalError(format!("Invalid module title pattern: {}", e)))
}

/// Lower bound on the module count requested for a target of `n`.
pub fn min_modules(n: usize) -> usize {
    n * 7 / 10
}

/// Parses `**Module N: Title**` / `Summary: ...` records. Modules are numbered by
/// appearance; a record without a summary keeps an empty one.
pub fn parse_toc(text: &str) -> AppResult<Vec<ModuleDescriptor>> {
    let title_pattern = module_title_regex()?;
    let mut modules: Vec<ModuleDescriptor> = Vec::new();
    let mut in_summary = false;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(captures) = title_pattern.captures(line) {
            let number = (modules.len() + 1) as u32;
            let label = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            if label != number.to_string() {
                log::debug!("Module labelled {} placed at position {}", label, number);
            }
            modules.push(ModuleDescriptor {
                number,
                title: captures
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
                summary: String::new(),
            });
            in_summary = false;
            continue;
        }

        let Some(current) = modules.last_mut() else {
            continue;
        };

        let summary_text = line
            .get(..SUMMARY_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(SUMMARY_PREFIX))
            .map(|_| &line[SUMMARY_PREFIX.len()..]);

        if let (false, Some(text)) = (in_summary, summary_text) {
            current.summary = text.trim().to_string();
            in_summary = true;
        } else if in_summary {
            if !current.summary.is_empty() {
                current.summary.push('\n');
            }
            current.summary.push_str(line);
        }
    }

    Ok(modules)
}

pub struct TocSynthesizer {
    completion: Arc<dyn CompletionService>,
}

impl TocSynthesizer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    pub async fn synthesize(
        &self,
        course_summary: &str,
        module_count: usize,
    ) -> AppResult<Vec<ModuleDescriptor>> {
        let minimum = min_modules(module_count);
        let prompt = render(
            TOC_PROMPT_TEMPLATE,
            &[
                ("min_modules", &minimum.to_string()),
                ("max_modules", &module_count.to_string()),
                ("summary", course_summary),
            ],
        );

        let response = self.completion.complete(&prompt).await?;
        let mut modules = parse_toc(&response)?;

        if modules.is_empty() {
            return Err(AppError::ParseError(
                "Table of contents contained no '**Module N: Title**' lines".to_string(),
            ));
        }
        if modules.len() > module_count {
            log::warn!(
                "Table of contents has {} modules, truncating to {}",
                modules.len(),
                module_count
            );
            modules.truncate(module_count);
        }
        if modules.len() < minimum {
            log::warn!(
                "Table of contents has {} modules, fewer than the requested minimum {}",
                modules.len(),
                minimum
            );
        }
        let missing = modules.iter().filter(|m| m.summary.is_empty()).count();
        if missing > 0 {
            log::warn!("{} modules have no summary", missing);
        }

        Ok(modules)
    }
}

/// Renders the table of contents the way content prompts embed it.
pub fn render_toc(modules: &[ModuleDescriptor]) -> String {
    modules
        .iter()
        .map(|module| {
            format!(
                "{}. {}\nSummary: {}\n\n",
                module.number, module.title, module.summary
            )
        })
        .collect()
}
