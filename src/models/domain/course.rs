use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::chunk::CourseScope;
use crate::models::domain::question::{bank_snapshot_id, ParseYield, ParsedQuestions, Question};

/// One table-of-contents entry. `number` is the 1-based appearance order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModuleDescriptor {
    pub number: u32,
    pub title: String,
    pub summary: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Module {
    pub number: u32,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub questions: Vec<Question>,
    pub bank_snapshot_id: String,
    pub question_yield: ParseYield,
}

impl Module {
    pub fn from_descriptor(descriptor: ModuleDescriptor, content: String) -> Self {
        Module {
            number: descriptor.number,
            title: descriptor.title,
            summary: descriptor.summary,
            content,
            questions: Vec::new(),
            bank_snapshot_id: bank_snapshot_id(&[]),
            question_yield: ParseYield::default(),
        }
    }

    pub fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            number: self.number,
            title: self.title.clone(),
            summary: self.summary.clone(),
        }
    }

    /// Installs a freshly parsed bank and re-stamps its snapshot id.
    pub fn install_question_bank(&mut self, parsed: ParsedQuestions) {
        self.question_yield = parsed.yield_stats();
        self.bank_snapshot_id = bank_snapshot_id(&parsed.questions);
        self.questions = parsed.questions;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Course {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub modules: Vec<Module>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Course {
    pub fn new(scope: &CourseScope, modules: Vec<Module>) -> Self {
        Course {
            id: Uuid::new_v4().to_string(),
            owner: scope.owner.clone(),
            title: scope.course.clone(),
            modules,
            created_at: Some(Utc::now()),
        }
    }

    pub fn scope(&self) -> CourseScope {
        CourseScope::new(self.owner.clone(), self.title.clone())
    }

    pub fn module(&self, number: u32) -> Option<&Module> {
        self.modules.iter().find(|module| module.number == number)
    }
}
