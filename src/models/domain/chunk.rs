use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner and course pair every chunk, vector point and retrieval is scoped to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CourseScope {
    pub owner: String,
    pub course: String,
}

impl CourseScope {
    pub fn new(owner: impl Into<String>, course: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            course: course.into(),
        }
    }
}

impl std::fmt::Display for CourseScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.course)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Chunk {
    pub id: String,
    pub owner: String,
    pub course: String,
    pub text: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Chunk {
    pub fn new(scope: &CourseScope, text: &str, summary: &str) -> Self {
        Chunk {
            id: Uuid::new_v4().to_string(),
            owner: scope.owner.clone(),
            course: scope.course.clone(),
            text: text.to_string(),
            summary: summary.to_string(),
            created_at: Some(Utc::now()),
        }
    }

    pub fn belongs_to(&self, scope: &CourseScope) -> bool {
        self.owner == scope.owner && self.course == scope.course
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_inherits_scope() {
        let scope = CourseScope::new("alice", "Transformers");
        let chunk = Chunk::new(&scope, "attention is all you need", "attention summary");

        assert!(chunk.belongs_to(&scope));
        assert!(!chunk.belongs_to(&CourseScope::new("alice", "RAG")));
        assert!(!chunk.belongs_to(&CourseScope::new("bob", "Transformers")));
        assert!(Uuid::parse_str(&chunk.id).is_ok());
    }

    #[test]
    fn scope_displays_owner_and_course() {
        assert_eq!(CourseScope::new("alice", "RAG").to_string(), "alice/RAG");
    }
}
