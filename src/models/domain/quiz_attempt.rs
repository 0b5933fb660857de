use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub course_id: String,
    pub user_id: String,
    pub module_number: u32,
    pub bank_snapshot_id: String,
    pub answers: Vec<Answer>,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// `question_index` points into the module's question list for `bank_snapshot_id`.
/// `is_correct` stays `None` until the attempt is graded.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Answer {
    pub question_index: usize,
    #[serde(default)]
    pub is_correct: Option<bool>,
}

impl QuizAttempt {
    /// A new in-progress attempt over the selected question indices.
    pub fn pending(
        course_id: &str,
        user_id: &str,
        module_number: u32,
        bank_snapshot_id: &str,
        question_indices: &[usize],
    ) -> Self {
        let now = Utc::now();
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            user_id: user_id.to_string(),
            module_number,
            bank_snapshot_id: bank_snapshot_id.to_string(),
            answers: question_indices
                .iter()
                .map(|&question_index| Answer {
                    question_index,
                    is_correct: None,
                })
                .collect(),
            is_completed: false,
            created_at: Some(now),
            modified_at: Some(now),
        }
    }

    pub fn question_indices(&self) -> Vec<usize> {
        self.answers.iter().map(|a| a.question_index).collect()
    }

    /// Completed, or carrying at least one graded answer. Freshly generated quizzes are not.
    pub fn is_graded(&self) -> bool {
        self.is_completed || self.answers.iter().any(|a| a.is_correct.is_some())
    }

    pub fn incorrect_indices(&self) -> Vec<usize> {
        self.answers
            .iter()
            .filter(|a| a.is_correct == Some(false))
            .map(|a| a.question_index)
            .collect()
    }

    pub fn incorrect_count(&self) -> usize {
        self.answers
            .iter()
            .filter(|a| a.is_correct == Some(false))
            .count()
    }
}
