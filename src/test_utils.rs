use crate::models::domain::{
    Course, CourseScope, Module, ModuleDescriptor, OptionLabel, ParsedQuestions, Question,
    QuestionOptions,
};

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// A well-formed question whose text is `label`.
    pub fn test_question(label: &str) -> Question {
        Question {
            question: label.to_string(),
            options: QuestionOptions {
                a: "first".to_string(),
                b: "second".to_string(),
                c: "third".to_string(),
                d: "fourth".to_string(),
            },
            answer: OptionLabel::B,
        }
    }

    /// Module `number` holding `bank_size` questions named "M{number} Q{i}".
    pub fn test_module(number: u32, bank_size: usize) -> Module {
        let mut module = Module::from_descriptor(
            ModuleDescriptor {
                number,
                title: format!("Module {}", number),
                summary: format!("summary of module {}", number),
            },
            format!("content of module {}", number),
        );
        module.install_question_bank(ParsedQuestions {
            questions: (0..bank_size)
                .map(|i| test_question(&format!("M{} Q{}", number, i)))
                .collect(),
            rejected: 0,
        });
        module
    }

    /// Course "course-1" owned by alice with one module per entry of `bank_sizes`.
    pub fn test_course(bank_sizes: &[usize]) -> Course {
        let modules = bank_sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| test_module(i as u32 + 1, size))
            .collect();
        let mut course = Course::new(&CourseScope::new("alice", "Rust"), modules);
        course.id = "course-1".to_string();
        course
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::test_helpers::*;
    use crate::errors::AppError;
    use actix_web::ResponseError;

    #[test]
    fn test_fixtures_course_numbers_modules_from_one() {
        let course = test_course(&[3, 0]);
        assert_eq!(course.modules.len(), 2);
        assert_eq!(course.module(1).map(|m| m.questions.len()), Some(3));
        assert!(course.module(2).is_some_and(|m| m.questions.is_empty()));
    }

    #[test]
    fn test_fixtures_banks_have_distinct_snapshots() {
        let course = test_course(&[2, 2]);
        assert_ne!(
            course.modules[0].bank_snapshot_id,
            course.modules[1].bank_snapshot_id
        );
    }

    #[test]
    fn test_helpers_accept_error_statuses() {
        assert_error_status(AppError::NotFound("x".into()).status_code());
        assert_error_status(AppError::Timeout("x".into()).status_code());
    }
}
