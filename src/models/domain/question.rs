use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [
        OptionLabel::A,
        OptionLabel::B,
        OptionLabel::C,
        OptionLabel::D,
    ];

    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter.trim().to_ascii_lowercase().as_str() {
            "a" => Some(OptionLabel::A),
            "b" => Some(OptionLabel::B),
            "c" => Some(OptionLabel::C),
            "d" => Some(OptionLabel::D),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLabel::A => "a",
            OptionLabel::B => "b",
            OptionLabel::C => "c",
            OptionLabel::D => "d",
        }
    }
}

impl std::fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionOptions {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

impl QuestionOptions {
    pub fn get(&self, label: OptionLabel) -> &str {
        match label {
            OptionLabel::A => &self.a,
            OptionLabel::B => &self.b,
            OptionLabel::C => &self.c,
            OptionLabel::D => &self.d,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionLabel, &str)> {
        OptionLabel::ALL.into_iter().map(move |label| (label, self.get(label)))
    }
}

/// Four-option multiple-choice question with a single correct label.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub question: String,
    pub options: QuestionOptions,
    pub answer: OptionLabel,
}

impl Question {
    /// Renders the question in the numbered line format the model reads and writes.
    pub fn render(&self, number: usize) -> String {
        let mut text = format!("{}. {}\n", number, self.question);
        for (label, option) in self.options.iter() {
            text.push_str(&format!("{}) {}\n", label, option));
        }
        text
    }

    pub fn render_with_answer(&self, number: usize) -> String {
        format!("{}Answer: {}\n", self.render(number), self.answer)
    }
}

/// How many parsed records were kept versus dropped for being malformed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParseYield {
    pub accepted: usize,
    pub rejected: usize,
}

impl ParseYield {
    pub fn is_empty(&self) -> bool {
        self.accepted == 0
    }

    pub fn is_below(&self, expected: usize) -> bool {
        self.accepted * 2 < expected
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedQuestions {
    pub questions: Vec<Question>,
    pub rejected: usize,
}

impl ParsedQuestions {
    pub fn yield_stats(&self) -> ParseYield {
        ParseYield {
            accepted: self.questions.len(),
            rejected: self.rejected,
        }
    }
}

/// Content hash identifying one immutable version of a question bank.
pub fn bank_snapshot_id(questions: &[Question]) -> String {
    let mut hasher = Sha256::new();
    for question in questions {
        hasher.update(question.question.as_bytes());
        hasher.update([0u8]);
        for (_, option) in question.options.iter() {
            hasher.update(option.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(question.answer.as_str().as_bytes());
        hasher.update([0xffu8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
