pub const CHUNK_SUMMARY_PROMPT: &str = "You are an assistant tasked with summarizing text.
Give a concise summary of the text.

Respond only with the summary, no additional comment.
Do not start your message by saying \"Here is a summary\" or anything like that.
Just give the summary as it is.

Text chunk:
";

pub const TOC_PROMPT_TEMPLATE: &str = "You are an expert instructional designer tasked with crafting a high-level course outline. \
Using the consolidated summary below, which captures the essential concepts from several source documents, \
create modules. For each module, output **only**:

**Module X: [Module Title]**
Summary: [An 80-120-word paragraph in clear, active voice that includes:]
  - A one-sentence overview of the module's theme
  - 1-2 bullet-style learning objectives
  - 1-2 keywords or topics for retrieval-based querying

Constraints:
- Exactly {min_modules}-{max_modules} modules.
- No submodules, introductory remarks, or closing statements.
- Do not use lists or extra formatting inside the summary except the bullet points for objectives.

Example:
**Module 1: Introduction to Blockchain**
Summary: This module introduces the core principles of blockchain technology and its historical evolution.
Learning Objectives:
  - Understand the definition and purpose of a blockchain
  - Describe how decentralization enhances security
Keywords: consensus mechanisms, distributed ledger

Summary:
{summary}";

pub const MODULE_CONTENT_PROMPT_TEMPLATE: &str = "**Task:** Generate a well-structured and easy-to-understand module for a learning course.

**Instructions:**
- Use the context below only as supporting material. Do **not** copy content verbatim; use it to **explain and teach** the topic in your own words.
- Follow a clear pedagogical structure: introduce the topic, explain core concepts, then move to advanced or applied ideas.
- Make sure the module **fits logically within the entire course structure**. Refer to the Table of Contents below to avoid repetition or overlap with other modules.
- The writing should be **educational, clear, and concise**.
- Do **not** add the title of the module.
- Use **Markdown formatting** only:
    - Use `##`, `###`, etc. for headings and subheadings.
    - Use bullet points only when they improve clarity.
    - Use **LaTeX-style math** (e.g., `$E = mc^2$`) instead of HTML tags.
- You may add generally accepted factual information that enhances understanding.
- Do **not** include introductory remarks like \"Here is the content\" or repeat the summary/context.

**Course Table of Contents (with module summaries):**
{toc}

**Current Module Summary:**
{summary}

**Reference Context (from uploaded materials):**
{context}

**Now write the module content in Markdown:**
";

pub const QUESTION_BANK_PROMPT: &str = "You are an AI assistant tasked with generating multiple-choice questions (MCQs) \
to assess understanding of the provided module content.

Instructions:
- Generate about {count} MCQs based on the module content.
- Each question should have four options labeled a), b), c), and d).
- Only one option should be correct.
- Provide the correct answer after each question.
- Separate questions with a blank line.

Format:
1. [Question text]
a) [Option A]
b) [Option B]
c) [Option C]
d) [Option D]
Answer: [a/b/c/d]

2. [Question text]
a) [Option A]
b) [Option B]
c) [Option C]
d) [Option D]
Answer: [a/b/c/d]

Module Content:
";

pub const MODULE_QUIZ_SELECTION_PROMPT: &str = "You are an intelligent assistant tasked with generating a personalized quiz to help reduce a user's knowledge gaps.
Based on the list of questions the user answered incorrectly, select **exactly {count} related questions** from the provided database.
Constraints:
- Choose only questions that are conceptually or thematically related to the incorrectly answered ones.
- Select exactly {count} distinct questions.
- Return only their **question numbers**, separated by commas (no additional explanation).
Format example:
1, 3, 5, 6, 7

* User's incorrectly answered questions: *
{incorrect}
* Available questions in the database: *
{questions}";

pub const FINAL_EXAM_FRESH_PROMPT: &str = "You are an AI assistant writing part of a final exam for a learning course.
Generate exactly {count} new multiple-choice questions that assess understanding of the module content below.

Instructions:
- Each question should have four options labeled a), b), c), and d).
- Only one option should be correct.
- Provide the correct answer after each question as \"Answer: <letter>\".
- Separate questions with a blank line.

Format:
1. [Question text]
a) [Option A]
b) [Option B]
c) [Option C]
d) [Option D]
Answer: [a/b/c/d]

Module Content:
{content}";

pub const FINAL_EXAM_WEIGHTED_PROMPT: &str = "You are an AI assistant writing part of a final exam for a learning course.
The learner previously answered the questions below incorrectly. Generate exactly {count} new multiple-choice questions \
that revisit the concepts behind those mistakes. Do not repeat any question from the existing question bank.

Instructions:
- Each question should have four options labeled a), b), c), and d).
- Only one option should be correct.
- Provide the correct answer after each question as \"Answer: <letter>\".
- Separate questions with a blank line.

Format:
1. [Question text]
a) [Option A]
b) [Option B]
c) [Option C]
d) [Option D]
Answer: [a/b/c/d]

* Questions the learner answered incorrectly: *
{incorrect}
* Existing question bank (do not duplicate): *
{questions}";

/// Fills `{name}` placeholders in a prompt template.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |prompt, (name, value)| {
            prompt.replace(&format!("{{{}}}", name), value)
        })
}
