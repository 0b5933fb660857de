use crate::errors::{AppError, AppResult};

/// Size limits for title-based chunking, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    pub combine_under_chars: usize,
    pub new_after_chars: usize,
    pub max_chars: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            combine_under_chars: 2000,
            new_after_chars: 6000,
            max_chars: 10000,
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn is_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ')
}

fn is_table_block(block: &str) -> bool {
    let mut lines = block.lines().filter(|line| !line.trim().is_empty()).peekable();
    lines.peek().is_some() && lines.all(|line| line.trim_start().starts_with('|'))
}

/// Splits text into sections, each starting at a markdown heading.
fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if is_heading(line) && !current.trim().is_empty() {
            sections.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        sections.push(current.trim().to_string());
    }
    sections
}

/// Paragraph blocks separated by blank lines; tables stay whole.
fn split_blocks(section: &str) -> Vec<String> {
    section
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(str::to_string)
        .collect()
}

fn hard_split(block: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for line in block.lines() {
        if char_len(line) > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = line.chars().collect();
            pieces.extend(chars.chunks(max_chars).map(|part| part.iter().collect::<String>()));
            continue;
        }
        if !current.is_empty() && char_len(&current) + 1 + char_len(line) > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn split_long_section(section: &str, options: &ChunkingOptions) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for block in split_blocks(section) {
        let parts = if char_len(&block) > options.max_chars && !is_table_block(&block) {
            hard_split(&block, options.max_chars)
        } else {
            vec![block]
        };

        for part in parts {
            let combined = char_len(&current) + 2 + char_len(&part);
            if !current.is_empty()
                && (char_len(&current) >= options.new_after_chars || combined > options.max_chars)
            {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&part);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Chunks extracted text by title: one chunk per heading section, small sections
/// merged forward, long ones split on paragraph and line boundaries.
pub fn chunk_text(text: &str, options: &ChunkingOptions) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for section in split_sections(text) {
        let pieces = if char_len(&section) > options.new_after_chars {
            split_long_section(&section, options)
        } else {
            vec![section]
        };

        for piece in pieces {
            let mergeable = !current.is_empty()
                && char_len(&current) < options.combine_under_chars
                && char_len(&current) + 2 + char_len(&piece) <= options.new_after_chars;

            if mergeable {
                current.push_str("\n\n");
                current.push_str(&piece);
            } else {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                current = piece;
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Reads every source file in order and returns their chunks concatenated.
pub async fn load_sources(paths: &[String], options: &ChunkingOptions) -> AppResult<Vec<String>> {
    let mut chunks = Vec::new();

    for path in paths {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::ValidationError(format!("Cannot read source file '{}': {}", path, e))
        })?;
        let file_chunks = chunk_text(&text, options);
        log::info!("Split '{}' into {} chunks", path, file_chunks.len());
        chunks.extend(file_chunks);
    }

    if chunks.is_empty() {
        return Err(AppError::ValidationError(
            "Source files contain no text".to_string(),
        ));
    }
    Ok(chunks)
}
