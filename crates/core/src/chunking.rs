use crate::models::Chunk;
use regex::Regex;
use std::sync::OnceLock;

/// Two or more line breaks, with only horizontal whitespace between and around them.
const PARAGRAPH_BREAK: &str = r"[ \t\r\x0c]*\n(?:[ \t\r\x0c]*\n)+[ \t\r\x0c]*";

fn paragraph_break() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(PARAGRAPH_BREAK).expect("paragraph break pattern is valid"))
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Byte ranges of the trimmed, non-empty paragraphs of `text`, in order.
pub fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    let boundaries = paragraph_break()
        .find_iter(text)
        .map(|found| (found.start(), found.end()))
        .chain(std::iter::once((text.len(), text.len())));

    for (break_start, break_end) in boundaries {
        let piece = &text[cursor..break_start];
        let leading = piece.len() - piece.trim_start().len();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            let start = cursor + leading;
            spans.push((start, start + trimmed.len()));
        }
        cursor = break_end;
    }

    spans
}

/// Splits `text` into paragraph chunks, dropping any whose trimmed length is
/// `min_chars` characters or fewer. Order is preserved and nothing is deduplicated.
pub fn split_into_chunks(document_id: &str, text: &str, min_chars: usize) -> Vec<Chunk> {
    paragraph_spans(text)
        .into_iter()
        .filter(|(start, end)| text[*start..*end].chars().count() > min_chars)
        .enumerate()
        .map(|(position, (start, end))| Chunk {
            document_id: document_id.to_string(),
            position,
            start,
            end,
            text: text[start..end].to_string(),
            embedding: None,
        })
        .collect()
}
