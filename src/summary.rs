use std::sync::Arc;
use tracing::debug;

use crate::error::ProviderError;
use crate::models::{GenerationConfig, SummaryType};
use crate::provider::SummaryProvider;

pub const MAX_BULLETS: usize = 5;
// paragraph_bullet asks the provider once more when it has fewer points than this
pub const MIN_DISTINCT_POINTS: usize = 3;
pub const BULLET_MARKER: &str = "•";

const PARAGRAPH_PROMPT: &str = "Summarize the following large text into a well-structured paragraph. \
Focus on the main points and key information. Make it concise but comprehensive. \
Use clear and professional language.";

const MAIN_POINTS_PROMPT: &str = "Summarize the main points and key information of the following text \
in one well-structured paragraph. Use clear and professional language.";

const SUPPORTING_DETAILS_PROMPT: &str = "Write one well-structured paragraph covering the supporting details \
and additional context of the following text. Do not restate its headline points. \
Use clear and professional language.";

const SHORT_PARAGRAPH_PROMPT: &str = "Summarize the following text into a small well-structured paragraph \
covering the main points and key information. Use clear and professional language.";

const DETAIL_POINTS_PROMPT: &str = "List specific details or important aspects of the following text. \
Write each one as a short standalone sentence on its own line.";

const MORE_POINTS_PROMPT: &str = "List further specific facts from the following text that a reader \
would want highlighted. Write each one as a short standalone sentence on its own line.";

const BULLET_PROMPT: &str = "Summarize the following text into at most 5 key points. \
Focus on the most important information. Write each point as one concise sentence on its own line.";

// main-points pass
const FOCUSED: GenerationConfig = GenerationConfig {
    temperature: Some(0.3),
    top_p: Some(0.8),
};
// supporting-details pass
const EXPANSIVE: GenerationConfig = GenerationConfig {
    temperature: Some(0.7),
    top_p: Some(0.95),
};
const DETERMINISTIC: GenerationConfig = GenerationConfig {
    temperature: Some(0.0),
    top_p: None,
};
const VARIED: GenerationConfig = GenerationConfig {
    temperature: Some(0.9),
    top_p: Some(0.95),
};
const PADDING: GenerationConfig = GenerationConfig {
    temperature: Some(1.0),
    top_p: Some(0.95),
};

fn build_prompt(instructions: &str, text: &str) -> String {
    format!("{instructions}\n\nText to summarize:\n{text}")
}

/// Picks a formatting strategy per [`SummaryType`] and drives the provider
/// calls it needs.
pub struct Summarizer {
    provider: Arc<dyn SummaryProvider>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn SummaryProvider>) -> Self {
        Self { provider }
    }

    pub async fn summarize(&self, text: &str, summary_type: SummaryType) -> Result<String, ProviderError> {
        debug!(%summary_type, chars = text.len(), "generating summary");

        let summary = match summary_type {
            SummaryType::Paragraph => self.paragraph(text).await?,
            SummaryType::TwoParagraph => self.two_paragraph(text).await?,
            SummaryType::ParagraphBullet => self.paragraph_bullet(text).await?,
            SummaryType::Bullet => self.bullet(text).await?,
        };

        if summary.trim().is_empty() {
            return Err(ProviderError::EmptySummary);
        }
        Ok(summary)
    }

    async fn ask(&self, instructions: &str, text: &str, config: GenerationConfig) -> Result<String, ProviderError> {
        let out = self
            .provider
            .generate(&build_prompt(instructions, text), config)
            .await?;
        Ok(out.trim().to_string())
    }

    async fn paragraph(&self, text: &str) -> Result<String, ProviderError> {
        self.ask(PARAGRAPH_PROMPT, text, FOCUSED).await
    }

    async fn two_paragraph(&self, text: &str) -> Result<String, ProviderError> {
        let main = self.ask(MAIN_POINTS_PROMPT, text, FOCUSED).await?;
        let details = self.ask(SUPPORTING_DETAILS_PROMPT, text, EXPANSIVE).await?;
        Ok(format!("{main}\n\n{details}"))
    }

    async fn paragraph_bullet(&self, text: &str) -> Result<String, ProviderError> {
        let paragraph = self.ask(SHORT_PARAGRAPH_PROMPT, text, DETERMINISTIC).await?;
        let candidates = self.ask(DETAIL_POINTS_PROMPT, text, VARIED).await?;

        let mut points = Vec::new();
        merge_points(&mut points, &candidates, &paragraph);

        if points.len() < MIN_DISTINCT_POINTS {
            debug!(have = points.len(), "too few distinct points, sampling again");
            let extra = self.ask(MORE_POINTS_PROMPT, text, PADDING).await?;
            merge_points(&mut points, &extra, &paragraph);
        }

        if points.is_empty() {
            return Ok(paragraph);
        }
        Ok(format!("{paragraph}\n\n{}", format_bullets(&points)))
    }

    async fn bullet(&self, text: &str) -> Result<String, ProviderError> {
        let raw = self.ask(BULLET_PROMPT, text, FOCUSED).await?;

        // exact repeats only, a sentence that extends an earlier one stays
        let mut points: Vec<String> = Vec::new();
        for point in split_sentences(&raw) {
            if points.len() >= MAX_BULLETS {
                break;
            }
            if !points.contains(&point) {
                points.push(point);
            }
        }
        Ok(format_bullets(&points))
    }
}

pub fn format_bullets(points: &[String]) -> String {
    points
        .iter()
        .take(MAX_BULLETS)
        .map(|p| format!("{BULLET_MARKER} {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits model output into sentence-sized points.
///
/// Breaks on newlines and on `.`, `!` or `?` followed by whitespace or the
/// end of the text. Leading list markers are removed and fragments with no
/// letters or digits are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    for line in text.lines() {
        let line = strip_marker(line);
        let mut current = String::new();
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
                push_point(&mut out, &current);
                current.clear();
            }
        }
        push_point(&mut out, &current);
    }
    out
}

fn push_point(out: &mut Vec<String>, raw: &str) {
    let point = strip_marker(raw);
    if point.chars().any(char::is_alphanumeric) {
        out.push(point.to_string());
    }
}

// "• x", "- x", "* x", "1. x", "2) x" -> "x". A single marker, and only
// when whitespace follows it: "-5 degrees" and "**Bold**" are left alone.
fn strip_marker(s: &str) -> &str {
    let s = s.trim();
    let s = match s.strip_prefix(['•', '-', '*', '–', '·']) {
        Some(after) if after.is_empty() || after.starts_with(char::is_whitespace) => after.trim_start(),
        _ => s,
    };

    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = s[digits..].strip_prefix(['.', ')']);
        if let Some(after) = after.filter(|a| a.is_empty() || a.starts_with(char::is_whitespace)) {
            return after.trim();
        }
    }
    s.trim()
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase()
}

// One side contained in the other, after normalization
fn overlaps(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// Adds the sentences of `raw` to `points`, skipping anything already said
/// by `paragraph` or by an earlier point. Stops at [`MAX_BULLETS`].
pub fn merge_points(points: &mut Vec<String>, raw: &str, paragraph: &str) {
    let paragraph = normalize(paragraph);
    let mut seen: Vec<String> = points.iter().map(|p| normalize(p)).collect();

    for point in split_sentences(raw) {
        if points.len() >= MAX_BULLETS {
            break;
        }
        let key = normalize(&point);
        if overlaps(&paragraph, &key) || seen.iter().any(|s| overlaps(s, &key)) {
            continue;
        }
        seen.push(key);
        points.push(point);
    }
}
