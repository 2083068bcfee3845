use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// The four output formats a caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    Paragraph,
    TwoParagraph,
    ParagraphBullet,
    Bullet,
}

impl SummaryType {
    pub const ALL: [SummaryType; 4] = [
        SummaryType::Paragraph,
        SummaryType::TwoParagraph,
        SummaryType::ParagraphBullet,
        SummaryType::Bullet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryType::Paragraph => "paragraph",
            SummaryType::TwoParagraph => "two_paragraph",
            SummaryType::ParagraphBullet => "paragraph_bullet",
            SummaryType::Bullet => "bullet",
        }
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSummaryType(pub String);

impl FromStr for SummaryType {
    type Err = UnknownSummaryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SummaryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownSummaryType(s.to_string()))
    }
}

// POST /summarize body. `type` stays a raw string so an unknown value
// becomes our own 400 instead of a deserializer rejection.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "type", default)]
    pub summary_type: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SummarizeResponse {
    pub summary: String,
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    pub cached: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

// Gemini generateContent request format
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

// Gemini generateContent response format. Only the fields we read.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    // Text of the first candidate, parts concatenated. None when the model
    // returned nothing usable.
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
