// 🤖 Model Adapter - boundary to the remote text-classification service
// Provider errors are mapped onto a closed set of outcomes

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::category::{short_name, Category, Classification};

// ============================================================================
// MODEL TIERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// First model asked for every uncached item
    Primary,
    /// Cheaper model used once when the primary is out of quota
    Alternative,
    /// Stronger model used once when the answer is Misc
    Upgrade,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Primary => "primary",
            ModelTier::Alternative => "alternative",
            ModelTier::Upgrade => "upgrade",
        }
    }
}

/// Model names for each tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTiers {
    pub primary: String,
    pub alternative: String,
    pub upgrade: String,
}

impl ModelTiers {
    pub fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Primary => &self.primary,
            ModelTier::Alternative => &self.alternative,
            ModelTier::Upgrade => &self.upgrade,
        }
    }
}

impl Default for ModelTiers {
    fn default() -> Self {
        ModelTiers {
            primary: "gemini-2.5-flash".to_string(),
            alternative: "gemini-2.5-flash-lite".to_string(),
            upgrade: "gemini-2.5-pro".to_string(),
        }
    }
}

// ============================================================================
// BOUNDARY
// ============================================================================

/// Result of one external call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    /// Raw response text
    Ok(String),
    /// Quota or rate limit signalled by the provider
    ResourceExhausted,
    /// Transport failure, timeout, or unexpected provider error
    Exception(String),
    /// No usable client (e.g. empty credential)
    NoClient,
}

pub trait ModelClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str) -> ModelOutcome;
}

// ============================================================================
// GEMINI CLIENT
// ============================================================================

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Blocking client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    api_key: String,
    api_base: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into(),
            timeout,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            model
        )
    }

    fn call(&self, model: &str, prompt: &str) -> std::result::Result<ureq::Response, ureq::Error> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        // Serializing borrowed strings cannot fail
        let body = serde_json::to_string(&request).unwrap_or_default();

        ureq::post(&self.endpoint(model))
            .set("Content-Type", "application/json")
            .set("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .send_string(&body)
    }
}

impl ModelClient for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> ModelOutcome {
        if self.api_key.trim().is_empty() {
            return ModelOutcome::NoClient;
        }

        log::debug!("calling model {} at {}", model, self.api_base);

        match self.call(model, prompt) {
            Ok(response) => {
                let parsed = response
                    .into_string()
                    .context("Failed to read generateContent response")
                    .and_then(|raw| response_text(&raw));
                match parsed {
                    Ok(text) => {
                        log::debug!("model {} response: {}", model, text);
                        ModelOutcome::Ok(text)
                    }
                    Err(e) => ModelOutcome::Exception(format!("{:#}", e)),
                }
            }
            Err(ureq::Error::Status(429, _)) => ModelOutcome::ResourceExhausted,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                ModelOutcome::Exception(format!("HTTP {}: {}", code, detail))
            }
            Err(e) => ModelOutcome::Exception(e.to_string()),
        }
    }
}

/// Concatenate the text parts of the first candidate
fn response_text(raw: &str) -> Result<String> {
    let response: GenerateResponse =
        serde_json::from_str(raw).context("Failed to parse generateContent response")?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        anyhow::bail!("generateContent response carried no text");
    }
    Ok(text)
}

// ============================================================================
// PROMPT & RESPONSE PARSING
// ============================================================================

pub fn build_prompt(item: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a grocery categorization assistant. Classify the following grocery item into ONE of these categories: {categories}.

Return ONLY a JSON object inside a ```json fenced block with the exact schema:
{{
  "category": "<category>",
  "normalized_name": "<name>"
}}

Rules: do NOT invent items; do NOT include brand names unless essential; if uncertain choose "Misc"; normalized_name must be 1-3 words.

Item: "{item}"

Respond with JSON only."#,
        categories = categories,
        item = item.trim(),
    )
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerdictError {
    #[error("no fenced JSON block in response")]
    MissingFence,
    #[error("fenced block is not valid JSON")]
    InvalidJson,
    #[error("category missing or not allowed: {0:?}")]
    InvalidCategory(Option<String>),
    #[error("normalized_name missing or empty")]
    MissingName,
}

/// Pull the body of the first ```json fence out of surrounding prose
pub fn extract_fenced_json(text: &str) -> std::result::Result<Value, VerdictError> {
    const OPEN: &str = "```json";
    const CLOSE: &str = "```";

    let start = text.find(OPEN).ok_or(VerdictError::MissingFence)?;
    let after_open = &text[start + OPEN.len()..];

    // The tag must end its line
    let newline = after_open.find('\n').ok_or(VerdictError::MissingFence)?;
    if !after_open[..newline].trim().is_empty() {
        return Err(VerdictError::MissingFence);
    }
    let body_and_rest = &after_open[newline + 1..];

    let end = body_and_rest.find(CLOSE).ok_or(VerdictError::MissingFence)?;
    serde_json::from_str(body_and_rest[..end].trim()).map_err(|_| VerdictError::InvalidJson)
}

/// Parse and validate a model response into a classification
pub fn parse_verdict(text: &str) -> std::result::Result<Classification, VerdictError> {
    let value = extract_fenced_json(text)?;

    let raw_category = value.get("category").and_then(Value::as_str);
    let category = raw_category
        .and_then(Category::from_label)
        .ok_or_else(|| VerdictError::InvalidCategory(raw_category.map(str::to_string)))?;

    let name = value
        .get("normalized_name")
        .and_then(Value::as_str)
        .map(short_name)
        .filter(|name| !name.is_empty())
        .ok_or(VerdictError::MissingName)?;

    Ok(Classification::new(category, name))
}
