//! Content refinement — AI-assisted rewrite with a deterministic fallback.
//!
//! `refine` never fails. When a provider is configured it is tried first;
//! any provider failure (network, bad status, unparseable JSON, missing
//! fields) is logged and control falls through to the heuristic pass, which
//! always produces a result.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::ai::AiProvider;

/// Where a refinement result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementSource {
    Ai,
    Heuristic,
}

/// Result of refining a subject/body pair. Ephemeral, never persisted.
///
/// `suggestions` may be empty but is never absent; subject and body are
/// always populated (equal to the originals when no rule applied).
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementResult {
    pub refined_subject: String,
    pub refined_body: String,
    pub suggestions: Vec<String>,
    pub source: RefinementSource,
}

/// Email refiner — AI-primary, heuristic fallback.
pub struct ContentRefiner {
    provider: Option<Arc<dyn AiProvider>>,
}

impl ContentRefiner {
    pub fn new(provider: Option<Arc<dyn AiProvider>>) -> Self {
        Self { provider }
    }

    /// Whether a live AI capability is configured.
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Refine a subject/body pair. Infallible.
    pub async fn refine(&self, subject: &str, body: &str) -> RefinementResult {
        if let Some(provider) = &self.provider {
            match self.refine_with_ai(provider.as_ref(), subject, body).await {
                Ok(result) => return result,
                Err(e) => {
                    warn!(error = %e, "AI refinement failed, using heuristic fallback");
                }
            }
        }
        heuristic_refine(subject, body)
    }

    async fn refine_with_ai(
        &self,
        provider: &dyn AiProvider,
        subject: &str,
        body: &str,
    ) -> Result<RefinementResult, crate::error::ProviderError> {
        let user_prompt = build_refinement_prompt(subject, body);
        let raw = provider.complete(REFINEMENT_SYSTEM_PROMPT, &user_prompt).await?;

        let json = extract_json_object(&raw);
        let parsed: RefinementResponse =
            serde_json::from_str(&json).map_err(|e| crate::error::ProviderError::InvalidResponse {
                provider: provider.name().to_string(),
                reason: format!("refinement JSON parse failed: {e}"),
            })?;

        debug!(
            suggestions = parsed.suggestions.len(),
            "AI refinement complete"
        );

        Ok(RefinementResult {
            refined_subject: parsed.refined_subject,
            refined_body: parsed.refined_body,
            suggestions: parsed.suggestions,
            source: RefinementSource::Ai,
        })
    }
}

// ── Prompting ───────────────────────────────────────────────────────

const REFINEMENT_SYSTEM_PROMPT: &str = "You are an expert email writing assistant. \
     Help users write professional, clear, and engaging emails.";

/// User prompt asking for an improved subject, improved body, and 3-5
/// suggestions in a fixed JSON shape.
fn build_refinement_prompt(subject: &str, body: &str) -> String {
    format!(
        "Please improve the following email to make it more professional, clear, \
         and engaging while maintaining the original intent:\n\n\
         Subject: {subject}\n\
         Body: {body}\n\n\
         Please provide:\n\
         1. An improved subject line\n\
         2. An improved email body\n\
         3. 3-5 specific suggestions for improvement\n\n\
         Format your response as JSON:\n\
         {{\n\
           \"refinedSubject\": \"improved subject\",\n\
           \"refinedBody\": \"improved body\",\n\
           \"suggestions\": [\"suggestion1\", \"suggestion2\", \"suggestion3\"]\n\
         }}"
    )
}

/// Expected provider response. All fields required — anything missing is
/// treated as a provider error and triggers the fallback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefinementResponse {
    refined_subject: String,
    refined_body: String,
    suggestions: Vec<String>,
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

// ── Heuristic fallback ──────────────────────────────────────────────

/// Maximum subject length before the shortening rule applies.
const MAX_SUBJECT_CHARS: usize = 50;
/// Body shorter than this gets a "too short" suggestion.
const MIN_BODY_CHARS: usize = 50;
/// Body longer than this gets a "too long" suggestion.
const MAX_BODY_CHARS: usize = 1000;
/// More exclamation marks than this gets a tone suggestion.
const MAX_EXCLAMATIONS: usize = 3;

/// Deterministic rewrite rules. All checks run against the original input;
/// rewrites accumulate independently.
pub fn heuristic_refine(subject: &str, body: &str) -> RefinementResult {
    let mut suggestions = Vec::new();

    let mut refined_subject = subject.to_string();
    if subject.chars().count() > MAX_SUBJECT_CHARS {
        refined_subject = subject.chars().take(47).collect::<String>() + "...";
        suggestions.push("Consider shortening the subject line to under 50 characters".into());
    }

    if subject.ends_with('.') {
        suggestions.push("Subject lines typically don't end with periods".into());
    }

    let body_lower = body.to_lowercase();

    let mut refined_body = body.to_string();
    if !body_lower.starts_with("dear")
        && !body_lower.starts_with("hi")
        && !body_lower.starts_with("hello")
    {
        let name = extract_recipient_name(body).unwrap_or_else(|| "Recipient".to_string());
        refined_body = format!("Dear {name},\n\n{body}");
        suggestions.push("Consider adding a proper greeting".into());
    }

    if !body_lower.contains("sincerely")
        && !body_lower.contains("best regards")
        && !body_lower.contains("thank you")
    {
        refined_body.push_str("\n\nBest regards,\n[Your Name]");
        suggestions.push("Consider adding a proper closing".into());
    }

    let body_chars = body.chars().count();
    if body_chars < MIN_BODY_CHARS {
        suggestions.push("Email body seems quite short - consider adding more details".into());
    }
    if body_chars > MAX_BODY_CHARS {
        suggestions
            .push("Email body is quite long - consider breaking it into shorter paragraphs".into());
    }

    if body.matches('!').count() > MAX_EXCLAMATIONS {
        suggestions.push(
            "Consider reducing the number of exclamation marks for a more professional tone".into(),
        );
    }

    RefinementResult {
        refined_subject,
        refined_body,
        suggestions,
        source: RefinementSource::Heuristic,
    }
}

/// Pull a recipient name out of any `dear <name>` substring in the body.
/// The name runs to the first comma or newline.
fn extract_recipient_name(body: &str) -> Option<String> {
    let lower = body.to_lowercase();
    let idx = lower.find("dear")?;
    // Byte offsets can drift between the lowered and original strings for
    // exotic casings; bail rather than slice off a char boundary.
    let after = body.get(idx + 4..)?;
    let name: String = after
        .chars()
        .take_while(|&c| c != ',' && c != '\n')
        .collect();
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
