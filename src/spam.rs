//! Spam-risk scoring — additive heuristic over subject + body.
//!
//! Pure and deterministic: no I/O, no failure path. Each signal contributes
//! a fixed weight; the sum is clamped to 1.0.

use regex::Regex;

/// Indicator terms. Presence test, not occurrence count — a term matched
/// five times contributes the same 0.1 as matched once.
const SPAM_TERMS: [&str; 20] = [
    "free",
    "win",
    "winner",
    "congratulations",
    "urgent",
    "act now",
    "limited time",
    "click here",
    "buy now",
    "discount",
    "offer",
    "cash",
    "money",
    "earn",
    "income",
    "profit",
    "investment",
    "guarantee",
    "risk-free",
    "no obligation",
];

/// Weight per indicator term present.
const TERM_WEIGHT: f64 = 0.1;
/// Weight when uppercase letters exceed 30% of all letters.
const CAPS_WEIGHT: f64 = 0.2;
/// Flat weight for any run of two or more exclamation marks.
const SHOUTING_WEIGHT: f64 = 0.15;
/// Weight for an http:// or https:// substring.
const URL_WEIGHT: f64 = 0.1;
/// Weight for a phone-number-like pattern.
const PHONE_WEIGHT: f64 = 0.05;

/// Spam scorer with its pattern compiled once.
pub struct SpamScorer {
    phone_re: Regex,
}

impl SpamScorer {
    pub fn new() -> Self {
        Self {
            phone_re: Regex::new(r"\d{3}[-.]?\d{3}[-.]?\d{4}").expect("valid phone pattern"),
        }
    }

    /// Score a subject/body pair. Always in `[0.0, 1.0]`.
    ///
    /// Keyword and pattern checks run on the lowercased combined text; the
    /// caps ratio is computed over the original-case text.
    pub fn score(&self, subject: &str, body: &str) -> f64 {
        let combined = format!("{subject} {body}");
        let text = combined.to_lowercase();

        let mut score = 0.0;

        for term in SPAM_TERMS {
            if text.contains(term) {
                score += TERM_WEIGHT;
            }
        }

        if caps_ratio(&combined) > 0.3 {
            score += CAPS_WEIGHT;
        }

        if text.contains("!!") {
            score += SHOUTING_WEIGHT;
        }

        if text.contains("http://") || text.contains("https://") {
            score += URL_WEIGHT;
        }

        if self.phone_re.is_match(&text) {
            score += PHONE_WEIGHT;
        }

        score.min(1.0)
    }
}

impl Default for SpamScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Ratio of uppercase letters to all letters. 0.0 when there are no letters.
fn caps_ratio(text: &str) -> f64 {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return 0.0;
    }
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters as f64
}

/// Coarse risk classification over a raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::High
        } else if score > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Advisory strings shown next to a computed score.
    pub fn advisories(&self) -> Vec<String> {
        match self {
            Self::High => vec![
                "High spam risk detected".into(),
                "Consider removing promotional language".into(),
                "Avoid excessive capitalization".into(),
                "Remove multiple exclamation marks".into(),
            ],
            Self::Medium => vec![
                "Medium spam risk detected".into(),
                "Consider toning down promotional language".into(),
                "Check for excessive punctuation".into(),
            ],
            Self::Low => vec!["Low spam risk - email looks good".into()],
        }
    }
}
