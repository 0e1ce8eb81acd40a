// * Contact pattern extraction
// * Finds emails, phone numbers and professional-network profile URLs in page
// * text, keeping the byte span of every mention for attribution.

use crate::persistence::schema::{ContactKind, Span};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// * Precompiled regex patterns for performance

static PATTERN_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}").expect("Invalid email regex")
});

// * UK numbers: +44 (0)121 439 7129, 0121 439 7129, 01214397129, 07700 900123
static PATTERN_PHONE_UK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+44[\s-]?(?:\(0\)[\s-]?)?|\(?0)\d{2,4}\)?[\s-]?\d{3,4}[\s-]?\d{3,4}")
        .expect("Invalid UK phone regex")
});

static PATTERN_PHONE_INTL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+[1-9]\d{0,3}[\s-]?\(?\d{1,4}\)?(?:[\s-]?\d{2,4}){2,4}").expect("Invalid international phone regex")
});

static PATTERN_PROFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:[a-z]{2,3}\.)?linkedin\.com/in/[a-z0-9\-_%]+/?")
        .expect("Invalid profile URL regex")
});

// * File extensions that look like email TLDs in asset names (logo@2x.png)
const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

/// A contact detail found in page text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMention {
    pub kind: ContactKind,
    /// Canonical value (lowercased email, trimmed phone, canonical profile URL)
    pub value: String,
    pub span: Span,
}

/// Configuration for which contact kinds to extract
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub extract_emails: bool,
    pub extract_phones: bool,
    pub extract_profiles: bool,
    /// Inclusive digit-count range accepted for phone numbers
    pub phone_digits: (usize, usize),
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            extract_emails: true,
            extract_phones: true,
            extract_profiles: true,
            phone_digits: (10, 13),
        }
    }
}

/// Extracts contact mentions from text using regex patterns
pub struct RegexExtractor {
    config: ExtractorConfig,
}

impl RegexExtractor {
    /// Creates a new extractor with default configuration
    pub fn new() -> Self {
        Self {
            config: ExtractorConfig::default(),
        }
    }

    /// Creates a new extractor with custom configuration
    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extracts every configured contact kind, ordered by position
    pub fn extract(&self, text: &str) -> Vec<ContactMention> {
        let mut mentions = Vec::new();

        if self.config.extract_profiles {
            for m in PATTERN_PROFILE.find_iter(text) {
                mentions.push(ContactMention {
                    kind: ContactKind::Profile,
                    value: canonical_profile_url(m.as_str()),
                    span: Span::new(m.start(), m.end()),
                });
            }
        }

        if self.config.extract_emails {
            for m in PATTERN_EMAIL.find_iter(text) {
                let value = m.as_str().trim_end_matches('.').to_lowercase();
                if ASSET_SUFFIXES.iter().any(|s| value.ends_with(s)) {
                    continue;
                }
                let span = Span::new(m.start(), m.start() + value.len());
                if overlaps_any(&mentions, &span) {
                    continue;
                }
                mentions.push(ContactMention {
                    kind: ContactKind::Email,
                    value,
                    span,
                });
            }
        }

        // * Phones last: digits inside emails and profile slugs are not phones
        if self.config.extract_phones {
            for pattern in [&*PATTERN_PHONE_UK, &*PATTERN_PHONE_INTL] {
                for m in pattern.find_iter(text) {
                    let raw = m.as_str().trim_end();
                    let span = Span::new(m.start(), m.start() + raw.len());
                    if overlaps_any(&mentions, &span) || !self.is_phone_shaped(text, raw, &span) {
                        continue;
                    }
                    mentions.push(ContactMention {
                        kind: ContactKind::Phone,
                        value: raw.to_string(),
                        span,
                    });
                }
            }
        }

        mentions.sort_by_key(|m| (m.span.start, m.span.end));
        mentions
    }

    /// Extracts only the given kind
    pub fn extract_kind(&self, text: &str, kind: ContactKind) -> Vec<ContactMention> {
        self.extract(text).into_iter().filter(|m| m.kind == kind).collect()
    }

    fn is_phone_shaped(&self, text: &str, raw: &str, span: &Span) -> bool {
        let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
        let (min, max) = self.config.phone_digits;
        if digits < min || digits > max {
            return false;
        }
        // * Reject fragments of longer digit runs (order numbers, VAT ids)
        let before = text[..span.start].chars().next_back();
        let after = text[span.end..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    }
}

impl Default for RegexExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn overlaps_any(mentions: &[ContactMention], span: &Span) -> bool {
    mentions.iter().any(|m| m.span.overlaps(span))
}

/// `https://www.linkedin.com/in/slug` with no trailing slash or query
pub fn canonical_profile_url(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let without_scheme = lower
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let path_start = without_scheme.find("linkedin.com/in/").unwrap_or(0);
    let slug = without_scheme[path_start..]
        .trim_start_matches("linkedin.com/in/")
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");
    format!("https://www.linkedin.com/in/{}", slug)
}

/// True when the value is a profile URL in canonical form with a non-empty slug
pub fn is_profile_url(value: &str) -> bool {
    profile_slug(value).is_some_and(|slug| !slug.is_empty())
}

/// Slug of a canonical profile URL
pub fn profile_slug(value: &str) -> Option<&str> {
    value.strip_prefix("https://www.linkedin.com/in/")
}

/// Comparison key for a contact value: lowercase email, bare digits for phones
/// (with the UK trunk prefix folded into +44), canonical profile URL
pub fn contact_key(kind: ContactKind, value: &str) -> String {
    match kind {
        ContactKind::Email => value.trim().to_lowercase(),
        ContactKind::Profile => canonical_profile_url(value),
        ContactKind::Phone => {
            let digits: String = value
                .replace("(0)", "")
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            match digits.strip_prefix('0') {
                Some(rest) if !value.trim_start().starts_with('+') => format!("44{}", rest),
                _ => digits,
            }
        }
    }
}
