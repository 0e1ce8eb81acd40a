// * Semantic name validation
// * Exclusion lists run first, then a reference-list score decides acceptance.
// * Normalization (nickname expansion, surname casing) happens only after a
// * candidate is accepted.

use crate::persistence::schema::{Candidate, Rejection, RejectionReason, ValidatedName};
use crate::refinery::lexicon::Lexicon;

// * Score weights
const WEIGHT_REFERENCE: f64 = 0.45;
const WEIGHT_SHAPE: f64 = 0.25;
const WEIGHT_CAPITALIZATION: f64 = 0.10;
const WEIGHT_TOKEN_COUNT: f64 = 0.10;
const WEIGHT_CLEAN: f64 = 0.10;

// * Lowercase particles allowed inside a name
const PARTICLES: &[&str] = &["van", "von", "de", "der", "den", "da", "di", "du", "le", "la", "bin", "al"];

/// Outcome of validating one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(ValidatedName),
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            Verdict::Rejected(r) => Some(r.reason),
            Verdict::Accepted(_) => None,
        }
    }
}

/// Per-factor breakdown of a validity score
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValidityBreakdown {
    pub reference: f64,
    pub shape: f64,
    pub capitalization: f64,
    pub token_count: f64,
    pub clean: f64,
}

impl ValidityBreakdown {
    pub fn total(&self) -> f64 {
        (self.reference * WEIGHT_REFERENCE
            + self.shape * WEIGHT_SHAPE
            + self.capitalization * WEIGHT_CAPITALIZATION
            + self.token_count * WEIGHT_TOKEN_COUNT
            + self.clean * WEIGHT_CLEAN)
            .clamp(0.0, 1.0)
    }
}

/// Accepts or rejects candidates as plausible human names
#[derive(Debug, Clone)]
pub struct NameValidator {
    acceptance_threshold: f64,
}

fn name_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| c == ',' || c == ';' || c == '"'))
        .map(|t| t.trim_end_matches('.'))
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_initial(token: &str) -> bool {
    token.chars().count() == 1 && token.chars().all(char::is_alphabetic)
}

fn is_particle(token: &str) -> bool {
    PARTICLES.contains(&token)
}

impl NameValidator {
    pub fn new(acceptance_threshold: f64) -> Self {
        Self { acceptance_threshold }
    }

    pub fn acceptance_threshold(&self) -> f64 {
        self.acceptance_threshold
    }

    /// Classifies a candidate; rejections carry their reason and score
    pub fn validate(&self, candidate: Candidate, lexicon: &Lexicon) -> Verdict {
        let tokens = name_tokens(&candidate.text);

        let reject = |candidate: Candidate, reason: RejectionReason, score: f64| {
            tracing::debug!(candidate = %candidate.text, reason = %reason, score, "Candidate rejected");
            Verdict::Rejected(Rejection {
                candidate,
                reason,
                score,
            })
        };

        if tokens.is_empty() {
            return reject(candidate, RejectionReason::NotInReference, 0.0);
        }

        // * 1. Service/marketing/navigation terms
        if lexicon.service_phrase_in(&candidate.text).is_some() || tokens.iter().any(|t| lexicon.is_service_term(t)) {
            return reject(candidate, RejectionReason::ServiceTerm, 0.0);
        }

        // * 2. Localities
        if tokens.iter().any(|t| lexicon.is_place(t)) {
            return reject(candidate, RejectionReason::PlaceName, 0.0);
        }

        if tokens.iter().any(|t| lexicon.is_blacklisted(t)) {
            return reject(candidate, RejectionReason::Blacklist, 0.0);
        }

        let starts_lowercase = |t: &&str| t.chars().next().is_some_and(char::is_lowercase);
        if starts_lowercase(&tokens[0]) || tokens.iter().any(|t| starts_lowercase(t) && !is_particle(t)) {
            return reject(candidate, RejectionReason::NotCapitalized, 0.0);
        }

        // * Absence from both reference lists is an automatic reject
        let breakdown = Self::breakdown(&candidate.text, lexicon);
        if breakdown.reference == 0.0 {
            return reject(candidate, RejectionReason::NotInReference, breakdown.total());
        }

        let score = breakdown.total();
        if score < self.acceptance_threshold {
            return reject(candidate, RejectionReason::LowScore, score);
        }

        let normalized = normalize(&candidate.text, lexicon);
        Verdict::Accepted(ValidatedName {
            candidate,
            validity: score,
            normalized,
        })
    }

    /// Scores the raw candidate text
    pub fn breakdown(text: &str, lexicon: &Lexicon) -> ValidityBreakdown {
        let tokens = name_tokens(text);
        let words: Vec<&str> = tokens.iter().copied().filter(|t| !is_initial(t) && !is_particle(t)).collect();
        if words.is_empty() {
            return ValidityBreakdown::default();
        }

        let in_reference = words.iter().filter(|t| lexicon.in_reference(t)).count();
        let reference = in_reference as f64 / words.len() as f64;

        let first_ok = tokens.first().is_some_and(|t| is_initial(t) || lexicon.is_first_name(t));
        let last_ok = words.last().is_some_and(|t| lexicon.is_surname(t));
        let shape = match (first_ok, last_ok) {
            (true, true) if tokens.len() > 1 => 1.0,
            (true, _) | (_, true) => 0.5,
            _ => 0.0,
        };

        let capitalization = tokens
            .iter()
            .filter(|t| !is_particle(t))
            .map(|t| {
                let mut chars = t.chars();
                let first_upper = chars.next().is_some_and(char::is_uppercase);
                let rest: String = chars.collect();
                match (first_upper, rest.chars().any(char::is_lowercase)) {
                    (true, true) => 1.0,
                    // * Initials and ALL CAPS
                    (true, false) if rest.is_empty() => 1.0,
                    (true, false) => 0.5,
                    _ => 0.0,
                }
            })
            .sum::<f64>()
            / tokens.iter().filter(|t| !is_particle(t)).count().max(1) as f64;

        let token_count = match tokens.len() {
            2 | 3 => 1.0,
            4 => 0.5,
            _ => 0.3,
        };

        let clean = if text
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace() || matches!(c, '\'' | '’' | '-' | '.'))
        {
            1.0
        } else {
            0.0
        };

        ValidityBreakdown {
            reference,
            shape,
            capitalization,
            token_count,
            clean,
        }
    }
}

/// Canonical casing for one name token: "mcmanus" -> "McManus",
/// "o'brien" -> "O'Brien", "smith-jones" -> "Smith-Jones"
pub fn canonical_case(token: &str) -> String {
    let lower = token.to_lowercase().replace('’', "'");
    if is_particle(&lower) {
        return lower;
    }

    lower
        .split('-')
        .map(|part| {
            if let Some(rest) = part.strip_prefix("mc").filter(|r| r.chars().count() >= 2) {
                format!("Mc{}", capitalize(rest))
            } else if let Some(rest) = part.strip_prefix("o'").filter(|r| !r.is_empty()) {
                format!("O'{}", capitalize(rest))
            } else {
                capitalize(part)
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalized display form: honorifics dropped, leading nickname expanded,
/// canonical casing. Particles stay lowercase unless leading.
pub fn normalize(text: &str, lexicon: &Lexicon) -> String {
    let tokens: Vec<&str> = name_tokens(text)
        .into_iter()
        .skip_while(|t| lexicon.is_honorific(t))
        .collect();

    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            if i == 0 {
                if let Some(full) = lexicon.expand_nickname(token) {
                    return capitalize(full);
                }
                if is_particle(&token.to_lowercase()) {
                    return capitalize(&token.to_lowercase());
                }
            }
            if is_initial(token) {
                return token.to_uppercase();
            }
            canonical_case(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Registry officer names arrive as "RILEY, Andrew James"; rewrite to
/// "Andrew James Riley" with canonical casing
pub fn normalize_registry_name(raw: &str, lexicon: &Lexicon) -> String {
    let ordered = match raw.split_once(',') {
        Some((surname, forenames)) if !forenames.trim().is_empty() => {
            format!("{} {}", forenames.trim(), surname.trim())
        }
        _ => raw.trim().to_string(),
    };
    normalize(&ordered, lexicon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::schema::{ContextWindow, PageType, PatternId, Span};

    fn candidate(text: &str) -> Candidate {
        Candidate {
            text: text.to_string(),
            span: Span::new(0, text.len()),
            context: ContextWindow::default(),
            source_url: "https://example.co.uk/".to_string(),
            page_type: PageType::Home,
            pattern: PatternId::CapitalizedSequence,
        }
    }

    fn validate(text: &str) -> Verdict {
        NameValidator::new(0.55).validate(candidate(text), &Lexicon::builtin())
    }

    #[test]
    fn test_accepts_reference_names() {
        match validate("Andrew Riley") {
            Verdict::Accepted(name) => {
                assert_eq!(name.normalized, "Andrew Riley");
                assert!((name.validity - 1.0).abs() < 1e-9);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_service_terms_rejected() {
        for text in ["Call Now", "Opening Hours", "Emergency Plumbing", "Plumbing Services", "Riley Heating"] {
            assert_eq!(validate(text).rejection_reason(), Some(RejectionReason::ServiceTerm), "{}", text);
        }
    }

    #[test]
    fn test_place_names_rejected() {
        assert_eq!(validate("Sarah Harborne").rejection_reason(), Some(RejectionReason::PlaceName));
    }

    #[test]
    fn test_blacklist_rejected() {
        assert_eq!(validate("Managing Director").rejection_reason(), Some(RejectionReason::Blacklist));
    }

    #[test]
    fn test_unknown_tokens_rejected_regardless_of_capitalization() {
        assert_eq!(validate("Zorblax Quintaine").rejection_reason(), Some(RejectionReason::NotInReference));
        assert_eq!(validate("ZORBLAX QUINTAINE").rejection_reason(), Some(RejectionReason::NotInReference));
    }

    #[test]
    fn test_lowercase_rejected() {
        assert_eq!(validate("andrew riley").rejection_reason(), Some(RejectionReason::NotCapitalized));
    }

    #[test]
    fn test_partial_reference_scores_low() {
        // * One unknown token and no first/last structure
        assert_eq!(validate("Quintaine Andrew").rejection_reason(), Some(RejectionReason::LowScore));
    }

    #[test]
    fn test_nickname_and_surname_casing_after_acceptance() {
        match validate("Jim Mcmanus") {
            Verdict::Accepted(name) => {
                assert_eq!(name.normalized, "James McManus");
                assert_eq!(name.candidate.text, "Jim Mcmanus");
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_initial_with_surname() {
        match validate("J. McManus") {
            Verdict::Accepted(name) => assert_eq!(name.normalized, "J McManus"),
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_canonical_case() {
        assert_eq!(canonical_case("MCMANUS"), "McManus");
        assert_eq!(canonical_case("o’brien"), "O'Brien");
        assert_eq!(canonical_case("smith-jones"), "Smith-Jones");
        assert_eq!(canonical_case("mc"), "Mc");
    }

    #[test]
    fn test_registry_name_reordered() {
        let lexicon = Lexicon::builtin();
        assert_eq!(normalize_registry_name("RILEY, Andrew James", &lexicon), "Andrew James Riley");
        assert_eq!(normalize_registry_name("SARAH JONES", &lexicon), "Sarah Jones");
    }
}
