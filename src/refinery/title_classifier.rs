// * Role/title classification from the context window around a name

use crate::persistence::schema::{SeniorityTier, TitledExecutive, ValidatedName, UNKNOWN_TITLE};
use crate::refinery::lexicon::Lexicon;

// * Confidence lost per token of distance between name and title
const DISTANCE_DECAY: f64 = 0.08;
const MIN_TITLE_CONFIDENCE: f64 = 0.3;

/// Where a title phrase was found relative to the name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    After,
    Before,
}

#[derive(Debug, Clone, PartialEq)]
struct TitleMatch {
    distance: usize,
    side: Side,
    rank: usize,
}

#[derive(Debug, Clone)]
pub struct TitleClassifier {
    max_distance: usize,
}

impl TitleClassifier {
    pub fn new(max_distance: usize) -> Self {
        Self { max_distance }
    }

    /// Closest ranked title phrase in the context window. Ties go to the phrase
    /// after the name, then to the higher-ranked phrase. No match gives
    /// "Unknown" at tier 3.
    pub fn classify(&self, name: ValidatedName, lexicon: &Lexicon) -> TitledExecutive {
        let before: Vec<String> = name.candidate.context.before.iter().map(|t| t.to_lowercase()).collect();
        let after: Vec<String> = name.candidate.context.after.iter().map(|t| t.to_lowercase()).collect();

        let mut best: Option<TitleMatch> = None;
        for (rank, phrase) in lexicon.title_phrases().iter().enumerate() {
            let words = phrase.tokens();
            let found = [
                find_after(&after, &words).map(|d| (d, Side::After)),
                find_before(&before, &words).map(|d| (d, Side::Before)),
            ];
            for (distance, side) in found.into_iter().flatten() {
                if distance > self.max_distance {
                    continue;
                }
                let candidate = TitleMatch { distance, side, rank };
                let better = best
                    .as_ref()
                    .map_or(true, |b| (distance, side, rank) < (b.distance, b.side, b.rank));
                if better {
                    best = Some(candidate);
                }
            }
        }

        match best {
            Some(m) => {
                let phrase = &lexicon.title_phrases()[m.rank];
                TitledExecutive {
                    name,
                    title: phrase.display.clone(),
                    tier: phrase.tier,
                    title_confidence: (1.0 - DISTANCE_DECAY * m.distance as f64).max(MIN_TITLE_CONFIDENCE),
                }
            }
            None => TitledExecutive {
                name,
                title: UNKNOWN_TITLE.to_string(),
                tier: SeniorityTier::Tier3,
                title_confidence: 0.0,
            },
        }
    }

    /// Maps a registry role ("director", "llp-designated-member") to a display
    /// title and tier
    pub fn classify_role(&self, role: &str, lexicon: &Lexicon) -> (String, SeniorityTier) {
        let words: Vec<String> = role
            .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        let matched = lexicon.title_phrases().iter().find(|phrase| {
            let tokens = phrase.tokens();
            !tokens.is_empty() && words.windows(tokens.len()).any(|w| w.iter().zip(&tokens).all(|(a, b)| a.as_str() == *b))
        });

        match matched {
            Some(phrase) => (phrase.display.clone(), phrase.tier),
            None if words.is_empty() => (UNKNOWN_TITLE.to_string(), SeniorityTier::Tier3),
            None => (
                words
                    .iter()
                    .map(|w| crate::refinery::name_validator::canonical_case(w))
                    .collect::<Vec<_>>()
                    .join(" "),
                SeniorityTier::Tier3,
            ),
        }
    }
}

/// Token distance of the phrase from the start of `after`
fn find_after(after: &[String], words: &[&str]) -> Option<usize> {
    if words.is_empty() || after.len() < words.len() {
        return None;
    }
    (0..=after.len() - words.len()).find(|&i| after[i..i + words.len()].iter().zip(words).all(|(a, b)| a.as_str() == *b))
}

/// Token distance of the phrase's last word from the end of `before`
fn find_before(before: &[String], words: &[&str]) -> Option<usize> {
    if words.is_empty() || before.len() < words.len() {
        return None;
    }
    (0..=before.len() - words.len())
        .rev()
        .find(|&i| before[i..i + words.len()].iter().zip(words).all(|(a, b)| a.as_str() == *b))
        .map(|i| before.len() - (i + words.len()))
}
