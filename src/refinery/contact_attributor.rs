// * Contact attribution
// * Links each contact mention on a page to at most one validated name.
// * Methods are tried in trust order: direct pattern, signature block, proximity.

use crate::config::AttributionConfig;
use crate::persistence::schema::{
    merge_key, AttributedContact, AttributionMethod, ContactBundle, ContactKind, Span, ValidatedName,
};
use crate::refinery::content_cleaner::{BlockKind, PageContent};
use crate::refinery::lexicon::Lexicon;
use crate::refinery::name_extractor::tokenize;
use crate::refinery::regex_extractor::ContactMention;
use std::collections::BTreeSet;

// * Characters allowed between a name and its contact in a direct pattern
const DIRECT_GAP_PUNCTUATION: &[char] = &[':', ',', '-', '–', '—', '|', '(', ')', '.', '/', ';'];

// * How far back from a name to look for a sign-off line
const SIGN_OFF_LOOKBACK: usize = 60;

/// Contacts attributed per name (index-aligned with the input names) plus
/// the mentions nobody could claim
#[derive(Debug, Clone, Default)]
pub struct AttributionOutcome {
    pub bundles: Vec<ContactBundle>,
    pub unattributed: Vec<ContactMention>,
}

#[derive(Debug, Clone)]
pub struct ContactAttributor {
    config: AttributionConfig,
}

impl ContactAttributor {
    pub fn new(config: AttributionConfig) -> Self {
        Self { config }
    }

    pub fn attribute(
        &self,
        page: &PageContent,
        names: &[ValidatedName],
        contacts: &[ContactMention],
        lexicon: &Lexicon,
    ) -> AttributionOutcome {
        let mut outcome = AttributionOutcome {
            bundles: vec![ContactBundle::default(); names.len()],
            unattributed: Vec::new(),
        };

        for mention in contacts {
            let claim = self
                .direct_owner(page, names, contacts, mention, lexicon)
                .map(|i| (i, AttributionMethod::Direct, self.config.direct_confidence))
                .or_else(|| {
                    self.signature_owner(page, names, mention, lexicon)
                        .map(|i| (i, AttributionMethod::Signature, self.config.signature_confidence))
                })
                .or_else(|| {
                    self.proximity_owner(names, mention)
                        .map(|(i, confidence)| (i, AttributionMethod::Proximity, confidence))
                });

            let Some((owner, method, base)) = claim else {
                outcome.unattributed.push(mention.clone());
                continue;
            };

            let mut confidence = base;
            if mention.kind == ContactKind::Email && local_part_matches(&mention.value, &names[owner]) {
                confidence += self.config.local_part_bonus;
            }
            let confidence = confidence.min(1.0);

            if confidence < self.config.min_confidence {
                tracing::debug!(contact = %mention.value, confidence, "Attribution below minimum, discarded");
                outcome.unattributed.push(mention.clone());
                continue;
            }

            tracing::debug!(
                contact = %mention.value,
                name = %names[owner].normalized,
                method = method.as_str(),
                confidence,
                "Contact attributed"
            );
            outcome.bundles[owner].offer(
                mention.kind,
                AttributedContact {
                    value: mention.value.clone(),
                    method,
                    confidence,
                    source_url: page.url.clone(),
                },
            );
        }

        outcome
    }

    /// "Name: contact", "Name, contact", "Name - email: contact" on one line
    fn direct_owner(
        &self,
        page: &PageContent,
        names: &[ValidatedName],
        contacts: &[ContactMention],
        mention: &ContactMention,
        lexicon: &Lexicon,
    ) -> Option<usize> {
        let (index, name) = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.candidate.span.end <= mention.span.start)
            .max_by_key(|(_, n)| n.candidate.span.end)?;

        let gap_span = Span::new(name.candidate.span.end, mention.span.start);
        if gap_span.len() > self.config.direct_gap_max {
            return None;
        }
        if contacts.iter().any(|c| c.span != mention.span && gap_span.contains(&c.span)) {
            return None;
        }

        let gap = &page.text[gap_span.start..gap_span.end];
        if gap.contains('\n') {
            return None;
        }
        let words = tokenize(gap);
        if !words.iter().all(|w| lexicon.is_contact_label(w.text)) {
            return None;
        }
        let leftover_ok = gap
            .char_indices()
            .filter(|(i, _)| !words.iter().any(|w| w.span.start <= *i && *i < w.span.end))
            .all(|(_, c)| c.is_whitespace() || DIRECT_GAP_PUNCTUATION.contains(&c));

        leftover_ok.then_some(index)
    }

    /// Contacts shortly after a name that closes a letter or sits in a footer
    fn signature_owner(
        &self,
        page: &PageContent,
        names: &[ValidatedName],
        mention: &ContactMention,
        lexicon: &Lexicon,
    ) -> Option<usize> {
        let (index, name) = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.candidate.span.end <= mention.span.start)
            .max_by_key(|(_, n)| n.candidate.span.end)?;

        let span = name.candidate.span;
        if mention.span.start - span.end > self.config.signature_window {
            return None;
        }

        let in_footer = page.block_at(&span).is_some_and(|b| b.kind == BlockKind::Footer);
        let mut lookback_start = span.start.saturating_sub(SIGN_OFF_LOOKBACK);
        while !page.text.is_char_boundary(lookback_start) {
            lookback_start += 1;
        }
        let preceding = &page.text[lookback_start..span.start];
        let signed_off = lexicon.ends_with_sign_off(preceding);

        (in_footer || signed_off).then_some(index)
    }

    /// Nearest name within the radius, only when a single person is in range.
    /// Confidence falls linearly from near to far across the radius.
    fn proximity_owner(&self, names: &[ValidatedName], mention: &ContactMention) -> Option<(usize, f64)> {
        let radius = self.config.proximity_radius;
        let in_range: Vec<(usize, usize)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (i, n.candidate.span.distance_to(&mention.span)))
            .filter(|(_, d)| *d <= radius)
            .collect();

        let people: BTreeSet<String> = in_range.iter().map(|(i, _)| merge_key(&names[*i].normalized)).collect();
        if people.len() != 1 {
            return None;
        }

        let (index, distance) = in_range.into_iter().min_by_key(|(i, d)| (*d, *i))?;
        let near = self.config.proximity_confidence_near;
        let far = self.config.proximity_confidence_far;
        let fraction = if radius == 0 { 0.0 } else { distance as f64 / radius as f64 };
        Some((index, near - (near - far) * fraction))
    }
}

/// Email local part shares a token with the name ("jsmith", "john.smith" vs "John Smith")
pub fn local_part_matches(email: &str, name: &ValidatedName) -> bool {
    let Some(local) = email.split('@').next().map(str::to_lowercase) else {
        return false;
    };
    let tokens: Vec<String> = name.tokens().iter().map(|t| t.to_lowercase()).collect();
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return false;
    };

    let parts: Vec<&str> = local.split(['.', '_', '-', '+']).filter(|p| !p.is_empty()).collect();
    if parts.iter().any(|p| p.len() >= 2 && tokens.iter().any(|t| t == p)) {
        return true;
    }

    let initial = first.chars().next().map(String::from).unwrap_or_default();
    let compact = local.replace(['.', '_', '-'], "");
    tokens.len() > 1
        && (compact == format!("{}{}", initial, last)
            || compact == format!("{}{}", first, last)
            || compact == format!("{}{}", last, initial))
}
