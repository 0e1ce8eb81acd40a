// * Name-candidate extraction
// * A fixed list of pure strategies runs over the same page; every strategy
// * tags its candidates with the PatternId that produced them.

use crate::persistence::schema::{Candidate, ContactKind, ContextWindow, PatternId, Span};
use crate::refinery::content_cleaner::{BlockKind, PageContent};
use crate::refinery::lexicon::Lexicon;
use crate::refinery::regex_extractor::ContactMention;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}[\p{L}\p{M}'’\-]*|\d+").expect("Invalid word regex"));

// * Separators between a name and a trailing role in a structural block
static ROLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s[-–—]\s|[–—|,:(/]").expect("Invalid separator regex"));

/// A word with its byte span in the page text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub span: Span,
}

impl Token<'_> {
    /// Single letter, e.g. the "J" of "J. McManus"
    pub fn is_initial(&self) -> bool {
        self.text.chars().count() == 1 && self.text.chars().all(|c| c.is_uppercase())
    }

    pub fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(|c| c.is_uppercase())
    }
}

/// Splits text into word tokens
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    WORD.find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            span: Span::new(m.start(), m.end()),
        })
        .collect()
}

/// Inputs shared by every strategy
pub struct ExtractionInput<'a> {
    pub page: &'a PageContent,
    pub tokens: &'a [Token<'a>],
    pub contacts: &'a [ContactMention],
    pub lexicon: &'a Lexicon,
    pub context_tokens: usize,
    pub completion_radius: usize,
}

impl ExtractionInput<'_> {
    /// Context window around tokens[first..=last]
    fn context(&self, first: usize, last: usize) -> ContextWindow {
        let before_start = first.saturating_sub(self.context_tokens);
        let after_end = (last + 1 + self.context_tokens).min(self.tokens.len());
        ContextWindow {
            before: self.tokens[before_start..first].iter().map(|t| t.text.to_string()).collect(),
            after: self.tokens[last + 1..after_end].iter().map(|t| t.text.to_string()).collect(),
        }
    }

    fn candidate(&self, text: String, first: usize, last: usize, pattern: PatternId) -> Candidate {
        Candidate {
            text,
            span: Span::new(self.tokens[first].span.start, self.tokens[last].span.end),
            context: self.context(first, last),
            source_url: self.page.url.clone(),
            page_type: self.page.page_type,
            pattern,
        }
    }

    fn slice(&self, first: usize, last: usize) -> &str {
        &self.page.text[self.tokens[first].span.start..self.tokens[last].span.end]
    }

    /// True when tokens[i] and tokens[i + 1] sit in the same name run:
    /// only spaces between them, or ". " after an initial
    fn joinable(&self, i: usize) -> bool {
        let Some(next) = self.tokens.get(i + 1) else {
            return false;
        };
        let current = &self.tokens[i];
        let gap = &self.page.text[current.span.end..next.span.start];
        if gap.is_empty() || gap.contains('\n') {
            return false;
        }
        let gap = if current.is_initial() { gap.trim_start_matches('.') } else { gap };
        !gap.is_empty() && gap.chars().all(|c| c == ' ' || c == '\t' || c == '\u{a0}')
    }

    fn is_word(&self, i: usize) -> bool {
        self.tokens[i].text.chars().next().is_some_and(|c| c.is_alphabetic())
    }
}

type Strategy = fn(&ExtractionInput<'_>) -> Vec<Candidate>;

/// Strategies run side by side over every page
pub const STRATEGIES: &[(PatternId, Strategy)] = &[
    (PatternId::CapitalizedSequence, capitalized_sequences),
    (PatternId::Prefixed, prefixed_names),
    (PatternId::Structural, structural_entries),
    (PatternId::EmailCompletion, email_completions),
];

/// Maximal runs of joinable capitalized tokens, as (first, last) index pairs
fn capitalized_runs(input: &ExtractionInput<'_>) -> Vec<(usize, usize)> {
    let tokens = input.tokens;
    let mut runs = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if !(input.is_word(i) && tokens[i].is_capitalized()) {
            i += 1;
            continue;
        }
        let start = i;
        while input.joinable(i) && input.is_word(i + 1) && tokens[i + 1].is_capitalized() {
            i += 1;
        }
        runs.push((start, i));
        i += 1;
    }
    runs
}

/// (a) "Firstname Lastname" / "Firstname Middle Lastname" windows of capitalized runs
pub fn capitalized_sequences(input: &ExtractionInput<'_>) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (start, end) in capitalized_runs(input) {
        for width in [2, 3] {
            if end + 1 < start + width {
                continue;
            }
            for first in start..=(end + 1 - width) {
                let last = first + width - 1;
                // * A run may not end on an initial ("Andrew J.")
                if input.tokens[last].is_initial() {
                    continue;
                }
                out.push(input.candidate(
                    input.slice(first, last).to_string(),
                    first,
                    last,
                    PatternId::CapitalizedSequence,
                ));
            }
        }
    }
    out
}

/// (b) "Mr. John Smith", "Dr Sarah Jones": honorific followed by 2-3 name tokens
pub fn prefixed_names(input: &ExtractionInput<'_>) -> Vec<Candidate> {
    let tokens = input.tokens;
    let mut out = Vec::new();
    for i in 0..tokens.len() {
        if !input.lexicon.is_honorific(tokens[i].text) || !tokens[i].is_capitalized() {
            continue;
        }
        let gap = &input.page.text[tokens[i].span.end..tokens.get(i + 1).map_or(tokens[i].span.end, |t| t.span.start)];
        if gap.contains('\n') || !gap.trim_start_matches('.').chars().all(char::is_whitespace) {
            continue;
        }

        let first = i + 1;
        let mut last = first;
        if first >= tokens.len() || !tokens[first].is_capitalized() {
            continue;
        }
        while last + 1 - first < 3 && input.joinable(last) && tokens[last + 1].is_capitalized() {
            last += 1;
        }
        if last > first && !tokens[last].is_initial() {
            out.push(input.candidate(input.slice(first, last).to_string(), first, last, PatternId::Prefixed));
        }
    }
    out
}

/// (c) Names standing alone as headings or list entries on team/about pages,
/// optionally followed by a role ("Andrew Riley - Managing Director")
pub fn structural_entries(input: &ExtractionInput<'_>) -> Vec<Candidate> {
    if !input.page.page_type.is_people_page() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for block in &input.page.blocks {
        if !(block.kind.is_structural() || block.kind == BlockKind::Paragraph) {
            continue;
        }
        let block_text = input.page.block_text(block);
        let segment_len = ROLE_SEPARATOR.find(block_text).map_or(block_text.len(), |m| m.start());
        let segment = Span::new(block.span.start, block.span.start + segment_len);

        let indices: Vec<usize> = input
            .tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| segment.contains(&t.span))
            .map(|(i, _)| i)
            .collect();
        let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
            continue;
        };

        // * Skip a leading honorific; prefixed_names covers it
        let first = if input.lexicon.is_honorific(input.tokens[first].text) { first + 1 } else { first };
        if first > last {
            continue;
        }
        let count = last + 1 - first;
        let all_capitalized = (first..=last).all(|i| input.is_word(i) && input.tokens[i].is_capitalized());
        if !(2..=4).contains(&count) || !all_capitalized || input.tokens[last].is_initial() {
            continue;
        }
        out.push(input.candidate(input.slice(first, last).to_string(), first, last, PatternId::Structural));
    }
    out
}

/// (d) A lone first name near an email whose local part supplies the surname:
/// "James" near "j.mcmanus@..." becomes "James Mcmanus"
pub fn email_completions(input: &ExtractionInput<'_>) -> Vec<Candidate> {
    let tokens = input.tokens;
    let emails: Vec<&ContactMention> = input.contacts.iter().filter(|c| c.kind == ContactKind::Email).collect();
    if emails.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for i in 0..tokens.len() {
        let token = &tokens[i];
        if !(input.is_word(i) && token.is_capitalized() && input.lexicon.is_first_name(token.text)) {
            continue;
        }
        let joined_before = i > 0 && input.joinable(i - 1) && tokens[i - 1].is_capitalized();
        let joined_after = input.joinable(i) && tokens[i + 1].is_capitalized();
        if joined_before || joined_after {
            continue;
        }

        let nearest = emails
            .iter()
            .filter(|e| e.span.distance_to(&token.span) <= input.completion_radius)
            .filter_map(|e| surname_from_local_part(token.text, &e.value, input.lexicon).map(|s| (e, s)))
            .min_by_key(|(e, _)| e.span.distance_to(&token.span));

        if let Some((_, surname)) = nearest {
            out.push(input.candidate(
                format!("{} {}", token.text, capitalize(&surname)),
                i,
                i,
                PatternId::EmailCompletion,
            ));
        }
    }
    out
}

/// Surname fragment of an email local part matching the given first name:
/// "j.mcmanus", "james.mcmanus", "jamesmcmanus" and "jmcmanus" all yield "mcmanus"
pub fn surname_from_local_part(first_name: &str, email: &str, lexicon: &Lexicon) -> Option<String> {
    let local = email.split('@').next()?.to_lowercase();
    let first = first_name.to_lowercase();
    let expanded = lexicon.expand_nickname(&first).map(str::to_string);
    let initial = first.chars().next()?;

    let parts: Vec<&str> = local.split(['.', '_', '-']).filter(|p| !p.is_empty()).collect();
    let surname = match parts.as_slice() {
        [head, tail] => {
            let head_matches = *head == first
                || expanded.as_deref() == Some(*head)
                || (head.chars().count() == 1 && head.starts_with(initial));
            head_matches.then(|| tail.to_string())
        }
        [single] => {
            if let Some(rest) = single.strip_prefix(first.as_str()).filter(|r| r.len() >= 2) {
                Some(rest.to_string())
            } else {
                single
                    .strip_prefix(initial)
                    .filter(|rest| rest.len() >= 3 && lexicon.is_surname(rest))
                    .map(str::to_string)
            }
        }
        _ => None,
    }?;

    let plausible = surname.chars().all(|c| c.is_alphabetic() || c == '\'')
        && surname != first
        && !lexicon.is_service_term(&surname);
    plausible.then_some(surname)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Runs every strategy over a page
pub struct NameExtractor {
    context_tokens: usize,
    completion_radius: usize,
}

impl NameExtractor {
    pub fn new(context_tokens: usize, completion_radius: usize) -> Self {
        Self {
            context_tokens,
            completion_radius,
        }
    }

    /// Candidates from all strategies; identical (text, span, pattern) triples collapse.
    /// An empty page yields no candidates.
    pub fn extract(&self, page: &PageContent, contacts: &[ContactMention], lexicon: &Lexicon) -> Vec<Candidate> {
        if page.is_empty() {
            return Vec::new();
        }

        let tokens = tokenize(&page.text);
        let input = ExtractionInput {
            page,
            tokens: &tokens,
            contacts,
            lexicon,
            context_tokens: self.context_tokens,
            completion_radius: self.completion_radius,
        };

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for (_, strategy) in STRATEGIES {
            for candidate in strategy(&input) {
                if seen.insert((candidate.text.clone(), candidate.span, candidate.pattern)) {
                    candidates.push(candidate);
                }
            }
        }
        candidates.sort_by_key(|c| (c.span.start, c.span.end, c.pattern));
        candidates
    }
}
