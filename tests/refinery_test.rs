use prospect_flow::config::PipelineConfig;
use prospect_flow::persistence::dedup::ExecutiveMerger;
use prospect_flow::persistence::schema::{
    Candidate, ContextWindow, PageType, PatternId, RejectionReason, Span, UNKNOWN_TITLE,
};
use prospect_flow::refinery::{contact_key, CompanyContext, Lexicon, NameValidator, Refinery, Verdict};
use std::sync::Arc;

// * Test Suite for the per-page refinery

fn refinery() -> Refinery {
    Refinery::new(Arc::new(Lexicon::builtin()), &PipelineConfig::default())
}

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

fn capitalized(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[test]
fn test_exclusion_terms_always_rejected() {
    let validator = NameValidator::new(0.0);
    let lexicon = Lexicon::builtin();

    let terms: Vec<String> = lexicon
        .service_terms()
        .map(|term| format!("Andrew {}", capitalized(term)))
        .chain(lexicon.service_phrases().map(capitalized))
        .collect();
    assert!(terms.len() > 100);

    for text in terms {
        let verdict = validator.validate(candidate(&text), &lexicon);
        assert_eq!(verdict.rejection_reason(), Some(RejectionReason::ServiceTerm), "{}", text);
    }
}

#[test]
fn test_fixture_lexicon_replaces_reference_lists() {
    let lexicon = Lexicon::from_lists(&["andrew"], &["riley"], &["plumbing"]);
    let validator = NameValidator::new(0.55);

    assert!(validator.validate(candidate("Andrew Riley"), &lexicon).is_accepted());
    assert_eq!(
        validator.validate(candidate("Sarah Jones"), &lexicon).rejection_reason(),
        Some(RejectionReason::NotInReference)
    );
    assert_eq!(
        validator.validate(candidate("Andrew Plumbing"), &lexicon).rejection_reason(),
        Some(RejectionReason::ServiceTerm)
    );
}

#[test]
fn test_unknown_tokens_rejected_whatever_the_casing() {
    let validator = NameValidator::new(0.0);
    let lexicon = Lexicon::builtin();
    for text in ["Zorblax Quentrel", "ZORBLAX QUENTREL"] {
        let verdict = validator.validate(candidate(text), &lexicon);
        assert!(!verdict.is_accepted(), "{}", text);
    }
}

#[test]
fn test_accepted_names_are_normalized() {
    match NameValidator::new(0.55).validate(candidate("Bob O'brien"), &Lexicon::builtin()) {
        Verdict::Accepted(name) => {
            assert_eq!(name.normalized, "Robert O'Brien");
            assert!(name.validity >= 0.55);
        }
        other => panic!("expected acceptance, got {:?}", other),
    }
}

#[test]
fn test_every_attributed_contact_was_on_the_page() {
    let html = r#"
    <html><body>
        <h1>Meet the team</h1>
        <ul>
            <li>Andrew Riley - Managing Director - andrew@andrewrileyheating.co.uk</li>
            <li>Sarah Jones - Office Manager - 0121 439 7129</li>
        </ul>
        <footer>Andrew Riley Heating Ltd, Unit 4, Harborne, Birmingham. info@andrewrileyheating.co.uk</footer>
    </body></html>
    "#;
    let company = CompanyContext::new("Andrew Riley Heating", Some("andrewrileyheating.co.uk".to_string()));
    let analysis = refinery().process("https://andrewrileyheating.co.uk/team", html, Some("text/html"), &company);

    assert!(!analysis.observations.is_empty());
    let on_page: Vec<String> = analysis
        .contacts
        .iter()
        .map(|m| contact_key(m.kind, &m.value))
        .collect();

    for observation in &analysis.observations {
        for (kind, contact) in observation.contacts.iter() {
            assert!(on_page.contains(&contact_key(kind, &contact.value)), "{} not on page", contact.value);
            assert!(contact.confidence > 0.0 && contact.confidence <= 1.0);
            assert_eq!(contact.source_url, "https://andrewrileyheating.co.uk/team");
        }
    }
}

#[test]
fn test_first_name_and_initial_merge_into_one_person() {
    let text = "\"Great job, James was brilliant.\"\nJ. McManus\nj.mcmanus@mcmanusplumbing.co.uk";
    let company = CompanyContext::new("McManus Plumbing", Some("mcmanusplumbing.co.uk".to_string()));
    let analysis = refinery().process("https://mcmanusplumbing.co.uk/", text, Some("text/plain"), &company);

    let names: Vec<&str> = analysis
        .observations
        .iter()
        .map(|o| o.executive.name.normalized.as_str())
        .collect();
    assert!(names.contains(&"James McManus"), "{:?}", names);

    let merged = ExecutiveMerger::new().merge(analysis.observations);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].canonical_name, "James McManus");
}

#[test]
fn test_name_without_title_is_kept_as_unknown() {
    let company = CompanyContext::new("Andrew Riley Heating", Some("andrewrileyheating.co.uk".to_string()));
    let analysis = refinery().process(
        "https://andrewrileyheating.co.uk/",
        "Contact: Andrew Riley, admin@andrewrileyheating.co.uk, 01214397129",
        Some("text/plain"),
        &company,
    );
    assert_eq!(analysis.observations.len(), 1);
    assert_eq!(analysis.observations[0].executive.title, UNKNOWN_TITLE);
}
