use crate::persistence::schema::PageType;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("Invalid link selector"));

// * Paths tried when the home page links to no people pages
const CONVENTIONAL_PATHS: &[&str] = &["/about", "/about-us", "/team", "/contact"];

// * Anchor words that mark a link as a people page even when the path does not
const PEOPLE_ANCHORS: &[(&str, PageType)] = &[
    ("meet the team", PageType::Team),
    ("our team", PageType::Team),
    ("our people", PageType::Team),
    ("leadership", PageType::Team),
    ("management", PageType::Team),
    ("who we are", PageType::About),
    ("about", PageType::About),
    ("contact", PageType::Contact),
];

// * Normalizes a URL to ensure a unique, deterministic representation.
// *
// * Logic:
// * 1. Join href with base_url.
// * 2. Strip Fragment (#).
// * 3. Lowercase Hostname.
// * 4. Remove Tracking Parameters (utm_*, gclid, etc.).
// * 5. Sort Query Parameters alphabetically.
pub fn normalize_url(href: &str, base_url: &str) -> Option<String> {
    // * Step 1: Parse Base and Join
    let base = Url::parse(base_url).ok()?;
    let mut url = base.join(href).ok()?;

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    // * Step 2: Strip Fragment
    url.set_fragment(None);

    // * Step 3: Lowercase Hostname
    if let Some(host) = url.host_str() {
        let lower_host = host.to_lowercase();
        if url.set_host(Some(&lower_host)).is_err() {
            return None;
        }
    }

    // * Step 4 & 5: Filter and Sort Query Params
    let mut clean_pairs = BTreeMap::new();

    // ! CRITICAL: Add new tracking params here as they are discovered.
    let drop_params: HashSet<&str> = [
        "utm_source", "utm_medium", "utm_campaign", "utm_term", "utm_content",
        "gclid", "fbclid", "ref", "yclid", "_ga",
    ]
    .into();

    for (k, v) in url.query_pairs() {
        if !drop_params.contains(k.to_lowercase().as_str()) {
            clean_pairs.insert(k.into_owned(), v.into_owned());
        }
    }

    if clean_pairs.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url.query_pairs_mut();
        serializer.clear();
        for (k, v) in clean_pairs {
            serializer.append_pair(&k, &v);
        }
    }

    Some(url.to_string())
}

/// Host without a leading "www.", lowercased
pub fn company_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.trim_start_matches("www.").to_string())
}

fn same_site(a: &str, b: &str) -> bool {
    matches!((company_domain(a), company_domain(b)), (Some(x), Some(y)) if x == y)
}

fn is_root(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| u.path() == "/" && u.query().is_none())
}

/// Links from a home page to its about/team/contact pages: same site only,
/// normalized, people pages first, at most `max` of them
pub fn discover_subpages(html: &str, base_url: &str, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = normalize_url(base_url, base_url);

    let mut seen = HashSet::new();
    let mut found: Vec<(PageType, usize, String)> = Vec::new();
    for (position, link) in document.select(&LINK_SELECTOR).enumerate() {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(url) = normalize_url(href, base_url) else {
            continue;
        };
        if !same_site(&url, base_url) || is_root(&url) || Some(&url) == base.as_ref() {
            continue;
        }

        let anchor = link.text().collect::<Vec<_>>().join(" ").to_lowercase();
        let page_type = match PageType::from_url(&url) {
            PageType::Home | PageType::Unknown => PEOPLE_ANCHORS
                .iter()
                .find(|(word, _)| anchor.contains(word))
                .map(|(_, kind)| *kind),
            kind => Some(kind),
        };

        if let Some(kind) = page_type {
            if seen.insert(url.clone()) {
                found.push((kind, position, url));
            }
        }
    }

    found.sort_by_key(|(kind, position, _)| (subpage_priority(*kind), *position));
    found.into_iter().take(max).map(|(_, _, url)| url).collect()
}

fn subpage_priority(kind: PageType) -> u8 {
    match kind {
        PageType::Team => 0,
        PageType::About => 1,
        PageType::Contact => 2,
        PageType::Home | PageType::Unknown => 3,
    }
}

/// Conventional people-page URLs for a site that links none
pub fn conventional_subpages(base_url: &str, max: usize) -> Vec<String> {
    CONVENTIONAL_PATHS
        .iter()
        .filter_map(|path| normalize_url(path, base_url))
        .take(max)
        .collect()
}
