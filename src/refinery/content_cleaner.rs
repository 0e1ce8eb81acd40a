// * Page cleaning: HTML or plain text -> linear text with typed blocks
// * Blocks keep byte offsets into the linear text so extraction and contact
// * attribution can reason about structure (headings, list items, footers).

use crate::persistence::schema::{PageType, Span};
use crate::refinery::regex_extractor::canonical_profile_url;
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

// * Elements whose text never carries people or contact details
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "template", "iframe", "head", "nav", "select", "button",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "aside", "address", "blockquote",
    "figure", "figcaption", "form", "table", "tr", "td", "th", "ul", "ol", "li", "dl", "dt", "dd",
    "h1", "h2", "h3", "h4", "h5", "h6", "body", "html",
];

/// Structural role of a block of page text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading,
    ListItem,
    TableCell,
    Paragraph,
    Footer,
    /// One line of a plain-text page
    Line,
}

impl BlockKind {
    fn for_tag(tag: &str) -> Self {
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => BlockKind::Heading,
            "li" | "dt" | "dd" => BlockKind::ListItem,
            "td" | "th" => BlockKind::TableCell,
            "footer" => BlockKind::Footer,
            _ => BlockKind::Paragraph,
        }
    }

    /// Short standalone blocks where a name may appear on its own
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            BlockKind::Heading | BlockKind::ListItem | BlockKind::TableCell | BlockKind::Line
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub span: Span,
}

/// Cleaned page ready for extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub page_type: PageType,
    pub text: String,
    pub blocks: Vec<TextBlock>,
}

impl PageContent {
    pub fn block_text(&self, block: &TextBlock) -> &str {
        &self.text[block.span.start..block.span.end]
    }

    /// Block containing the given span, if any
    pub fn block_at(&self, span: &Span) -> Option<&TextBlock> {
        self.blocks.iter().find(|b| b.span.contains(span))
    }

    pub fn word_count(&self) -> usize {
        self.text.unicode_words().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Configuration for content cleaning
#[derive(Debug, Clone)]
pub struct CleanerConfig {
    /// Surface mailto:/tel:/profile hrefs into the text of their block
    pub surface_link_targets: bool,
    /// Drop cookie banners and similar consent boilerplate
    pub drop_boilerplate: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            surface_link_targets: true,
            drop_boilerplate: true,
        }
    }
}

/// Converts fetched documents into `PageContent`
pub struct ContentCleaner {
    config: CleanerConfig,
}

// * Accumulates block text during the DOM walk
struct Walker {
    text: String,
    blocks: Vec<TextBlock>,
    current: String,
    kinds: Vec<BlockKind>,
    footer_depth: usize,
    drop_boilerplate: bool,
}

impl Walker {
    fn new(drop_boilerplate: bool) -> Self {
        Self {
            text: String::new(),
            blocks: Vec::new(),
            current: String::new(),
            kinds: vec![BlockKind::Paragraph],
            footer_depth: 0,
            drop_boilerplate,
        }
    }

    fn push_text(&mut self, fragment: &str) {
        self.current.push_str(fragment);
    }

    fn flush(&mut self) {
        let collapsed = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        self.current.clear();
        if collapsed.is_empty() || (self.drop_boilerplate && is_boilerplate_text(&collapsed)) {
            return;
        }

        let kind = if self.footer_depth > 0 {
            BlockKind::Footer
        } else {
            self.kinds.last().copied().unwrap_or(BlockKind::Paragraph)
        };

        if !self.text.is_empty() {
            self.text.push('\n');
        }
        let start = self.text.len();
        self.text.push_str(&collapsed);
        self.blocks.push(TextBlock {
            kind,
            span: Span::new(start, self.text.len()),
        });
    }
}

impl ContentCleaner {
    /// Creates a new cleaner with default configuration
    pub fn new() -> Self {
        Self {
            config: CleanerConfig::default(),
        }
    }

    /// Creates a new cleaner with custom configuration
    pub fn with_config(config: CleanerConfig) -> Self {
        Self { config }
    }

    /// Cleans a fetched body, choosing HTML or plain-text handling
    pub fn clean(&self, url: &str, body: &str, content_type: Option<&str>) -> PageContent {
        let is_html = match content_type {
            Some(ct) if ct.contains("html") => true,
            Some(ct) if ct.starts_with("text/plain") => false,
            _ => looks_like_html(body),
        };

        if is_html {
            self.clean_html(url, body)
        } else {
            self.clean_text(url, body)
        }
    }

    /// Walks the DOM in document order, emitting one block per block-level element
    pub fn clean_html(&self, url: &str, html: &str) -> PageContent {
        let document = Html::parse_document(html);
        let mut walker = Walker::new(self.config.drop_boilerplate);

        self.walk(document.root_element(), &mut walker);
        walker.flush();

        PageContent {
            url: url.to_string(),
            page_type: PageType::from_url(url),
            text: walker.text,
            blocks: walker.blocks,
        }
    }

    /// Plain text: every non-empty line becomes a block, offsets preserved
    pub fn clean_text(&self, url: &str, text: &str) -> PageContent {
        let mut blocks = Vec::new();
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let trimmed_end = line.trim_end();
            let leading = trimmed_end.len() - trimmed_end.trim_start().len();
            if !trimmed_end.trim().is_empty() {
                blocks.push(TextBlock {
                    kind: BlockKind::Line,
                    span: Span::new(offset + leading, offset + trimmed_end.len()),
                });
            }
            offset += line.len();
        }

        PageContent {
            url: url.to_string(),
            page_type: PageType::from_url(url),
            text: text.to_string(),
            blocks,
        }
    }

    fn walk(&self, element: ElementRef<'_>, walker: &mut Walker) {
        let tag = element.value().name();
        if SKIPPED_TAGS.contains(&tag) {
            return;
        }

        let is_block = BLOCK_TAGS.contains(&tag);
        if is_block {
            walker.flush();
            walker.kinds.push(BlockKind::for_tag(tag));
        }
        if tag == "footer" {
            walker.footer_depth += 1;
        }

        for child in element.children() {
            match child.value() {
                Node::Text(text) => walker.push_text(text),
                Node::Element(child_element) if child_element.name() == "br" => walker.flush(),
                Node::Element(_) => {
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        self.walk(child_ref, walker);
                    }
                }
                _ => {}
            }
        }

        if tag == "a" && self.config.surface_link_targets {
            if let Some(target) = element.value().attr("href").and_then(link_target) {
                if !walker.current.to_lowercase().contains(&target.to_lowercase()) {
                    walker.push_text(" ");
                    walker.push_text(&target);
                    walker.push_text(" ");
                }
            }
        }

        if tag == "footer" {
            walker.footer_depth = walker.footer_depth.saturating_sub(1);
        }
        if is_block {
            walker.flush();
            walker.kinds.pop();
        }
    }
}

impl Default for ContentCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Contact value carried by an href, if it is one we surface
fn link_target(href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_lowercase();
    if let Some(rest) = lower.strip_prefix("mailto:") {
        let address = rest.split('?').next().unwrap_or("").trim();
        return (!address.is_empty()).then(|| address.to_string());
    }
    if lower.starts_with("tel:") {
        let number = href[4..].trim();
        return (!number.is_empty()).then(|| number.to_string());
    }
    if lower.contains("linkedin.com/in/") {
        return Some(canonical_profile_url(href));
    }
    None
}

fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start();
    let lower: String = head.chars().take(512).collect::<String>().to_lowercase();
    lower.starts_with("<!doctype") || lower.starts_with("<html") || lower.contains("<body") || lower.contains("</p>")
}

/// Checks if text looks like consent or legal boilerplate
fn is_boilerplate_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    [
        "we use cookies",
        "cookie policy",
        "accept all cookies",
        "cookie settings",
        "this website uses cookies",
    ]
    .iter()
    .any(|pattern| lower.contains(pattern))
}

/// Utility function for quick cleaning with defaults
pub fn clean_page(url: &str, body: &str, content_type: Option<&str>) -> PageContent {
    ContentCleaner::new().clean(url, body, content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_page_blocks() {
        let html = r#"
            <html>
            <head><title>Our Team</title><script>var x = "Script Name";</script></head>
            <body>
                <nav><a href="/">Home</a><a href="/about">About</a></nav>
                <h2>Andrew Riley</h2>
                <p>Managing Director</p>
                <ul><li>Sarah Jones - Office Manager</li></ul>
                <footer>Kind regards<br>Andrew Riley<br>01214397129</footer>
            </body>
            </html>
        "#;

        let page = clean_page("https://andrewrileyheating.co.uk/our-team", html, Some("text/html"));

        assert_eq!(page.page_type, PageType::Team);
        assert!(!page.text.contains("Script Name"));
        assert!(!page.text.contains("Home"));

        let kinds: Vec<(BlockKind, &str)> = page.blocks.iter().map(|b| (b.kind, page.block_text(b))).collect();
        assert_eq!(kinds[0], (BlockKind::Heading, "Andrew Riley"));
        assert_eq!(kinds[1], (BlockKind::Paragraph, "Managing Director"));
        assert_eq!(kinds[2], (BlockKind::ListItem, "Sarah Jones - Office Manager"));
        assert!(kinds[3..].iter().all(|(kind, _)| *kind == BlockKind::Footer));
        assert_eq!(kinds[4].1, "Andrew Riley");
    }

    #[test]
    fn test_mailto_and_profile_hrefs_surfaced() {
        let html = r#"
            <html><body>
                <p>Andrew Riley <a href="mailto:andrew@andrewrileyheating.co.uk?subject=Hi">Email me</a></p>
                <p>Sarah Jones <a href="https://www.linkedin.com/in/sarah-jones-99/">LinkedIn</a></p>
                <p><a href="mailto:info@andrewrileyheating.co.uk">info@andrewrileyheating.co.uk</a></p>
            </body></html>
        "#;

        let page = clean_page("https://andrewrileyheating.co.uk/contact", html, None);

        assert!(page.text.contains("Email me andrew@andrewrileyheating.co.uk"));
        assert!(page.text.contains("https://www.linkedin.com/in/sarah-jones-99"));
        // * Already visible: not duplicated
        assert_eq!(page.text.matches("info@andrewrileyheating.co.uk").count(), 1);
    }

    #[test]
    fn test_plain_text_lines_keep_offsets() {
        let text = "Meet the team\n\n  Andrew Riley  \nManaging Director\n";
        let page = clean_page("https://example.co.uk/about", text, Some("text/plain"));

        assert_eq!(page.text, text);
        assert_eq!(page.blocks.len(), 3);
        assert_eq!(page.block_text(&page.blocks[1]), "Andrew Riley");
        assert_eq!(page.blocks[1].kind, BlockKind::Line);
    }

    #[test]
    fn test_cookie_banner_dropped() {
        let html = "<html><body><div>We use cookies to improve your experience.</div><p>Andrew Riley</p></body></html>";
        let page = clean_page("https://example.co.uk/", html, None);

        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.text, "Andrew Riley");
    }

    #[test]
    fn test_block_lookup() {
        let page = clean_page("https://example.co.uk/", "First line\nSecond line", None);
        let block = page.block_at(&Span::new(11, 17)).unwrap();
        assert_eq!(page.block_text(block), "Second line");
        assert_eq!(page.word_count(), 4);
    }
}
