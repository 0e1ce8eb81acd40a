// * Thin-content detection
// * Decides whether a plainly fetched page is an empty client-side shell that
// * is worth sending through the rendering fallback.

use scraper::{Html, Selector};
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

// * Below this many words a page is always thin
const MIN_WORDS: usize = 15;

// * Below this many words a page is thin when it also looks script-driven
const SCRIPTED_MIN_WORDS: usize = 60;

// * Text bytes per markup byte below which a page looks like a shell
const MIN_TEXT_RATIO: f64 = 0.02;

// * Precompiled selectors
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("Invalid body selector"));
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("Invalid script selector"));
static APP_ROOT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#root, #app, #__next, #__nuxt, [data-reactroot], [ng-app]").expect("Invalid app root selector")
});

// * Routing decision for a fetched page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoutingPath {
    Plain,
    Render,
}

// * Detailed density metrics for a page
#[derive(Debug, Clone)]
pub struct DensityMetrics {
    pub word_count: usize,
    pub script_count: usize,
    pub text_ratio: f64,
    pub has_app_root: bool,
    pub routing: RoutingPath,
}

impl DensityMetrics {
    // * Computes all density metrics from HTML
    pub fn compute(html: &str) -> Self {
        let document = Html::parse_document(html);

        let body_text: String = document
            .select(&BODY_SELECTOR)
            .flat_map(|el| el.text())
            .collect::<Vec<_>>()
            .join(" ");
        let word_count = body_text.unicode_words().count();
        let text_bytes: usize = body_text.split_whitespace().map(str::len).sum();
        let text_ratio = if html.is_empty() {
            0.0
        } else {
            text_bytes as f64 / html.len() as f64
        };
        let script_count = document.select(&SCRIPT_SELECTOR).count();
        let has_app_root = document.select(&APP_ROOT_SELECTOR).next().is_some();

        let scripted = has_app_root || (script_count > 0 && text_ratio < MIN_TEXT_RATIO);
        let routing = if word_count < MIN_WORDS || (scripted && word_count < SCRIPTED_MIN_WORDS) {
            RoutingPath::Render
        } else {
            RoutingPath::Plain
        };

        Self {
            word_count,
            script_count,
            text_ratio,
            has_app_root,
            routing,
        }
    }

    // * Quick routing decision without full metrics
    pub fn should_render(html: &str) -> bool {
        Self::compute(html).routing == RoutingPath::Render
    }
}

/// Thin-content check for any fetched body; only HTML can be rendered
pub fn is_thin(body: &str, content_type: Option<&str>) -> bool {
    let is_html = content_type.map_or_else(
        || body.trim_start().starts_with('<'),
        |ct| ct.to_lowercase().contains("html"),
    );
    is_html && DensityMetrics::should_render(body)
}
