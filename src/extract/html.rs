//! URL/HTML extraction via `reqwest` + `scraper`: fetch, select the most
//! plausible main-content element, strip boilerplate tags, collapse
//! whitespace.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::Extracted;
use crate::error::ExtractError;

const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; corpus-chat/0.1; +https://example.invalid/bot)";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const CONTENT_SELECTORS: &[&str] = &["main", "article", ".content", "#content", ".post", ".entry"];
const STRIP_SELECTORS: &[&str] = &["script", "style", "nav", "footer", "header", "aside"];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "li", "tr", "table", "blockquote", "pre", "ul", "ol", "br",
    "h1", "h2", "h3", "h4", "h5", "h6",
];

pub async fn extract_url(url: &str) -> Result<Extracted, ExtractError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| ExtractError::FetchFailed(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ExtractError::FetchFailed(e.to_string()))?
        .error_for_status()
        .map_err(|e| ExtractError::FetchFailed(e.to_string()))?;

    let body = response
        .text()
        .await
        .map_err(|e| ExtractError::FetchFailed(e.to_string()))?;

    let (text, title) = extract_main_content(&body, url);
    Ok(Extracted {
        text,
        content_type: "webpage".to_string(),
        title: Some(title),
    })
}

fn extract_main_content(html: &str, url: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title = document
        .select(&Selector::parse("title").unwrap())
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| url.to_string());

    let mut main_text: Option<String> = None;
    for selector_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(el) = document.select(&selector).next() {
                let text = collect_stripped_text(&el);
                if !text.trim().is_empty() {
                    main_text = Some(text);
                    break;
                }
            }
        }
    }

    let raw_text = main_text.unwrap_or_else(|| {
        let body_selector = Selector::parse("body").unwrap();
        document
            .select(&body_selector)
            .next()
            .map(|el| collect_stripped_text(&el))
            .unwrap_or_default()
    });

    (collapse_whitespace(&raw_text), title)
}

/// Collect an element's text, skipping stripped tags (`script`, `style`,
/// `nav`, `footer`, `header`, `aside`) and their descendants entirely, and
/// emitting a newline after each block-level element so paragraph breaks
/// survive into [`collapse_whitespace`].
fn collect_stripped_text(element: &ElementRef) -> String {
    let strip_names: std::collections::HashSet<&str> = STRIP_SELECTORS.iter().copied().collect();
    let mut out = String::new();
    collect_into(*element, &strip_names, &mut out);
    out
}

fn collect_into(node: ElementRef, strip_names: &std::collections::HashSet<&str>, out: &mut String) {
    for child in node.children() {
        if let Some(el) = child.value().as_element() {
            if strip_names.contains(el.name()) {
                continue;
            }
            if let Some(child_ref) = ElementRef::wrap(child) {
                collect_into(child_ref, strip_names, out);
            }
            if BLOCK_TAGS.contains(&el.name()) {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

fn blank_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]*\n[ \t\n]*\n[ \t]*").unwrap())
}

/// Collapse runs of horizontal whitespace to a single space within a line,
/// and runs of 2+ newlines to a single newline, so paragraph breaks
/// survive as single `\n`s while blank-line noise is squeezed out.
fn collapse_whitespace(text: &str) -> String {
    let merged = blank_line_re().replace_all(text, "\n");
    merged
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
