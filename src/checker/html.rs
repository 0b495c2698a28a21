// src/checker/html.rs
// =============================================================================
// This module extracts candidate links from the HTML body of a content record.
//
// We use the `scraper` crate which:
// - Parses HTML (fragments too) into a DOM
// - Supports CSS selectors for finding elements
// - Decodes HTML entities in attribute values (&amp; -> &)
//
// Only http/https links are kept. Relative paths (/wp-content/uploads/x.pdf)
// are resolved against the record's own URL first; mailto:, tel:,
// javascript: and same-page #anchors can't point at a document.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

// Extracts all href values from <a> tags in an HTML fragment
//
// Returns the links in document order, duplicates included; the scanner
// decides what to do with repeats.
//
// Example:
//   base = "https://docs.example.com/guides/"
//   body = "<a href=' https://example.com/a.pdf?x=1&amp;y=2 '>A</a><a href='/b.pdf'>B</a>"
//   result = ["https://example.com/a.pdf?x=1&y=2", "https://docs.example.com/b.pdf"]
pub fn extract_hrefs(body: &str, base: &Url) -> Vec<String> {
    let fragment = Html::parse_fragment(body);

    // The selector is a constant, so parsing can only fail on a typo here
    let selector = Selector::parse("a[href]").expect("valid anchor selector");

    fragment
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter_map(|href| resolve_href(base, href))
        .collect()
}

// Turns one href into a checkable absolute URL
//
// Absolute links are returned exactly as written, so the short-link cache
// and the export see the same string the author typed. Relative links are
// joined onto `base`.
//
// Examples (base = "https://docs.example.com/guides/intro/"):
//   "HTTPS://example.com/a.pdf" -> Some("HTTPS://example.com/a.pdf")
//   "/files/doc.pdf"            -> Some("https://docs.example.com/files/doc.pdf")
//   "../doc.pdf"                -> Some("https://docs.example.com/guides/doc.pdf")
//   "mailto:x@example.com"      -> None
//   "#top"                      -> None
fn resolve_href(base: &Url, href: &str) -> Option<String> {
    // Blank or same-page links point at no document
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match Url::parse(href) {
        // Has a scheme: keep it only if that scheme is http(s)
        Ok(url) => is_http(&url).then(|| href.to_string()),
        // No scheme: a relative path (or //host/path), join it with the base
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let joined = base.join(href).ok()?;
            is_http(&joined).then(|| joined.to_string())
        }
        // Anything else is not a URL we could request
        Err(_) => None,
    }
}

// The url crate lowercases schemes, so "HTTPS://" is fine too
fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
