// src/classifier.rs

//! Judges whether rendered slot content is real creative or loader noise.

use once_cell::sync::Lazy;
use regex::RegexSet;
use tracing::debug;

use crate::page::dom::{Document, NodeId};

static URL_ONLY: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)^https?://\S+$",
        r"(?i)^//\S+$",
        r"(?i)^cdn-fc\.com/creatives/universal/dynamic/\?\S+$",
        r"(?i)^distortedwin\.com/\S+$",
    ])
    .expect("url-only patterns")
});

/// Texts an ad loader leaves behind before (or instead of) rendering.
pub const LOADER_PLACEHOLDERS: [&str; 3] = ["Loading...", "Ad loading...", "Please wait..."];

/// Substrings of our own fallback / spinner markup.
pub const LOADING_MARKERS: [&str; 2] = ["External ad content loading", "Loading advertisement"];

/// 文本是否仅为一个 URL（绝对地址、协议相对地址或已知广告网络地址）
pub fn is_url_only(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && URL_ONLY.is_match(trimmed)
}

pub fn is_placeholder_text(text: &str) -> bool {
    let trimmed = text.trim();
    LOADER_PLACEHOLDERS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(trimmed))
}

pub fn is_invalid_text(text: &str) -> bool {
    is_url_only(text) || is_placeholder_text(text)
}

pub fn is_invalid_content(doc: &Document, element: NodeId) -> bool {
    is_invalid_text(&doc.text_content(element))
}

pub fn contains_loading_marker(html: &str) -> bool {
    LOADING_MARKERS.iter().any(|m| html.contains(m))
}

/// Scans the container's element children for at least one real creative.
///
/// This is not a pure query: children classified as URL-only or placeholder
/// noise are removed from the container while scanning, so a container made
/// only of noise ends up empty.
pub fn has_meaningful_content(doc: &mut Document, container: NodeId) -> bool {
    let mut found = false;
    for child in doc.element_children(container) {
        let text = doc.text_content(child);
        if is_invalid_text(&text) {
            debug!(text = %preview(&text), "removing noise from slot container");
            doc.detach(child);
            continue;
        }
        let html = doc.inner_html(child);
        if !html.trim().is_empty() && !contains_loading_marker(&html) && text.chars().count() > 5 {
            found = true;
        }
    }
    found
}

fn preview(text: &str) -> String {
    text.trim().chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::markup::parse_fragment;
    use proptest::prelude::*;

    fn container_with(doc: &mut Document, markup: &str) -> NodeId {
        let container = doc.create_element("div");
        for node in parse_fragment(doc, markup) {
            doc.append_child(container, node);
        }
        container
    }

    #[test]
    fn url_only_examples() {
        assert!(is_url_only("https://example.com/ad.js"));
        assert!(is_url_only("  //cdn.example.net/tag?x=1\n"));
        assert!(is_url_only("cdn-fc.com/creatives/universal/dynamic/?id=42"));
        assert!(is_url_only("distortedwin.com/bvX.VzscdqG"));
        assert!(!is_url_only(""));
        assert!(!is_url_only("Buy now at https://shop.example"));
        assert!(!is_url_only("example.com"));
    }

    #[test]
    fn placeholders_match_exactly_ignoring_case() {
        assert!(is_invalid_text("loading..."));
        assert!(is_invalid_text(" AD LOADING... "));
        assert!(is_invalid_text("Please wait..."));
        assert!(!is_invalid_text("Loading... our best deals"));
    }

    #[test]
    fn meaningful_content_removes_noise() {
        let mut doc = Document::new();
        let container = container_with(
            &mut doc,
            "<div>https://distortedwin.com/x</div><p>Loading...</p><div class=\"ad\"><a href=\"#\">Cheap flights today</a></div>",
        );
        assert!(has_meaningful_content(&mut doc, container));
        assert_eq!(doc.child_element_count(container), 1);
        assert_eq!(doc.text_content(container), "Cheap flights today");
    }

    #[test]
    fn noise_only_container_is_emptied() {
        let mut doc = Document::new();
        let container = container_with(&mut doc, "<div>//cdn.example/a.js</div><span>Please wait...</span>");
        assert!(!has_meaningful_content(&mut doc, container));
        assert_eq!(doc.child_element_count(container), 0);
    }

    #[test]
    fn short_or_loading_children_are_kept_but_not_meaningful() {
        let mut doc = Document::new();
        let container = container_with(
            &mut doc,
            "<div>ok</div><div><p>Loading advertisement...</p></div><div></div>",
        );
        assert!(!has_meaningful_content(&mut doc, container));
        assert_eq!(doc.child_element_count(container), 3);
    }

    proptest! {
        #[test]
        fn absolute_and_protocol_relative_urls_are_url_only(
            scheme in prop::sample::select(vec!["http://", "https://", "HTTPS://", "//"]),
            host in "[a-z]{1,12}(\\.[a-z]{2,6}){1,2}",
            path in "(/[A-Za-z0-9._~-]{0,10}){0,3}",
            pad in "[ \t\n]{0,3}",
        ) {
            let text = format!("{pad}{scheme}{host}{path}{pad}");
            prop_assert!(is_url_only(&text));
        }

        #[test]
        fn surrounding_prose_is_never_url_only(
            prose in "[A-Za-z]{1,10}",
            host in "[a-z]{1,12}\\.[a-z]{2,6}",
            before in any::<bool>(),
        ) {
            let url = format!("https://{host}/ad");
            let text = if before { format!("{prose} {url}") } else { format!("{url} {prose}") };
            prop_assert!(!is_url_only(&text));
        }
    }
}
