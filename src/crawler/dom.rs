//! Text and visibility helpers over parsed HTML snapshots

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Tags whose text never renders
const SILENT_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Rendered text of `element`: script/style content dropped, whitespace collapsed
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    normalize_whitespace(&parts.join(" "))
}

/// Text nodes that are direct children of `element`
pub fn own_text(element: ElementRef<'_>) -> String {
    let parts: Vec<&str> = element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| &**text)
        .collect();
    normalize_whitespace(&parts.join(" "))
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_silent_tag(name: &str) -> bool {
    SILENT_TAGS.contains(&name)
}

/// False when the element or an ancestor is hidden by attribute or inline style
pub fn is_rendered(element: ElementRef<'_>) -> bool {
    if hides(element) {
        return false;
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .all(|ancestor| !hides(ancestor))
}

pub fn digit_runs(text: &str) -> Vec<&str> {
    DIGITS.find_iter(text).map(|m| m.as_str()).collect()
}

pub fn has_digit(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
}

fn collect_text<'a>(element: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push(&**text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !is_silent_tag(child_el.value().name()) {
                collect_text(child_el, out);
            }
        }
    }
}

fn hides(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() || is_silent_tag(value.name()) {
        return true;
    }
    if value.name() == "input" && value.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")) {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}
