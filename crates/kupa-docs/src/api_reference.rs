//! API reference page scanning.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::DocsError;
use crate::Result;

/// Version facts the reference page states about one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiVersionInfo {
    pub current: Vec<String>,
    pub deprecated: Vec<String>,
    pub replacement: Option<String>,
}

impl ApiVersionInfo {
    pub fn is_deprecated(&self, api_version: &str) -> bool {
        let needle = api_version.to_lowercase();
        self.deprecated.iter().any(|v| *v == needle)
    }
}

/// Find the section about `kind` and collect the versions it mentions.
///
/// The first `h1`/`h2`/`h3` whose text contains the kind anchors the scan;
/// sibling blocks after it are read until the next heading. Returns `None`
/// when no heading mentions the kind.
pub fn scan_api_reference(html: &str, kind: &str) -> Result<Option<ApiVersionInfo>> {
    let document = Html::parse_document(html);
    let headings = Selector::parse("h1, h2, h3").map_err(|e| DocsError::Parse(e.to_string()))?;

    let kind_lower = kind.to_lowercase();
    let Some(anchor) = document
        .select(&headings)
        .find(|h| h.text().collect::<String>().to_lowercase().contains(&kind_lower))
    else {
        return Ok(None);
    };

    let mut info = ApiVersionInfo::default();
    for block in anchor.next_siblings().filter_map(ElementRef::wrap) {
        if is_heading(block.value().name()) {
            break;
        }
        let text = block.text().collect::<String>().to_lowercase();
        if !text.contains("version") {
            continue;
        }

        let (before, after) = split_at_advice(&text);
        if before.contains("deprecated") || before.contains("removed") {
            info.deprecated.extend(version_tokens(before));
            if let Some(advice) = after {
                if info.replacement.is_none() {
                    info.replacement = version_tokens(advice).into_iter().next();
                }
            }
        } else if after.is_some() {
            if let Some(first) = version_tokens(&text).into_iter().next() {
                info.replacement = Some(first);
            }
        } else {
            info.current.extend(version_tokens(&text));
        }
    }

    Ok(Some(info))
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Split a block at its first "use ..." or "replace..." phrase.
fn split_at_advice(text: &str) -> (&str, Option<&str>) {
    static ADVICE: OnceLock<Option<Regex>> = OnceLock::new();
    let advice = ADVICE
        .get_or_init(|| Regex::new(r"\b(?:use|replace\w*)\b").ok())
        .as_ref();
    match advice.and_then(|re| re.find(text)) {
        Some(m) => (&text[..m.start()], Some(&text[m.start()..])),
        None => (text, None),
    }
}

/// API version tokens (`apps/v1beta2`, `v1`) and dotted release numbers.
fn version_tokens(text: &str) -> Vec<String> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(token) = TOKEN
        .get_or_init(|| {
            Regex::new(
                r"\b(?:[a-z0-9][a-z0-9.\-]*/)?v\d+(?:(?:alpha|beta)\d*)?\b|\b\d+(?:\.\d+)+\b",
            )
            .ok()
        })
        .as_ref()
    else {
        return Vec::new();
    };
    token
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
