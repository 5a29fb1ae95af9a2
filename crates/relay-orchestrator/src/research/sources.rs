//! Best-effort source extraction from synthesized text.
//!
//! URLs and `source:`/`reference:` phrases are pulled out of the final
//! answer. This is not a verified citation mechanism; it only surfaces what
//! the model chose to mention.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// A source enriched with display metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDetail {
    /// Display title (the URL's host for link sources).
    pub title: String,
    /// The source URL.
    pub url: String,
    /// Surrounding context, when any was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Positional relevance, descending from 1.0.
    pub relevance: f64,
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>()\[\]"']+"#).expect("valid URL pattern"))
}

/// Strips punctuation a sentence may have glued onto a URL.
fn trim_url(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?'])
}

/// Extracts the host portion of a URL for display.
fn host_of(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    without_scheme.split('/').next().unwrap_or(without_scheme).to_string()
}

/// Extracts sources from synthesized text.
///
/// Returns the flat source list (URLs first, then non-URL `source:` phrases)
/// and detailed entries for the URLs, with positional relevance.
#[must_use]
pub fn extract_sources(text: &str) -> (Vec<String>, Vec<SourceDetail>) {
    let mut sources: Vec<String> = Vec::new();

    for capture in url_regex().find_iter(text) {
        let url = trim_url(capture.as_str()).to_string();
        if !url.is_empty() && !sources.contains(&url) {
            sources.push(url);
        }
    }

    // Phrase-marked sources without a URL (e.g. "Source: internal CRM export").
    let mut phrases: Vec<String> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim().trim_start_matches(['-', '*', ' ']);
        for marker in ["source:", "reference:"] {
            let matches_marker = trimmed
                .get(..marker.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(marker));
            if matches_marker {
                let value = trimmed[marker.len()..].trim().to_string();
                if !value.is_empty() && !value.contains("http") && !phrases.contains(&value) {
                    phrases.push(value);
                }
            }
        }
    }

    let detailed: Vec<SourceDetail> = sources
        .iter()
        .enumerate()
        .map(|(idx, url)| SourceDetail {
            title: host_of(url),
            url: url.clone(),
            content: None,
            relevance: (1.0 - idx as f64 * 0.1).max(0.1),
        })
        .collect();

    sources.extend(phrases);
    (sources, detailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_urls_with_trailing_punctuation() {
        let text = "See https://example.com/report, and https://data.example.org/stats.";
        let (sources, detailed) = extract_sources(text);
        assert_eq!(
            sources,
            vec!["https://example.com/report", "https://data.example.org/stats"]
        );
        assert_eq!(detailed[0].title, "example.com");
        assert_eq!(detailed[1].title, "data.example.org");
    }

    #[test]
    fn test_deduplicates_urls() {
        let text = "https://example.com twice: https://example.com";
        let (sources, _) = extract_sources(text);
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn test_phrase_sources_without_urls() {
        let text = "Findings...\n- Source: internal CRM export\nReference: Q2 board deck\n";
        let (sources, detailed) = extract_sources(text);
        assert!(sources.contains(&"internal CRM export".to_string()));
        assert!(sources.contains(&"Q2 board deck".to_string()));
        // Phrase sources carry no URL, so no detailed entry.
        assert!(detailed.is_empty());
    }

    #[test]
    fn test_relevance_descends_with_position() {
        let text = "https://a.example https://b.example https://c.example";
        let (_, detailed) = extract_sources(text);
        assert_eq!(detailed[0].relevance, 1.0);
        assert_eq!(detailed[1].relevance, 0.9);
        assert!(detailed[2].relevance < detailed[1].relevance);
    }

    #[test]
    fn test_no_sources_yields_empty() {
        let (sources, detailed) = extract_sources("no links here");
        assert!(sources.is_empty());
        assert!(detailed.is_empty());
    }
}
