//! Bracketed numeric-range expansion for URL lists.
//!
//! `http://host/[1-3]/clip` becomes three concrete URLs. Only the first
//! `[start-end]` token in the string is expanded; everything else is left
//! untouched.

use regex::Regex;
use std::sync::OnceLock;

fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)-(\d+)\]").expect("range regex"))
}

/// Expands the first `[start-end]` token of `url` into one URL per integer
/// in the inclusive range, in ascending order.
///
/// Without a range token the URL is returned as the single element. An
/// inverted range (`start > end`) is empty and expands to nothing; callers
/// that treat that as a user mistake must check before expanding.
pub fn expand(url: &str) -> Vec<String> {
    let Some(caps) = range_re().captures(url) else {
        return vec![url.to_string()];
    };

    let token = caps.get(0).expect("whole match");
    let (Ok(start), Ok(end)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) else {
        // Digits too large to be a real range; treat as a literal URL.
        return vec![url.to_string()];
    };

    let mut urls = Vec::new();
    for i in start..=end {
        let mut expanded = String::with_capacity(url.len());
        expanded.push_str(&url[..token.start()]);
        expanded.push_str(&i.to_string());
        expanded.push_str(&url[token.end()..]);
        urls.push(expanded);
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_simple_range_in_order() {
        assert_eq!(
            expand("http://x/[1-3]/v"),
            vec!["http://x/1/v", "http://x/2/v", "http://x/3/v"]
        );
    }

    #[test]
    fn single_element_range() {
        assert_eq!(expand("http://x/[5-5]/v"), vec!["http://x/5/v"]);
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(expand("http://x/[3-1]/v").is_empty());
    }

    #[test]
    fn no_range_passes_through() {
        assert_eq!(
            expand("http://x/video?id=7"),
            vec!["http://x/video?id=7"]
        );
    }

    #[test]
    fn only_first_range_is_expanded() {
        assert_eq!(
            expand("http://x/[1-2]/[8-9]"),
            vec!["http://x/1/[8-9]", "http://x/2/[8-9]"]
        );
    }

    #[test]
    fn non_numeric_brackets_are_literal() {
        assert_eq!(expand("http://x/[a-b]/v"), vec!["http://x/[a-b]/v"]);
    }

    #[test]
    fn oversized_numbers_are_literal() {
        let url = "http://x/[99999999999999999999-3]/v";
        assert_eq!(expand(url), vec![url.to_string()]);
    }
}
