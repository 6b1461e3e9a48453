use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::OnceLock;

pub type TokenSet = HashSet<String>;

const ZERO_WIDTH: [char; 4] = ['\u{200b}', '\u{200c}', '\u{200d}', '\u{feff}'];
const EDGE_MARKUP: [char; 3] = ['*', '`', '|'];
const PAIRED_MARKUP: [&str; 2] = ["__", "~~"];
const TRAILING_PUNCTUATION: [char; 7] = ['.', ',', ';', ':', '!', '?', ')'];

fn block_marker_regex() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    // Heading hashes and quote markers, only at the start of a line.
    MARKERS.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:#{1,6}(?:[ \t]+|$)|>+[ \t]*)+").expect("static regex is valid")
    })
}

fn strip_edge_markup(token: &str) -> String {
    let body = token.trim_end_matches(TRAILING_PUNCTUATION);
    let tail = &token[body.len()..];

    let mut body = body.trim_matches(EDGE_MARKUP);
    for pair in PAIRED_MARKUP {
        if body.len() > pair.len() * 2 && body.starts_with(pair) && body.ends_with(pair) {
            body = body[pair.len()..body.len() - pair.len()].trim_matches(EDGE_MARKUP);
        }
    }
    if body.chars().all(|ch| matches!(ch, '_' | '~')) {
        body = "";
    }

    format!("{body}{tail}")
}

// Formatting is only stripped where it acts as markup: block markers at line
// start, pipes and emphasis runs at token edges. `c#`, `max_retries` and `2>1`
// keep their characters.
pub fn content_signature(content: &str) -> String {
    let lowered = content
        .to_lowercase()
        .chars()
        .filter(|ch| !ZERO_WIDTH.contains(ch))
        .collect::<String>();
    let unblocked = block_marker_regex().replace_all(&lowered, "");

    let normalized = unblocked
        .split_whitespace()
        .map(strip_edge_markup)
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if normalized.is_empty() {
        return String::new();
    }

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn tokenize_simple(text: &str) -> TokenSet {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub fn jaccard(left: &TokenSet, right: &TokenSet) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }

    let intersection = left.intersection(right).count();
    let union = left.len() + right.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

pub fn count_occurrences(text: &str, pattern: &str) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    text.matches(pattern).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_ignores_case_spacing_and_markdown() {
        let plain = content_signature("Retry the request after a timeout");
        let formatted = content_signature("**Retry**  the request\n\nafter a `timeout`");
        assert_eq!(plain, formatted);
        assert_eq!(plain.len(), 64);
    }

    #[test]
    fn signature_distinguishes_different_words() {
        assert_ne!(content_signature("retry later"), content_signature("retry now"));
    }

    #[test]
    fn blank_content_has_no_signature() {
        assert_eq!(content_signature("  \n\t "), "");
        assert_eq!(content_signature("** __ |"), "");
        assert_eq!(content_signature("##\n> \u{200b}"), "");
    }

    #[test]
    fn signature_strips_block_markers_and_table_pipes() {
        let plain = content_signature("setup install the sdk region eu");
        let formatted = content_signature("## Setup\n> Install the __SDK__\n| region | eu |");
        assert_eq!(plain, formatted);
        assert_eq!(
            content_signature("**Note**: restart"),
            content_signature("note: restart")
        );
    }

    #[test]
    fn signature_keeps_symbols_inside_tokens() {
        assert_ne!(
            content_signature("Install the C# SDK"),
            content_signature("Install the C SDK")
        );
        assert_ne!(
            content_signature("set max_retries to 5"),
            content_signature("set max retries to 5")
        );
        assert_ne!(
            content_signature("exit code 2>1 on failure"),
            content_signature("exit code 2 1 on failure")
        );
    }

    #[test]
    fn tokens_are_lowercase_and_unique() {
        let tokens = tokenize_simple("Alpha beta ALPHA\tgamma");
        assert_eq!(tokens.len(), 3);
        assert!(tokens.contains("alpha"));
    }

    #[test]
    fn jaccard_handles_empty_and_overlapping_sets() {
        assert_eq!(jaccard(&TokenSet::new(), &TokenSet::new()), 0.0);

        let left = tokenize_simple("a b c");
        let right = tokenize_simple("b c d");
        assert!((jaccard(&left, &right) - 0.5).abs() < f64::EPSILON);
        assert_eq!(jaccard(&left, &TokenSet::new()), 0.0);
    }

    #[test]
    fn occurrences_do_not_overlap() {
        assert_eq!(count_occurrences("aaaa", "aa"), 2);
        assert_eq!(count_occurrences("timeout, timeout", "timeout"), 2);
        assert_eq!(count_occurrences("anything", ""), 0);
    }
}
