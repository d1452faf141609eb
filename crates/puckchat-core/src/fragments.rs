//! Markdown-lite rendering support.
//!
//! Bot replies may contain `[text](url)` links and `**bold**` spans. Nothing
//! else is interpreted; presentation layers turn the fragments into styled
//! output.

use once_cell::sync::Lazy;
use regex::Regex;

static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

/// A styled piece of message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Bold(String),
    Link { text: String, url: String },
}

impl Fragment {
    /// Visible text of the fragment
    pub fn text(&self) -> &str {
        match self {
            Fragment::Text(text) | Fragment::Bold(text) => text,
            Fragment::Link { text, .. } => text,
        }
    }
}

/// Split message content into plain, bold and link fragments.
///
/// Links are matched first so that `**` inside link text is left alone.
pub fn parse(content: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut last = 0;

    for caps in LINK_RE.captures_iter(content) {
        let whole = caps.get(0).unwrap();
        push_bold_and_text(&content[last..whole.start()], &mut fragments);
        fragments.push(Fragment::Link {
            text: caps[1].to_string(),
            url: caps[2].to_string(),
        });
        last = whole.end();
    }
    push_bold_and_text(&content[last..], &mut fragments);

    fragments
}

fn push_bold_and_text(segment: &str, fragments: &mut Vec<Fragment>) {
    let mut last = 0;
    for caps in BOLD_RE.captures_iter(segment) {
        let whole = caps.get(0).unwrap();
        push_text(&segment[last..whole.start()], fragments);
        fragments.push(Fragment::Bold(caps[1].to_string()));
        last = whole.end();
    }
    push_text(&segment[last..], fragments);
}

fn push_text(text: &str, fragments: &mut Vec<Fragment>) {
    if text.is_empty() {
        return;
    }
    // Merge with a preceding plain fragment
    if let Some(Fragment::Text(prev)) = fragments.last_mut() {
        prev.push_str(text);
    } else {
        fragments.push(Fragment::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("Ahoj"), vec![Fragment::Text("Ahoj".to_string())]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_link_and_bold() {
        let fragments = parse("Viz **statistiky** na [webu](https://hokejlogic.cz).");
        assert_eq!(
            fragments,
            vec![
                Fragment::Text("Viz ".to_string()),
                Fragment::Bold("statistiky".to_string()),
                Fragment::Text(" na ".to_string()),
                Fragment::Link {
                    text: "webu".to_string(),
                    url: "https://hokejlogic.cz".to_string(),
                },
                Fragment::Text(".".to_string()),
            ]
        );
    }

    #[test]
    fn test_bold_inside_link_text_is_kept_literal() {
        let fragments = parse("[**x**](http://a)");
        assert_eq!(
            fragments,
            vec![Fragment::Link {
                text: "**x**".to_string(),
                url: "http://a".to_string(),
            }]
        );
    }

    #[test]
    fn test_unclosed_markers_stay_plain() {
        assert_eq!(
            parse("**půl [odkaz](bez"),
            vec![Fragment::Text("**půl [odkaz](bez".to_string())]
        );
    }
}
