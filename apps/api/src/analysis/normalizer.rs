//! Normalizer: lowercase token stream with a mapping back to the original text.
//!
//! Tokens are split on whitespace first, then punctuation. Punctuation and blank
//! lines open a new phrase; a single line break is plain whitespace, since
//! extracted text wraps mid-sentence. Intra-word hyphens, slashes and ampersands
//! split a token without opening one (`front-end` -> `front`, `end` in the same phrase).
//! Technology spellings keep their marks: `c++`, `c#`, `node.js`.

use std::borrow::Cow;
use std::ops::Range;

use crate::analysis::lexicon::Stopwords;
use crate::analysis::loader::Document;

/// Upper bound on the alphanumeric prefix that may take `+`/`#` suffixes (`c++`, `f#`).
const MAX_SUFFIXED_STEM_CHARS: usize = 3;

/// Lowercase tokens plus, for each token, its character offset in the original
/// text and whether a phrase boundary precedes it.
///
/// The three vectors always have equal length and offsets never decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    tokens: Vec<String>,
    offsets: Vec<usize>,
    phrase_starts: Vec<bool>,
}

impl NormalizedText {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Character offset of each token's first character in the original text.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Runs of kept tokens that never cross a phrase boundary.
    ///
    /// Tokens for which `skip` returns true are dropped and also end the current
    /// phrase, so `"python and docker"` with `and` skipped yields two phrases.
    pub fn phrases<F>(&self, skip: F) -> Vec<Vec<&str>>
    where
        F: Fn(&str) -> bool,
    {
        let mut phrases = Vec::new();
        for range in self.phrase_ranges() {
            let mut current: Vec<&str> = Vec::new();
            for token in &self.tokens[range] {
                if skip(token) {
                    if !current.is_empty() {
                        phrases.push(std::mem::take(&mut current));
                    }
                    continue;
                }
                current.push(token);
            }
            if !current.is_empty() {
                phrases.push(current);
            }
        }
        phrases
    }

    /// Non-stopword tokens grouped by phrase.
    pub fn content_tokens(&self, stopwords: &Stopwords) -> Vec<Vec<&str>> {
        self.phrases(|token| stopwords.contains(token))
    }

    /// Every in-phrase window of up to `longest` tokens that neither starts nor
    /// ends on a skipped token. Skipped tokens may sit inside a window
    /// (`ruby on rails`), which is then marked `bridged`.
    pub fn windows<F>(&self, longest: usize, skip: F) -> Vec<Window<'_>>
    where
        F: Fn(&str) -> bool,
    {
        let mut windows = Vec::new();
        for range in self.phrase_ranges() {
            for start in range.clone() {
                if skip(&self.tokens[start]) {
                    continue;
                }
                let mut bridged = false;
                for end in start + 1..=range.end.min(start + longest) {
                    if skip(&self.tokens[end - 1]) {
                        bridged = true;
                        continue;
                    }
                    windows.push(Window {
                        tokens: &self.tokens[start..end],
                        bridged,
                    });
                }
            }
        }
        windows
    }

    /// Token index ranges between phrase boundaries.
    fn phrase_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut begin = 0;
        for (i, &starts_phrase) in self.phrase_starts.iter().enumerate() {
            if starts_phrase && i > begin {
                ranges.push(begin..i);
                begin = i;
            }
        }
        if begin < self.tokens.len() {
            ranges.push(begin..self.tokens.len());
        }
        ranges
    }

    fn push(&mut self, token: String, offset: usize, starts_phrase: bool) {
        self.tokens.push(token);
        self.offsets.push(offset);
        self.phrase_starts.push(starts_phrase);
    }
}

/// A contiguous run of tokens inside one phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    pub tokens: &'a [String],
    /// At least one interior token was skipped.
    pub bridged: bool,
}

/// Normalizes a loaded document's text.
pub fn normalize(document: &Document) -> NormalizedText {
    normalize_text(document.text())
}

pub fn normalize_text(text: &str) -> NormalizedText {
    let chars: Vec<char> = text.chars().collect();
    let mut out = NormalizedText::default();

    let mut buf = String::new();
    let mut start = 0usize;
    let mut pending_break = true;
    // Line feeds seen since the last non-whitespace character.
    let mut line_breaks = 0usize;

    let flush = |out: &mut NormalizedText, buf: &mut String, start: usize, brk: &mut bool| {
        if !buf.is_empty() {
            out.push(std::mem::take(buf), start, *brk);
            *brk = false;
        }
    };

    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let prev_alnum = prev.is_some_and(char::is_alphanumeric);
        let next_alnum = next.is_some_and(char::is_alphanumeric);

        if !c.is_whitespace() {
            line_breaks = 0;
        }
        if c.is_alphanumeric() {
            if buf.is_empty() {
                start = i;
            }
            buf.extend(c.to_lowercase());
            continue;
        }

        if !buf.is_empty() {
            let suffix_mark = (c == '+' || c == '#')
                && !next_alnum
                && buf.trim_end_matches(['+', '#']).chars().count() <= MAX_SUFFIXED_STEM_CHARS;
            let inner_dot = c == '.' && prev_alnum && next_alnum;
            let inner_apostrophe = (c == '\'' || c == '\u{2019}') && prev_alnum && next_alnum;

            if suffix_mark || inner_dot {
                buf.push(c);
                continue;
            }
            if inner_apostrophe {
                buf.push('\'');
                continue;
            }
        }

        flush(&mut out, &mut buf, start, &mut pending_break);

        let soft_split = matches!(c, '-' | '/' | '&') && prev_alnum && next_alnum;
        if c == '\n' {
            line_breaks += 1;
        }
        if line_breaks >= 2 || (!c.is_whitespace() && !soft_split) {
            pending_break = true;
        }
    }
    flush(&mut out, &mut buf, start, &mut pending_break);

    out
}

/// Light English suffix stripping used as a comparison key.
///
/// Only ever compared against other stems, so over-stemming is harmless as long
/// as it is consistent (`kubernetes` -> `kubernete` on both sides).
pub fn stem(token: &str) -> Cow<'_, str> {
    let token = token.strip_suffix("'s").unwrap_or(token);
    let len = token.chars().count();
    if len <= 3 || token.ends_with(['+', '#']) {
        return Cow::Borrowed(token);
    }

    if let Some(base) = token.strip_suffix("ies") {
        if len > 4 {
            return Cow::Owned(format!("{base}y"));
        }
    }
    if let Some(base) = token.strip_suffix("ing") {
        if len > 5 {
            return Cow::Borrowed(base);
        }
    }
    if let Some(base) = token.strip_suffix("ed") {
        if len > 4 {
            return Cow::Borrowed(base);
        }
    }
    if let Some(base) = token.strip_suffix("sses") {
        return Cow::Owned(format!("{base}ss"));
    }
    if token.ends_with('s') && !["ss", "us", "is"].iter().any(|end| token.ends_with(end)) {
        return Cow::Borrowed(&token[..token.len() - 1]);
    }
    Cow::Borrowed(token)
}

/// Stems every token and joins them with single spaces.
pub fn phrase_key<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| stem(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits_on_whitespace_and_punctuation() {
        let text = normalize_text("Senior  Rust Engineer, Remote.");
        assert_eq!(text.tokens(), ["senior", "rust", "engineer", "remote"]);
        assert_eq!(text.offsets(), [0, 8, 13, 23]);
    }

    #[test]
    fn test_tokens_and_offsets_have_equal_length_and_never_decrease() {
        let text = normalize_text("Résumé: C++, C#, node.js & Go!\n\tKubernetes (k8s)");
        assert_eq!(text.tokens().len(), text.offsets().len());
        assert!(text.offsets().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_offsets_are_character_offsets() {
        let original = "Café Python";
        let text = normalize_text(original);
        assert_eq!(text.tokens(), ["café", "python"]);
        let python_at = text.offsets()[1];
        let tail: String = original.chars().skip(python_at).collect();
        assert_eq!(tail, "Python");
    }

    #[test]
    fn test_keeps_technology_spellings() {
        let text = normalize_text("C++, C#, Node.js and ASP.NET");
        assert_eq!(text.tokens(), ["c++", "c#", "node.js", "and", "asp.net"]);
    }

    #[test]
    fn test_sentence_final_dot_is_not_joined() {
        let text = normalize_text("Loves Rust. Docker too");
        assert_eq!(text.tokens(), ["loves", "rust", "docker", "too"]);
    }

    #[test]
    fn test_phrases_never_cross_punctuation_or_skipped_tokens() {
        let text = normalize_text("Machine learning, Python and Docker\n\nKubernetes");
        let phrases = text.phrases(|t| t == "and");
        assert_eq!(
            phrases,
            vec![
                vec!["machine", "learning"],
                vec!["python"],
                vec!["docker"],
                vec!["kubernetes"],
            ]
        );
    }

    #[test]
    fn test_single_line_break_does_not_end_phrase() {
        let text = normalize_text("applying machine\nlearning to fraud");
        assert_eq!(
            text.phrases(|_| false),
            vec![vec!["applying", "machine", "learning", "to", "fraud"]]
        );

        let crlf = normalize_text("machine\r\nlearning");
        assert_eq!(crlf.phrases(|_| false), vec![vec!["machine", "learning"]]);
    }

    #[test]
    fn test_blank_line_ends_phrase() {
        for text in ["Docker\n\nKubernetes", "Docker\r\n  \r\nKubernetes", "Docker\n\t\nKubernetes"] {
            assert_eq!(
                normalize_text(text).phrases(|_| false),
                vec![vec!["docker"], vec!["kubernetes"]],
                "{text:?}"
            );
        }
    }

    #[test]
    fn test_content_tokens_drop_stopwords() {
        let stopwords = Stopwords::new(["and", "with"]);
        let text = normalize_text("Rust and Go with gRPC");
        assert_eq!(
            text.content_tokens(&stopwords),
            vec![vec!["rust"], vec!["go"], vec!["grpc"]]
        );
    }

    fn window_strings(text: &NormalizedText, longest: usize, skip: &[&str]) -> Vec<(String, bool)> {
        text.windows(longest, |t| skip.iter().any(|s| *s == t))
            .into_iter()
            .map(|w| (w.tokens.join(" "), w.bridged))
            .collect()
    }

    #[test]
    fn test_windows_bridge_interior_skipped_tokens() {
        let text = normalize_text("Ruby on Rails");
        assert_eq!(
            window_strings(&text, 3, &["on"]),
            vec![
                ("ruby".to_string(), false),
                ("ruby on rails".to_string(), true),
                ("rails".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_windows_stay_inside_phrases() {
        let text = normalize_text("Kafka, Spark streaming");
        let windows = window_strings(&text, 3, &[]);
        assert!(windows.contains(&("spark streaming".to_string(), false)));
        assert!(!windows.iter().any(|(w, _)| w.starts_with("kafka ")));
    }

    #[test]
    fn test_soft_split_keeps_phrase() {
        let text = normalize_text("front-end CI/CD");
        assert_eq!(text.tokens(), ["front", "end", "ci", "cd"]);
        assert_eq!(text.phrases(|_| false), vec![vec!["front", "end", "ci", "cd"]]);
    }

    #[test]
    fn test_empty_text_has_no_tokens() {
        assert!(normalize_text("  ...  ").is_empty());
    }

    #[test]
    fn test_stem_is_consistent_across_inflections() {
        assert_eq!(stem("services"), stem("service"));
        assert_eq!(stem("testing"), "test");
        assert_eq!(stem("tested"), "test");
        assert_eq!(stem("technologies"), "technology");
        assert_eq!(stem("kubernetes"), stem("kubernetes"));
        assert_eq!(stem("aws"), "aws");
        assert_eq!(stem("express"), "express");
        assert_eq!(stem("c++"), "c++");
        assert_eq!(stem("team's"), "team");
    }

    #[test]
    fn test_phrase_key_joins_stems() {
        assert_eq!(phrase_key(&["distributed", "systems"]), "distribut system");
    }
}
