//! Phrase matcher: word-boundary phrase search over located text.
//!
//! Matching is greedy-leftmost in caller order: at every character position
//! the phrases are tried in declared order, the first hit wins and the scan
//! resumes after it. Matches therefore never overlap and come out sorted.
//!
//! A phrase edge that is alphanumeric must not touch an alphanumeric
//! neighbour, so `"get"` never matches inside `"getter"` while `"e.g."` still
//! matches right before a comma. All offsets are byte offsets into the
//! original text, also under [`Comparison::IgnoreCase`].

use serde::{Deserialize, Serialize};

use crate::span::TextSpan;
use crate::walker::TextToken;

/// How phrase characters are compared with text characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Exact char equality.
    #[default]
    Ordinal,
    /// Unicode lowercase char by char.
    IgnoreCase,
}

/// One phrase hit inside a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseMatch {
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Byte offset just past the match.
    pub end: usize,
    /// Index of the matching phrase in the caller's list.
    pub phrase: usize,
}

impl PhraseMatch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// ============================================================================
// Primitives
// ============================================================================

fn chars_equal(a: char, b: char, comparison: Comparison) -> bool {
    match comparison {
        Comparison::Ordinal => a == b,
        Comparison::IgnoreCase => a == b || a.to_lowercase().eq(b.to_lowercase()),
    }
}

/// Match `phrase` at byte offset `pos` of `text`, ignoring word boundaries.
///
/// Returns the byte offset just past the match.
fn raw_match_at(text: &str, pos: usize, phrase: &str, comparison: Comparison) -> Option<usize> {
    let rest = text.get(pos..)?;
    let mut text_chars = rest.char_indices();
    for p in phrase.chars() {
        let (_, t) = text_chars.next()?;
        if !chars_equal(t, p, comparison) {
            return None;
        }
    }
    let consumed = text_chars.next().map(|(i, _)| i).unwrap_or(rest.len());
    Some(pos + consumed)
}

fn boundary_ok(text: &str, start: usize, end: usize, phrase: &str) -> bool {
    let first_is_word = phrase.chars().next().is_some_and(char::is_alphanumeric);
    let last_is_word = phrase.chars().next_back().is_some_and(char::is_alphanumeric);
    if first_is_word && text[..start].chars().next_back().is_some_and(char::is_alphanumeric) {
        return false;
    }
    if last_is_word && text[end..].chars().next().is_some_and(char::is_alphanumeric) {
        return false;
    }
    true
}

/// Match `phrase` at `pos`, honouring word boundaries.
pub fn match_at(text: &str, pos: usize, phrase: &str, comparison: Comparison) -> Option<usize> {
    if phrase.is_empty() || !text.is_char_boundary(pos) {
        return None;
    }
    let end = raw_match_at(text, pos, phrase, comparison)?;
    boundary_ok(text, pos, end, phrase).then_some(end)
}

/// All non-overlapping phrase hits in `text`, greedy-leftmost in phrase order.
pub fn find_matches<S: AsRef<str>>(text: &str, phrases: &[S], comparison: Comparison) -> Vec<PhraseMatch> {
    let mut matches = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let hit = phrases
            .iter()
            .enumerate()
            .find_map(|(i, phrase)| match_at(text, pos, phrase.as_ref(), comparison).map(|end| (i, end)));
        match hit {
            Some((phrase, end)) => {
                matches.push(PhraseMatch {
                    start: pos,
                    end,
                    phrase,
                });
                pos = end;
            }
            None => {
                pos += text[pos..].chars().next().map(char::len_utf8).unwrap_or(1);
            }
        }
    }
    matches
}

/// Index of the first phrase that `text` starts with.
pub fn starts_with_any<S: AsRef<str>>(text: &str, phrases: &[S], comparison: Comparison) -> Option<usize> {
    phrases
        .iter()
        .position(|phrase| match_at(text, 0, phrase.as_ref(), comparison).is_some())
}

/// Index of the first phrase that `text` ends with.
pub fn ends_with_any<S: AsRef<str>>(text: &str, phrases: &[S], comparison: Comparison) -> Option<usize> {
    phrases.iter().position(|phrase| {
        let phrase = phrase.as_ref();
        text.char_indices()
            .rev()
            .any(|(pos, _)| match_at(text, pos, phrase, comparison) == Some(text.len()))
    })
}

/// Index of the first phrase (in declared order) that occurs anywhere in `text`.
pub fn contains_any<S: AsRef<str>>(text: &str, phrases: &[S], comparison: Comparison) -> Option<usize> {
    phrases.iter().position(|phrase| {
        let phrase = phrase.as_ref();
        text.char_indices()
            .any(|(pos, _)| match_at(text, pos, phrase, comparison).is_some())
    })
}

/// Shrink `[start, end)` of `text` by `left` chars from the front and `right`
/// chars from the back, saturating at an empty range.
pub fn trim_range(text: &str, start: usize, end: usize, left: usize, right: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let total = slice.chars().count();
    let left = left.min(total);
    let right = right.min(total - left);
    let new_start = slice
        .char_indices()
        .nth(left)
        .map(|(i, _)| start + i)
        .unwrap_or(end);
    let keep = total - left - right;
    let new_end = text[new_start..end]
        .char_indices()
        .nth(keep)
        .map(|(i, _)| new_start + i)
        .unwrap_or(end);
    (new_start, new_end)
}

// ============================================================================
// Token Search
// ============================================================================

/// Located phrase hits inside one token, each shrunk by the trims.
pub fn find_all<S: AsRef<str>>(
    token: &TextToken<'_>,
    phrases: &[S],
    comparison: Comparison,
    left_trim: usize,
    right_trim: usize,
) -> Vec<TextSpan> {
    find_matches(token.text, phrases, comparison)
        .into_iter()
        .map(|m| {
            let (start, end) = trim_range(token.text, m.start, m.end, left_trim, right_trim);
            token.span.sub(start, end - start)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{BufferId, Generation};
    use crate::tree::NodePath;
    use crate::walker::TokenKind;

    fn token(text: &str, start: usize) -> TextToken<'_> {
        TextToken {
            text,
            span: TextSpan::new(BufferId(0), Generation(0), start, text.len()),
            ancestry: Vec::new(),
            path: NodePath(vec![0]),
            kind: TokenKind::Text,
        }
    }

    mod boundary_tests {
        use super::*;

        #[test]
        fn rejects_partial_words() {
            assert!(find_matches("getter", &["get"], Comparison::Ordinal).is_empty());
            assert!(find_matches("forget", &["get"], Comparison::Ordinal).is_empty());
            assert_eq!(find_matches("get it", &["get"], Comparison::Ordinal).len(), 1);
        }

        #[test]
        fn punctuation_edges_ignore_neighbours() {
            let found = find_matches("see e.g., here", &["e.g."], Comparison::Ordinal);
            assert_eq!(found, vec![PhraseMatch { start: 4, end: 8, phrase: 0 }]);
        }

        #[test]
        fn trailing_space_phrase_matches_before_word() {
            assert_eq!(starts_with_any("Gets the value", &["Gets "], Comparison::Ordinal), Some(0));
        }
    }

    mod order_tests {
        use super::*;

        #[test]
        fn first_declared_phrase_wins_at_a_position() {
            let found = find_matches("set value", &["set", "set value"], Comparison::Ordinal);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].phrase, 0);
            assert_eq!(found[0].end, 3);
        }

        #[test]
        fn matches_are_sorted_and_disjoint() {
            let found = find_matches("a b a b", &["b", "a"], Comparison::Ordinal);
            let starts: Vec<usize> = found.iter().map(|m| m.start).collect();
            assert_eq!(starts, vec![0, 2, 4, 6]);
            for pair in found.windows(2) {
                assert!(pair[0].end <= pair[1].start);
            }
        }
    }

    mod case_tests {
        use super::*;

        #[test]
        fn ignore_case_keeps_original_offsets() {
            let found = find_matches("Ärger ÄRGER", &["ärger"], Comparison::IgnoreCase);
            assert_eq!(found.len(), 2);
            assert_eq!(&"Ärger ÄRGER"[found[1].start..found[1].end], "ÄRGER");
        }

        #[test]
        fn ordinal_is_case_sensitive() {
            assert!(find_matches("Value", &["value"], Comparison::Ordinal).is_empty());
        }
    }

    mod primitive_tests {
        use super::*;

        #[test]
        fn ends_with_any_checks_tail() {
            assert_eq!(ends_with_any("The value.", &["!", "."], Comparison::Ordinal), Some(1));
            assert_eq!(ends_with_any("The value", &["."], Comparison::Ordinal), None);
        }

        #[test]
        fn contains_any_reports_declared_order() {
            assert_eq!(contains_any("x i.e. y e.g. z", &["e.g.", "i.e."], Comparison::Ordinal), Some(0));
            assert_eq!(contains_any("nothing", &["e.g."], Comparison::Ordinal), None);
        }

        #[test]
        fn empty_phrases_never_match() {
            assert!(find_matches("abc", &[""], Comparison::Ordinal).is_empty());
            assert_eq!(starts_with_any("abc", &[""], Comparison::Ordinal), None);
        }
    }

    mod token_tests {
        use super::*;

        #[test]
        fn spans_are_absolute_and_trimmed() {
            let tok = token("use e.g. this", 100);
            let spans = find_all(&tok, &["e.g."], Comparison::Ordinal, 0, 0);
            assert_eq!(spans[0].start, 104);
            assert_eq!(spans[0].len, 4);

            let trimmed = find_all(&tok, &[" e.g. "], Comparison::Ordinal, 1, 1);
            assert_eq!(trimmed[0].start, 104);
            assert_eq!(trimmed[0].len, 4);
        }

        #[test]
        fn trims_saturate() {
            let tok = token("ab", 0);
            let spans = find_all(&tok, &["ab"], Comparison::Ordinal, 5, 5);
            assert_eq!(spans.len(), 1);
            assert!(spans[0].is_empty());
        }

        #[test]
        fn trims_count_chars_not_bytes() {
            assert_eq!(trim_range("«ab»", 0, "«ab»".len(), 1, 1), (2, 4));
        }
    }
}
