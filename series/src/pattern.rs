//! Glob-pattern compiler for path keys.
//!
//! Patterns use a deliberately small dialect: `*` and `?` are wildcards
//! confined to a single `/`-separated segment, `\` escapes the next
//! character, and every other character is literal. There is no recursive
//! `**`, no extended-glob groups, no `#` comment stripping, and
//! dot-prefixed segments are matched like any other.
//!
//! A pattern compiles once into an immutable [`KeyMatcher`] whose
//! [`test`](KeyMatcher::test) is an anchored whole-key match. The matcher
//! implements [`common::KeyPredicate`] so the Document Store can apply it
//! without knowing anything about patterns.

use common::KeyPredicate;

use crate::error::{Error, Result};
use crate::key::SEPARATOR;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// `?` — exactly one character within the segment.
    AnyChar,
    /// `*` — any run of characters within the segment.
    AnySeq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SegmentPattern {
    tokens: Vec<Token>,
}

impl SegmentPattern {
    fn compile(segment: &str, pattern: &str) -> Result<Self> {
        let mut tokens = Vec::with_capacity(segment.len());
        let mut chars = segment.chars();
        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    // collapse runs of stars, they match the same inputs
                    if tokens.last() != Some(&Token::AnySeq) {
                        tokens.push(Token::AnySeq);
                    }
                }
                '?' => tokens.push(Token::AnyChar),
                '\\' => match chars.next() {
                    Some(escaped) => tokens.push(Token::Literal(escaped)),
                    None => {
                        return Err(Error::InvalidPattern {
                            pattern: pattern.to_string(),
                            reason: "trailing escape character".to_string(),
                        })
                    }
                },
                other => tokens.push(Token::Literal(other)),
            }
        }
        Ok(Self { tokens })
    }

    /// Anchored match of one key segment, with classic star backtracking.
    fn matches(&self, segment: &str) -> bool {
        let chars: Vec<char> = segment.chars().collect();
        let mut t = 0;
        let mut c = 0;
        let mut backtrack: Option<(usize, usize)> = None;

        while c < chars.len() {
            match self.tokens.get(t) {
                Some(Token::Literal(l)) if *l == chars[c] => {
                    t += 1;
                    c += 1;
                }
                Some(Token::AnyChar) => {
                    t += 1;
                    c += 1;
                }
                Some(Token::AnySeq) => {
                    // try the empty match first, retrying longer ones on failure
                    backtrack = Some((t, c));
                    t += 1;
                }
                _ => match backtrack {
                    Some((star_t, star_c)) => {
                        backtrack = Some((star_t, star_c + 1));
                        t = star_t + 1;
                        c = star_c + 1;
                    }
                    None => return false,
                },
            }
        }

        // remaining pattern must be all-star to accept the end of input
        self.tokens[t..].iter().all(|tok| *tok == Token::AnySeq)
    }
}

/// A compiled key pattern.
///
/// Matches whole keys only: the number of `/`-separated segments in the key
/// must equal the number of segments in the pattern, and each segment must
/// match its counterpart anchor-to-anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMatcher {
    segments: Vec<SegmentPattern>,
    pattern: String,
}

impl KeyMatcher {
    /// The source pattern this matcher was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True iff the full key matches the compiled pattern.
    pub fn test(&self, key: &str) -> bool {
        let segments: Vec<&str> = key.split(SEPARATOR).collect();
        segments.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(segments)
                .all(|(pattern, segment)| pattern.matches(segment))
    }
}

impl KeyPredicate for KeyMatcher {
    fn matches(&self, key: &str) -> bool {
        self.test(key)
    }
}

/// Compiles a glob pattern into a [`KeyMatcher`].
///
/// Fails with [`Error::InvalidPattern`] when the pattern cannot compile
/// (empty pattern, trailing escape); the compiler rejects rather than
/// silently degrading to literal matching.
pub fn compile(pattern: &str) -> Result<KeyMatcher> {
    if pattern.is_empty() {
        return Err(Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "empty pattern".to_string(),
        });
    }
    let segments = pattern
        .split(SEPARATOR)
        .map(|segment| SegmentPattern::compile(segment, pattern))
        .collect::<Result<Vec<_>>>()?;
    Ok(KeyMatcher {
        segments,
        pattern: pattern.to_string(),
    })
}
