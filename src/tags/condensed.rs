//! Condensed tag expressions.
//!
//! Grammar, after all whitespace is stripped:
//!
//! ```text
//! expr      := component ("," component)*
//! component := atom ( ("::" | ".") atom )*
//! atom      := NAME | "{" expr "}"
//! ```
//!
//! `::` nests strictly (only the deepest chain is produced), `.` nests
//! accumulating (every prefix chain is produced as well), and a brace group
//! distributes the chain in front of it over each of its components:
//!
//! - `a.b`      => `a`, `a::b`
//! - `a::b`     => `a::b`
//! - `a.{b,c}`  => `a`, `a::b`, `a::c`
//! - `a::{b,c}` => `a::b`, `a::c`

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

/// Set of canonical tag identifiers, sorted so iteration is deterministic.
pub type TagSet = BTreeSet<String>;

pub const SEPARATOR: &str = "::";

static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("segment pattern is a valid regex")
});

static CANONICAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+(?:::[A-Za-z0-9_-]+)*$")
        .expect("canonical tag pattern is a valid regex")
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CondensedTagsError {
    #[error("unbalanced braces")]
    UnbalancedBraces,
    #[error("empty component between commas")]
    EmptyComponent,
    #[error("expression starts with a separator")]
    LeadingSeparator,
    #[error("expression ends with a separator")]
    TrailingSeparator,
    #[error("two separators in a row")]
    AdjacentSeparators,
    #[error("a brace group must be the last atom of its component")]
    NestingAfterGroup,
    #[error("missing `::` or `.` before `{{`")]
    MissingSeparatorBeforeGroup,
    #[error("invalid tag segment {0:?}")]
    InvalidSegment(String),
}

/// True for identifiers of the form `seg(::seg)*`.
pub fn is_canonical_tag(tag: &str) -> bool {
    CANONICAL_RE.is_match(tag)
}

/// Expand a condensed tag expression into canonical tag identifiers.
pub fn parse(text: &str) -> Result<TagSet, CondensedTagsError> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let tokens = tokenize(&stripped)?;
    let chains = expand_expr(&tokens)?;
    Ok(chains.into_iter().map(|chain| chain.join(SEPARATOR)).collect())
}

type Chain = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Comma,
    Text(&'a str),
}

/// Split on the structural delimiters, keeping them as tokens.
fn tokenize(text: &str) -> Result<Vec<Token<'_>>, CondensedTagsError> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (idx, ch) in text.char_indices() {
        let delim = match ch {
            '{' => Token::Open,
            '}' => Token::Close,
            ',' => Token::Comma,
            _ => continue,
        };
        if start < idx {
            tokens.push(Token::Text(&text[start..idx]));
        }
        match delim {
            Token::Open => depth += 1,
            Token::Close => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(CondensedTagsError::UnbalancedBraces)?;
            }
            _ => {}
        }
        tokens.push(delim);
        start = idx + ch.len_utf8();
    }
    if start < text.len() {
        tokens.push(Token::Text(&text[start..]));
    }

    if depth != 0 {
        return Err(CondensedTagsError::UnbalancedBraces);
    }
    Ok(tokens)
}

fn expand_expr(tokens: &[Token<'_>]) -> Result<BTreeSet<Chain>, CondensedTagsError> {
    let mut out = BTreeSet::new();
    if tokens.is_empty() {
        return Ok(out);
    }
    for component in split_top_level(tokens) {
        if component.is_empty() {
            return Err(CondensedTagsError::EmptyComponent);
        }
        out.extend(expand_component(component)?);
    }
    Ok(out)
}

/// Split along commas at brace depth zero.
fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match token {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                parts.push(&tokens[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

fn expand_component(tokens: &[Token<'_>]) -> Result<BTreeSet<Chain>, CondensedTagsError> {
    let Some(open) = tokens.iter().position(|t| *t == Token::Open) else {
        // No brace group: a flat chain is a single text token.
        return match tokens {
            [Token::Text(text)] => Ok(expand_chain(text)?.chains),
            _ => Err(CondensedTagsError::EmptyComponent),
        };
    };

    let close = matching_close(tokens, open).ok_or(CondensedTagsError::UnbalancedBraces)?;
    if close + 1 != tokens.len() {
        return Err(CondensedTagsError::NestingAfterGroup);
    }
    let inner = expand_expr(&tokens[open + 1..close])?;

    match &tokens[..open] {
        [] => Ok(inner),
        [Token::Text(prefix)] => {
            let (head, strict) = if let Some(head) = prefix.strip_suffix(SEPARATOR) {
                (head, true)
            } else if let Some(head) = prefix.strip_suffix('.') {
                (head, false)
            } else {
                return Err(CondensedTagsError::MissingSeparatorBeforeGroup);
            };
            if head.is_empty() {
                return Err(CondensedTagsError::LeadingSeparator);
            }

            let Expansion { mut chains, deepest } = expand_chain(head)?;
            if strict {
                chains.remove(&deepest);
            }
            for tail in inner {
                let mut chain = deepest.clone();
                chain.extend(tail);
                chains.insert(chain);
            }
            Ok(chains)
        }
        _ => Err(CondensedTagsError::NestingAfterGroup),
    }
}

fn matching_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nesting {
    Strict,
    Accumulate,
}

#[derive(Debug)]
struct Expansion {
    chains: BTreeSet<Chain>,
    deepest: Chain,
}

/// Expand a brace-free chain such as `a.b::c`.
fn expand_chain(text: &str) -> Result<Expansion, CondensedTagsError> {
    let mut prefix: Chain = Vec::new();
    let mut chains = BTreeSet::new();
    let mut after_separator = false;
    let mut rest = text;

    loop {
        let cut = rest
            .find(|c: char| c == '.' || c == ':')
            .map(|idx| match &rest[idx..] {
                r if r.starts_with(SEPARATOR) => (idx, Some(Nesting::Strict), SEPARATOR.len()),
                r if r.starts_with('.') => (idx, Some(Nesting::Accumulate), 1),
                // A lone ':' stays inside the name and fails validation below.
                _ => (rest.len(), None, 0),
            })
            .unwrap_or((rest.len(), None, 0));
        let (end, nesting, width) = cut;
        let name = &rest[..end];

        if name.is_empty() {
            return Err(match (after_separator, nesting) {
                (false, _) => CondensedTagsError::LeadingSeparator,
                (true, Some(_)) => CondensedTagsError::AdjacentSeparators,
                (true, None) => CondensedTagsError::TrailingSeparator,
            });
        }
        if !SEGMENT_RE.is_match(name) {
            return Err(CondensedTagsError::InvalidSegment(name.to_string()));
        }

        let mut chain = prefix.clone();
        chain.push(name.to_string());
        chains.insert(chain.clone());

        match nesting {
            None => {
                return Ok(Expansion {
                    chains,
                    deepest: chain,
                });
            }
            Some(Nesting::Strict) => {
                chains.remove(&chain);
            }
            Some(Nesting::Accumulate) => {}
        }
        prefix.push(name.to_string());
        after_separator = true;
        rest = &rest[end + width..];
    }
}
