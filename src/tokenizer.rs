use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // A whole inline hyperlink, label captured
    static ref ANCHOR_RE: Regex =
        Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").expect("anchor pattern is valid");
}

/// How hyperlink markup is split into reveal tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkTokens {
    /// An `<a ...>...</a>` span, plus any punctuation glued to it, is one token.
    #[default]
    Atomic,
    /// Plain whitespace splitting, markup included.
    Whitespace,
}

/// Splits `text` into reveal tokens borrowed from it.
pub fn tokens(text: &str, mode: LinkTokens) -> Vec<&str> {
    match mode {
        LinkTokens::Whitespace => text.split_whitespace().collect(),
        LinkTokens::Atomic => atomic_tokens(text),
    }
}

pub fn word_count(text: &str, mode: LinkTokens) -> usize {
    match mode {
        LinkTokens::Whitespace => text.split_whitespace().count(),
        LinkTokens::Atomic => atomic_tokens(text).len(),
    }
}

fn atomic_tokens(text: &str) -> Vec<&str> {
    let mut links = ANCHOR_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .peekable();
    let mut chars = text.char_indices().peekable();
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    while let Some((idx, ch)) = chars.next() {
        if let Some(&(link_start, link_end)) = links.peek() {
            if idx == link_start {
                // Whitespace inside the link never splits it
                start.get_or_insert(idx);
                while let Some(&(next_idx, _)) = chars.peek() {
                    if next_idx >= link_end {
                        break;
                    }
                    chars.next();
                }
                links.next();
                continue;
            }
        }

        if ch.is_whitespace() {
            if let Some(token_start) = start.take() {
                tokens.push(&text[token_start..idx]);
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }

    if let Some(token_start) = start {
        tokens.push(&text[token_start..]);
    }
    tokens
}

/// Replaces every hyperlink with its label.
pub fn strip_links(text: &str) -> Cow<'_, str> {
    ANCHOR_RE.replace_all(text, "$1")
}

/// A run of plain text or a whole hyperlink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    Text(&'a str),
    Link(&'a str),
}

pub fn fragments(text: &str) -> Vec<Fragment<'_>> {
    let mut fragments = Vec::new();
    let mut cursor = 0;
    for link in ANCHOR_RE.find_iter(text) {
        if link.start() > cursor {
            fragments.push(Fragment::Text(&text[cursor..link.start()]));
        }
        fragments.push(Fragment::Link(link.as_str()));
        cursor = link.end();
    }
    if cursor < text.len() {
        fragments.push(Fragment::Text(&text[cursor..]));
    }
    fragments
}
