//! String pattern matching for `like` / `ilike`.
//!
//! A pattern containing any regular-expression metacharacter is a regular
//! expression matched against the whole value. Anything else is a SQL-style
//! pattern: `%` matches any run of characters, `_` exactly one. Case-sensitive
//! SQL patterns whose only wildcards are a leading and/or trailing `%` skip
//! the regex engine entirely.

use regex::Regex;

use colframe_core::prelude::{Error, Result};

const REGEX_META: &[char] = &[
    '.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '^', '$', '\\',
];

#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(Regex),
}

impl Matcher {
    pub fn compile(pattern: &str, case_insensitive: bool) -> Result<Matcher> {
        if pattern.contains(REGEX_META) {
            let flags = if case_insensitive { "(?i)" } else { "" };
            return build_regex(pattern, &format!("{flags}^(?:{pattern})$"));
        }

        if !case_insensitive {
            if let Some(fast) = literal_fast_path(pattern) {
                return Ok(fast);
            }
        }

        let flags = if case_insensitive { "(?is)" } else { "(?s)" };
        build_regex(pattern, &format!("{flags}{}", like_to_regex(pattern)))
    }

    #[inline]
    pub fn is_match(&self, s: &str) -> bool {
        match self {
            Matcher::Exact(p) => s == p,
            Matcher::Prefix(p) => s.starts_with(p.as_str()),
            Matcher::Suffix(p) => s.ends_with(p.as_str()),
            Matcher::Contains(p) => s.contains(p.as_str()),
            Matcher::Regex(re) => re.is_match(s),
        }
    }
}

fn build_regex(pattern: &str, source: &str) -> Result<Matcher> {
    Regex::new(source)
        .map(Matcher::Regex)
        .map_err(|e| Error::MalformedPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

fn literal_fast_path(pattern: &str) -> Option<Matcher> {
    if pattern.contains('_') {
        return None;
    }
    let leading = pattern.starts_with('%');
    let trailing = pattern.len() > usize::from(leading) && pattern.ends_with('%');
    let start = usize::from(leading);
    let end = pattern.len() - usize::from(trailing);
    let inner = &pattern[start..end.max(start)];
    if inner.contains('%') {
        return None;
    }
    let inner = inner.to_string();
    Some(match (leading, trailing) {
        (false, false) => Matcher::Exact(inner),
        (false, true) => Matcher::Prefix(inner),
        (true, false) => Matcher::Suffix(inner),
        (true, true) => Matcher::Contains(inner),
    })
}

fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}
