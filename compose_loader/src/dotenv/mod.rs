//! Parser for `.env` and `env_file` contents.
//!
//! Each entry is `KEY=VALUE` or `KEY: VALUE`, optionally preceded by
//! `export`. Values may be single-quoted (literal), double-quoted (escapes
//! and variables expanded, may span lines) or bare (trailing ` #` comments
//! dropped, variables expanded). A line holding only `KEY` takes its value
//! from the lookup and stays unset when the lookup has none.

use thiserror::Error;

use crate::interpolation::substitute;
use crate::types::MappingWithEquals;

/// A malformed line in an environment file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// One-based line number.
    pub line: usize,
    /// What is wrong with the line.
    pub message: &'static str,
}

impl ParseError {
    const fn new(line: usize, message: &'static str) -> Self {
        Self { line, message }
    }
}

/// Parse environment file `content`.
///
/// `lookup` supplies values for bare keys and for variables that no
/// earlier entry defines.
///
/// # Errors
///
/// Returns [`ParseError`] for keys containing whitespace and for quoted
/// values that are never closed.
///
/// # Examples
///
/// ```
/// use compose_loader::dotenv::parse;
///
/// let env = parse("export HOST=db\nURL=\"postgres://${HOST}/app\" # primary\n", &|_| None).unwrap_or_default();
/// assert_eq!(env.get("URL").cloned().flatten().as_deref(), Some("postgres://db/app"));
/// ```
pub fn parse(content: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<MappingWithEquals, ParseError> {
    let mut entries = MappingWithEquals::new();
    let mut line = 1_usize;
    let mut rest = content;
    loop {
        rest = rest.trim_start_matches([' ', '\t', '\r']);
        if rest.is_empty() {
            break;
        }
        if let Some(after) = rest.strip_prefix('\n') {
            line = line.saturating_add(1);
            rest = after;
            continue;
        }
        if rest.starts_with('#') {
            rest = to_line_end(rest);
            continue;
        }
        let key_end = rest.find(['=', ':', '\n']).unwrap_or(rest.len());
        let (raw_key, after_key) = rest.split_at(key_end);
        let key = strip_export(raw_key.trim());
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(ParseError::new(line, "key cannot contain a space"));
        }
        let Some(raw_value) = after_key.strip_prefix(['=', ':']) else {
            entries.insert(key.to_owned(), lookup(key));
            rest = after_key;
            continue;
        };
        let read = read_value(raw_value.trim_start_matches([' ', '\t']), line)?;
        let value = if read.expand {
            expand(read.value, &entries, lookup)
        } else {
            read.value
        };
        entries.insert(key.to_owned(), Some(value));
        line = line.saturating_add(read.newlines);
        rest = read.rest;
    }
    Ok(entries)
}

struct ReadValue<'a> {
    value: String,
    expand: bool,
    newlines: usize,
    rest: &'a str,
}

fn read_value(text: &str, line: usize) -> Result<ReadValue<'_>, ParseError> {
    let quote = match text.chars().next() {
        Some(quote @ ('\'' | '"')) => quote,
        _ => {
            let (raw, rest) = text.split_at(text.find('\n').unwrap_or(text.len()));
            return Ok(ReadValue {
                value: strip_inline_comment(raw).trim().to_owned(),
                expand: true,
                newlines: 0,
                rest,
            });
        }
    };
    let body = text.get(1..).unwrap_or_default();
    let close = closing_quote(body, quote).ok_or_else(|| ParseError::new(line, "unterminated quoted value"))?;
    let (quoted, after) = body.split_at(close);
    let double = quote == '"';
    Ok(ReadValue {
        value: if double { unescape(quoted) } else { quoted.to_owned() },
        expand: double,
        newlines: quoted.matches('\n').count(),
        rest: to_line_end(after.get(1..).unwrap_or_default()),
    })
}

fn strip_export(key: &str) -> &str {
    key.strip_prefix("export")
        .filter(|rest| rest.starts_with([' ', '\t']))
        .map_or(key, str::trim_start)
}

fn to_line_end(text: &str) -> &str {
    text.find('\n').map_or("", |end| text.split_at(end).1)
}

fn strip_inline_comment(raw: &str) -> &str {
    [" #", "\t#"]
        .iter()
        .filter_map(|marker| raw.find(marker))
        .min()
        .map_or(raw, |end| raw.split_at(end).0)
}

fn closing_quote(body: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (position, ch) in body.char_indices() {
        match ch {
            '\\' if quote == '"' && !escaped => escaped = true,
            _ if ch == quote && !escaped => return Some(position),
            _ => escaped = false,
        }
    }
    None
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(escaped @ ('"' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn expand(value: String, entries: &MappingWithEquals, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let resolve = |name: &str| entries.get(name).cloned().flatten().or_else(|| lookup(name));
    substitute(&value, &resolve).unwrap_or(value)
}
