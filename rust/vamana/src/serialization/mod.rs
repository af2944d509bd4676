//! Text encoding for persisted graphs.
//!
//! A file is a header line followed by one record per line. Records are
//! built from three bracketed forms:
//!
//! - sequences: `<a, b, c>`
//! - tuples: `(a, b)` and node records `[a|b|c]`
//! - maps: `{(k, v), (k, v)}`
//!
//! Splitting always happens at nesting depth zero, so a sequence may appear
//! inside a tuple or a map.

mod version;

pub use version::{SerializationVersion, CURRENT_VERSION};

use crate::index::traits::GraphError;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

/// First token of every graph file.
pub const FORMAT_TAG: &str = "vamana-graph";

/// Errors that can occur during serialization.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(SerializationVersion),

    #[error("Malformed {field}: {message}")]
    Parse { field: &'static str, message: String },

    #[error("Inconsistent data: {0}")]
    Inconsistent(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Result type for serialization operations.
pub type SerializationResult<T> = Result<T, SerializationError>;

fn parse_error(field: &'static str, message: impl Into<String>) -> SerializationError {
    SerializationError::Parse {
        field,
        message: message.into(),
    }
}

/// Write the header line.
pub fn write_header<W: Write>(writer: &mut W) -> SerializationResult<()> {
    writeln!(writer, "{FORMAT_TAG} {CURRENT_VERSION}")?;
    Ok(())
}

/// Check a header line and return its version.
pub fn parse_header(line: &str) -> SerializationResult<SerializationVersion> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some(FORMAT_TAG) {
        return Err(SerializationError::InvalidHeader(format!(
            "expected '{FORMAT_TAG}', got '{line}'"
        )));
    }
    let version: SerializationVersion = parts
        .next()
        .ok_or_else(|| SerializationError::InvalidHeader("missing version".into()))?
        .parse()?;
    if !version.is_compatible(CURRENT_VERSION) {
        return Err(SerializationError::UnsupportedVersion(version));
    }
    Ok(version)
}

/// Line source that skips blank lines and names the record it expected
/// when the input ends early.
pub struct RecordReader<R> {
    lines: io::Lines<R>,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    pub fn next_record(&mut self, field: &'static str) -> SerializationResult<String> {
        for line in self.lines.by_ref() {
            let line = line?;
            if !line.trim().is_empty() {
                return Ok(line);
            }
        }
        Err(parse_error(field, "unexpected end of input"))
    }
}

/// `<a, b, c>`.
pub fn format_sequence<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    let body: Vec<String> = items.into_iter().map(|x| x.to_string()).collect();
    format!("<{}>", body.join(", "))
}

/// Strip the `open`/`close` pair around `s`.
pub fn strip_enclosed<'a>(
    s: &'a str,
    open: char,
    close: char,
    field: &'static str,
) -> SerializationResult<&'a str> {
    s.trim()
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .ok_or_else(|| parse_error(field, format!("expected {open}...{close}, got '{s}'")))
}

/// Split `s` on `sep` wherever no bracket is open. An all-blank input
/// yields no parts.
pub fn split_top_level<'a>(s: &'a str, sep: char, field: &'static str) -> SerializationResult<Vec<&'a str>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut begin = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '<' | '[' | '(' | '{' => depth += 1,
            '>' | ']' | ')' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(parse_error(field, format!("unbalanced '{ch}'")));
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(s[begin..i].trim());
                begin = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(parse_error(field, "unbalanced brackets"));
    }
    parts.push(s[begin..].trim());
    Ok(parts)
}

/// Parse one scalar.
pub fn parse_value<X: FromStr>(s: &str, field: &'static str) -> SerializationResult<X> {
    s.trim()
        .parse()
        .map_err(|_| parse_error(field, format!("cannot parse '{}'", s.trim())))
}

/// Parse `<a, b, c>`.
pub fn parse_sequence<X: FromStr>(s: &str, field: &'static str) -> SerializationResult<Vec<X>> {
    let body = strip_enclosed(s, '<', '>', field)?;
    split_top_level(body, ',', field)?
        .into_iter()
        .map(|part| parse_value(part, field))
        .collect()
}

/// Split `{(k, v), ...}` into raw key/value pairs.
pub fn parse_entries<'a>(s: &'a str, field: &'static str) -> SerializationResult<Vec<(&'a str, &'a str)>> {
    let body = strip_enclosed(s, '{', '}', field)?;
    split_top_level(body, ',', field)?
        .into_iter()
        .map(|entry| {
            let pair = strip_enclosed(entry, '(', ')', field)?;
            match split_top_level(pair, ',', field)?.as_slice() {
                [k, v] => Ok((*k, *v)),
                _ => Err(parse_error(field, format!("expected (key, value), got '{entry}'"))),
            }
        })
        .collect()
}
