//! One-line text form of a strategy:
//!
//! ```text
//! <sequence>, <timestamp>, <actor>: <Tag>("p1", "p2", ...)
//! ```
//!
//! Parameters are double-quoted with `\` and `"` backslash-escaped (newlines as
//! `\n`), and padded with empty strings to at least two.

use super::{Strategy, StrategyKind};
use crate::domain::{LedgerError, TimestampUtc};
use regex::Regex;
use std::sync::OnceLock;

const MIN_PARAMS: usize = 2;

fn header() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"^\s*([1-9][0-9]*)\s*,\s*(.+?)\s*,\s*([^\s:,]+)\s*:\s*([A-Za-z]+)\s*\((.*)\)\s*$")
            .expect("regex to split a strategy line into header fields")
    })
}

fn param_list() -> &'static Regex {
    static PARAM_LIST: OnceLock<Regex> = OnceLock::new();
    PARAM_LIST.get_or_init(|| {
        Regex::new(r#"^\s*(?:"(?:[^"\\]|\\.)*"\s*(?:,\s*"(?:[^"\\]|\\.)*"\s*)*)?$"#)
            .expect("regex to validate a quoted parameter list")
    })
}

fn param() -> &'static Regex {
    static PARAM: OnceLock<Regex> = OnceLock::new();
    PARAM.get_or_init(|| {
        Regex::new(r#""((?:[^"\\]|\\.)*)""#)
            .expect("regex to extract one quoted parameter")
    })
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

pub fn encode(strategy: &Strategy) -> String {
    let mut params = strategy.kind.params();
    while params.len() < MIN_PARAMS {
        params.push(String::new());
    }
    let params = params
        .iter()
        .map(|p| format!("\"{}\"", escape(p)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{}, {}, {}: {}({})",
        strategy.sequence,
        strategy.when.to_log_string(),
        strategy.actor,
        strategy.kind.tag(),
        params
    )
}

/// Splits the quoted parameter list of a log line.
pub fn decode_params(text: &str) -> Result<Vec<String>, LedgerError> {
    if !param_list().is_match(text) {
        return Err(LedgerError::codec(format!(
            "malformed parameter list: ({})",
            text
        )));
    }
    Ok(param()
        .captures_iter(text)
        .map(|caps| caps.get(1).map_or(String::new(), |m| unescape(m.as_str())))
        .collect())
}

pub fn decode(line: &str) -> Result<Strategy, LedgerError> {
    let caps = header()
        .captures(line)
        .ok_or_else(|| LedgerError::codec(format!("malformed strategy line: {}", line.trim())))?;
    let field = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    let sequence: u64 = field(1)
        .parse()
        .map_err(|_| LedgerError::codec(format!("bad sequence number: {}", field(1))))?;
    let when = TimestampUtc::parse_log(field(2))
        .ok_or_else(|| LedgerError::codec(format!("bad timestamp: {}", field(2))))?;
    let params = decode_params(field(5))?;
    let kind = StrategyKind::from_params(field(4), &params)?;
    Ok(Strategy::new(sequence, when, field(3), kind))
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
