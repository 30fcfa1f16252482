//! Reader and writer for generated `trait.<Name>.js` implementor scripts.
//!
//! Each script builds a package-keyed table and hands it to the page's
//! registration hook. Two generator styles are accepted:
//!
//! ```text
//! (function() {var implementors = {};
//! implementors["pkg"] = [{text:"…",synthetic:false,types:["pkg::T"]},];
//! …
//! ```
//!
//! and the object-literal form `var implementors = {"pkg":[{…}]};`. Only the
//! literal data is interpreted; the surrounding shim is recognized and skipped.

use crate::index::identity::PackageName;
use crate::index::model::{ImplementorRecord, PackageGroups};
use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Map, Number, Value};
use std::fmt::Write as _;

const TABLE_IDENT: &str = "implementors";

const REGISTRATION_TRAILER: &str = "
            if (window.register_implementors) {
                window.register_implementors(implementors);
            } else {
                window.pending_implementors = implementors;
            }

})()";

/// Parse one implementor script into ordered package groups.
///
/// A repeated `implementors["pkg"] = …` replaces the earlier value but keeps
/// the package's first position, the same outcome the script has when run.
pub fn parse_script(source: &str) -> Result<PackageGroups> {
    let mut groups = PackageGroups::new();
    let mut cursor = Cursor::new(source);

    while let Some(at) = cursor.find_ident(TABLE_IDENT) {
        let declared = source[..at].trim_end().ends_with("var");
        cursor.skip_trivia();
        match cursor.peek() {
            Some('[') => {
                cursor.bump();
                cursor.skip_trivia();
                let package = cursor.parse_string()?;
                cursor.expect(']')?;
                cursor.expect('=')?;
                let value = cursor.parse_value()?;
                let records = records_from_value(value)
                    .with_context(|| format!("records for package {package} {}", cursor.location()))?;
                groups.insert(PackageName(package), records);
            }
            Some('=') if declared => {
                cursor.bump();
                cursor.skip_trivia();
                for (package, value) in cursor.parse_object_entries()? {
                    let records = records_from_value(value)
                        .with_context(|| format!("records for package {package}"))?;
                    groups.insert(PackageName(package), records);
                }
            }
            _ => {}
        }
    }

    Ok(groups)
}

/// Render package groups back into the generator's script format.
pub fn render_script(groups: &PackageGroups) -> String {
    let mut out = String::from("(function() {var implementors = {};\n");
    for (package, records) in groups.iter() {
        let _ = write!(out, "implementors[{}] = [", js_string(&package.0));
        for record in records {
            out.push_str("{text:");
            out.push_str(&js_string(&record.text));
            let _ = write!(out, ",synthetic:{}", record.synthetic);
            out.push_str(",types:[");
            let types: Vec<String> = record.types.iter().map(|ty| js_string(&ty.0)).collect();
            out.push_str(&types.join(","));
            out.push_str("]},");
        }
        out.push_str("];\n");
    }
    out.push_str(REGISTRATION_TRAILER);
    out
}

fn records_from_value(value: Value) -> Result<Vec<ImplementorRecord>> {
    if !value.is_array() {
        bail!("expected an array of records");
    }
    serde_json::from_value(value).context("malformed implementor record")
}

fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn location(&self) -> String {
        let consumed = &self.src[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rsplit('\n')
            .next()
            .map(|tail| tail.chars().count() + 1)
            .unwrap_or(1);
        format!("at line {line}, column {column}")
    }

    fn error(&self, message: impl std::fmt::Display) -> anyhow::Error {
        anyhow!("{message} {}", self.location())
    }

    /// Advance past the next standalone occurrence of `ident`, returning its offset.
    ///
    /// Occurrences inside comments and string literals do not count.
    fn find_ident(&mut self, ident: &str) -> Option<usize> {
        loop {
            let rest = self.rest();
            if rest.starts_with("//") || rest.starts_with("/*") {
                self.skip_trivia();
                continue;
            }
            match self.peek() {
                None => return None,
                Some(quote @ ('"' | '\'')) => self.skip_string(quote),
                Some(_) if rest.starts_with(ident) => {
                    let at = self.pos;
                    let end = at + ident.len();
                    let before = self.src[..at].chars().next_back();
                    let after = self.src[end..].chars().next();
                    self.pos = end;
                    if !before.is_some_and(is_ident_char)
                        && before != Some('.')
                        && !after.is_some_and(is_ident_char)
                    {
                        return Some(at);
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Step over a string literal without decoding it; stops at end of line
    /// if the literal is never closed.
    fn skip_string(&mut self, quote: char) {
        self.bump();
        while let Some(ch) = self.bump() {
            match ch {
                '\\' => {
                    self.bump();
                }
                '\n' => return,
                ch if ch == quote => return,
                _ => {}
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if let Some(comment) = trimmed.strip_prefix("//") {
                let skip = comment.find('\n').map(|i| i + 1).unwrap_or(comment.len());
                self.pos += 2 + skip;
            } else if let Some(comment) = trimmed.strip_prefix("/*") {
                let skip = comment.find("*/").map(|i| i + 2).unwrap_or(comment.len());
                self.pos += 2 + skip;
            } else {
                return;
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        self.skip_trivia();
        match self.peek() {
            Some(ch) if ch == want => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{want}', found '{ch}'"))),
            None => Err(self.error(format!("expected '{want}', found end of input"))),
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_trivia();
        match self.peek() {
            Some('"') | Some('\'') => self.parse_string().map(Value::String),
            Some('[') => self.parse_array(),
            Some('{') => {
                let entries = self.parse_object_entries()?;
                Ok(Value::Object(entries.into_iter().collect::<Map<_, _>>()))
            }
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.parse_number(),
            Some(ch) if is_ident_char(ch) => match self.parse_ident().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" | "undefined" => Ok(Value::Null),
                other => Err(self.error(format!("unsupported identifier '{other}'"))),
            },
            Some(ch) => Err(self.error(format!("unexpected '{ch}'"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(ch) => return Err(self.error(format!("expected ',' or ']', found '{ch}'"))),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    /// Object literal entries in source order; keys may be bare or quoted.
    fn parse_object_entries(&mut self) -> Result<Vec<(String, Value)>> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_trivia();
            let key = match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(entries);
                }
                Some('"') | Some('\'') => self.parse_string()?,
                Some(ch) if is_ident_char(ch) => self.parse_ident(),
                Some(ch) => return Err(self.error(format!("unexpected '{ch}' in object"))),
                None => return Err(self.error("unterminated object")),
            };
            self.expect(':')?;
            let value = self.parse_value()?;
            entries.push((key, value));
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(entries),
                Some(ch) => return Err(self.error(format!("expected ',' or '}}', found '{ch}'"))),
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn parse_ident(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .find(|ch: char| !is_ident_char(ch))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    fn parse_number(&mut self) -> Result<Value> {
        let rest = self.rest();
        let len = rest
            .find(|ch: char| !(ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E')))
            .unwrap_or(rest.len());
        let raw = &rest[..len];
        let number = raw
            .parse::<i64>()
            .map(Number::from)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64))
            .ok_or_else(|| self.error(format!("invalid number '{raw}'")))?;
        self.pos += len;
        Ok(Value::Number(number))
    }

    fn parse_string(&mut self) -> Result<String> {
        self.skip_trivia();
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            Some(ch) => return Err(self.error(format!("expected string, found '{ch}'"))),
            None => return Err(self.error("expected string, found end of input")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => self.parse_escape(&mut out)?,
                Some(ch) => out.push(ch),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<()> {
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('0') => out.push('\0'),
            Some('\n') => {}
            Some('u') => {
                let unit = self.parse_hex4()?;
                if (0xD800..0xDC00).contains(&unit) && self.rest().starts_with("\\u") {
                    let second = self.pos;
                    self.pos += 2;
                    let low = self.parse_hex4()?;
                    if (0xDC00..0xE000).contains(&low) {
                        let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                        out.push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
                    } else {
                        // Unpaired high surrogate; the next escape decodes on its own.
                        out.push(char::REPLACEMENT_CHARACTER);
                        self.pos = second;
                    }
                } else {
                    out.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
            }
            Some(other) => out.push(other),
            None => return Err(self.error("unterminated escape")),
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let rest = self.rest();
        let digits = rest
            .get(..4)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid \\u escape"))?;
        let unit = u32::from_str_radix(digits, 16).map_err(|err| self.error(err))?;
        self.pos += 4;
        Ok(unit)
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}
