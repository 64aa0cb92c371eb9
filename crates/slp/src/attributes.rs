// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed attribute lists and their RFC 2608 Sec.5 string form.
//!
//! An attribute is either a keyword (tag present, no values) or a tag with
//! one or more typed values: string, integer, boolean or opaque bytes.
//! Tags are case-insensitive; insertion order is preserved.
//!
//! Wire form: `(tag=value),(tag=v1,v2),keyword`. Reserved characters in
//! tags and values are `\xx` hex-escaped; opaque values carry the `\FF`
//! marker prefix.

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Boolean(bool),
    Integer(i32),
    String(String),
    Opaque(Vec<u8>),
}

impl AttrValue {
    /// Equality as used by deregistration and filters: strings compare
    /// case-insensitively, everything else exactly.
    pub fn matches(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::String(a), AttrValue::String(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => a == b,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Boolean(b) => write!(f, "{}", b),
            AttrValue::Integer(i) => write!(f, "{}", i),
            AttrValue::String(s) => f.write_str(&escape(s)),
            AttrValue::Opaque(bytes) => {
                f.write_str("\\FF")?;
                for b in bytes {
                    write!(f, "\\{:02X}", b)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
struct AttrEntry {
    /// Original-case tag; comparisons fold case.
    tag: String,
    /// Empty for keyword attributes.
    values: Vec<AttrValue>,
}

/// An ordered, case-insensitively keyed attribute list.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<AttrEntry>,
}

/// Attribute list string that does not follow the RFC 2608 Sec.5 grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributesError(pub String);

impl std::fmt::Display for AttributesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed attribute list: {}", self.0)
    }
}

impl std::error::Error for AttributesError {}

impl Attributes {
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse the wire string form, e.g. `(color=true),(ppm=10),public`.
    /// An empty or all-whitespace string parses to the empty list.
    pub fn parse(input: &str) -> Result<Self, AttributesError> {
        let mut attrs = Attributes::none();
        let mut cursor = Cursor::new(input.trim());
        loop {
            cursor.skip_whitespace();
            if cursor.at_end() {
                return Ok(attrs);
            }
            if cursor.peek() == Some('(') {
                cursor.advance();
                let tag = cursor.read_until(&['='])?;
                let tag = tag.trim();
                if tag.is_empty() {
                    return Err(AttributesError("empty tag".into()));
                }
                cursor.expect('=')?;
                loop {
                    let raw = cursor.read_raw_value();
                    attrs.add_value(tag, classify_value(raw.trim())?);
                    match cursor.peek() {
                        Some(',') => {
                            cursor.advance();
                        }
                        Some(')') => break,
                        _ => return Err(AttributesError("unterminated value list".into())),
                    }
                }
                cursor.expect(')')?;
            } else {
                let tag = cursor.read_until(&[','])?;
                let tag = tag.trim();
                if tag.is_empty() {
                    return Err(AttributesError("empty keyword".into()));
                }
                attrs.add_keyword(tag);
            }
            cursor.skip_whitespace();
            match cursor.peek() {
                None => return Ok(attrs),
                Some(',') => {
                    cursor.advance();
                }
                Some(c) => {
                    return Err(AttributesError(format!("unexpected character '{}'", c)));
                }
            }
        }
    }

    /// Add a keyword attribute (tag present, no values).
    pub fn add_keyword(&mut self, tag: &str) {
        if self.entry_index(tag).is_none() {
            self.entries.push(AttrEntry {
                tag: tag.to_string(),
                values: Vec::new(),
            });
        }
    }

    /// Append a value to a tag, creating the tag when absent. Duplicate
    /// values for a tag are kept only once.
    pub fn add_value(&mut self, tag: &str, value: AttrValue) {
        match self.entry_index(tag) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                if !entry.values.iter().any(|v| v.matches(&value)) {
                    entry.values.push(value);
                }
            }
            None => self.entries.push(AttrEntry {
                tag: tag.to_string(),
                values: vec![value],
            }),
        }
    }

    /// Union with `other`; on tag conflict the entry from `other` wins and
    /// keeps this list's position. New tags append in `other`'s order.
    pub fn merge(&self, other: &Attributes) -> Attributes {
        let mut merged = self.clone();
        for entry in &other.entries {
            match merged.entry_index(&entry.tag) {
                Some(idx) => merged.entries[idx] = entry.clone(),
                None => merged.entries.push(entry.clone()),
            }
        }
        merged
    }

    /// Remove from this list whatever `other` names: a keyword entry in
    /// `other` removes the whole tag; a valued entry removes only those
    /// values, dropping the tag once no values remain.
    pub fn unmerge(&self, other: &Attributes) -> Attributes {
        let mut result = self.clone();
        for entry in &other.entries {
            let Some(idx) = result.entry_index(&entry.tag) else {
                continue;
            };
            if entry.values.is_empty() {
                result.entries.remove(idx);
            } else {
                let kept = &mut result.entries[idx];
                kept.values
                    .retain(|v| !entry.values.iter().any(|rm| rm.matches(v)));
                if kept.values.is_empty() {
                    result.entries.remove(idx);
                }
            }
        }
        result
    }

    /// Values of a tag; `Some(&[])` for a keyword attribute.
    pub fn get(&self, tag: &str) -> Option<&[AttrValue]> {
        self.entry_index(tag)
            .map(|idx| self.entries[idx].values.as_slice())
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.entry_index(tag).is_some()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.tag.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry_index(&self, tag: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.tag.eq_ignore_ascii_case(tag))
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|e| {
                other
                    .get(&e.tag)
                    .is_some_and(|values| values == e.values.as_slice())
            })
    }
}

impl std::fmt::Display for Attributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if entry.values.is_empty() {
                f.write_str(&escape(&entry.tag))?;
            } else {
                write!(f, "({}=", escape(&entry.tag))?;
                for (j, value) in entry.values.iter().enumerate() {
                    if j > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str(")")?;
            }
        }
        Ok(())
    }
}

/// Characters that must be hex-escaped in tags and string values.
const RESERVED: &[char] = &['(', ')', ',', '\\', '!', '<', '=', '>', '~'];

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if RESERVED.contains(&c) || c.is_control() {
            out.push_str(&format!("\\{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String, AttributesError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let hi = chars.next();
            let lo = chars.next();
            match (hi, lo) {
                (Some(hi), Some(lo)) => {
                    let byte = hex_pair(hi, lo)
                        .ok_or_else(|| AttributesError(format!("bad escape \\{}{}", hi, lo)))?;
                    out.push(byte as char);
                }
                _ => return Err(AttributesError("truncated escape".into())),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn hex_pair(hi: char, lo: char) -> Option<u8> {
    let hi = hi.to_digit(16)?;
    let lo = lo.to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Type a raw (still escaped) value string per RFC 2608 Sec.5.
fn classify_value(raw: &str) -> Result<AttrValue, AttributesError> {
    if raw.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("\\ff")) {
        let mut bytes = Vec::new();
        let mut chars = raw[3..].chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                return Err(AttributesError("opaque value with unescaped byte".into()));
            }
            let (hi, lo) = match (chars.next(), chars.next()) {
                (Some(hi), Some(lo)) => (hi, lo),
                _ => return Err(AttributesError("truncated opaque escape".into())),
            };
            let byte =
                hex_pair(hi, lo).ok_or_else(|| AttributesError("bad opaque escape".into()))?;
            bytes.push(byte);
        }
        return Ok(AttrValue::Opaque(bytes));
    }

    let text = unescape(raw)?;
    if text.eq_ignore_ascii_case("true") {
        return Ok(AttrValue::Boolean(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(AttrValue::Boolean(false));
    }
    if let Ok(int) = text.parse::<i32>() {
        return Ok(AttrValue::Integer(int));
    }
    Ok(AttrValue::String(text))
}

/// Character cursor over the attribute list string.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), AttributesError> {
        match self.advance() {
            Some(c) if c == wanted => Ok(()),
            other => Err(AttributesError(format!(
                "expected '{}', found {:?}",
                wanted, other
            ))),
        }
    }

    /// Read up to (not including) any of `stops` or end of input,
    /// unescaping as it goes.
    fn read_until(&mut self, stops: &[char]) -> Result<String, AttributesError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stops.contains(&c) {
                break;
            }
            if c == '\\' {
                self.advance();
                self.advance();
                self.advance();
            } else {
                self.advance();
            }
        }
        unescape(&self.input[start..self.pos])
    }

    /// Read a raw (still escaped) value, stopping at an unescaped ','
    /// or ')'. The escaped form is kept so opaque markers survive.
    fn read_raw_value(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                ',' | ')' => break,
                '\\' => {
                    self.advance();
                    self.advance();
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
        &self.input[start..self.pos]
    }
}
