//! Annotation term parsing and classification.
//!
//! Every token position in an annotated document carries a bundle of terms.
//! A term is a plain string, optionally followed by `$` and a typed payload
//! suffix, e.g. `<>:s$<i>0<i>5<i>5<b>0`. Payload fields are written as
//! `<b>` (one byte), `<s>` (two bytes) or `<i>` (four bytes) followed by a
//! decimal value; multi-byte fields are little-endian.
//!
//! The term prefix decides how the payload is interpreted:
//!
//! | prefix | meaning          | payload                                      |
//! |--------|------------------|----------------------------------------------|
//! | `<>:`  | element          | `<i>charStart <i>charEnd <i>end <b>depth`    |
//! | `>:`   | relation source  | `<b>flags <i>end <i>targetStart <i>targetEnd`|
//! | `<:`   | relation target  | `<b>flags <i>end <i>sourceStart <i>sourceEnd`|
//! | `@:`   | attribute        | `<b>depth` (optional, defaults to 0)         |
//! | `_N`   | token offsets    | `<i>charStart <i>charEnd`                    |
//! | other  | plain term       | none                                         |

use crate::error::{Error, Result};

/// Prefix marking an element (markup span) term.
pub const ELEMENT_PREFIX: &str = "<>:";
/// Prefix marking the source anchor of a relation edge.
pub const REL_SOURCE_PREFIX: &str = ">:";
/// Prefix marking the target anchor of a relation edge.
pub const REL_TARGET_PREFIX: &str = "<:";
/// Prefix marking an attribute term.
pub const ATTRIBUTE_PREFIX: &str = "@:";
/// Prefix marking a token offset term.
pub const POSITION_PREFIX: &str = "_";

/// Decoded payload of an element term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementPayload {
    pub char_start: u32,
    pub char_end: u32,
    /// End position of the element, exclusive.
    pub end: u32,
    /// Nesting depth among same-name elements, 0 for the outermost.
    pub depth: u8,
}

/// Decoded payload of a relation term (either anchor side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationPayload {
    pub flags: u8,
    /// End position of the anchored side, exclusive.
    pub end: u32,
    pub counterpart_start: u32,
    pub counterpart_end: u32,
}

/// Category of an annotation term, decided by prefix and payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    /// Ordinary token term with no payload.
    Plain,
    Element(ElementPayload),
    RelationSource(RelationPayload),
    RelationTarget(RelationPayload),
    Attribute { depth: u8 },
    /// Token offset carrier `_N`; `token` is the position it describes.
    Position {
        token: u32,
        char_start: u32,
        char_end: u32,
    },
}

/// A parsed annotation term: indexable text plus its decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiTerm {
    /// Term text as it goes into the inverted index (payload stripped).
    pub text: String,
    pub payload: Vec<u8>,
    pub kind: TermKind,
}

impl MultiTerm {
    /// Parse a raw annotation term. The payload suffix starts at the first
    /// `$<` sequence, so `$` inside a term value does not need escaping.
    pub fn parse(raw: &str) -> Result<Self> {
        let (text, payload) = match raw.find("$<") {
            Some(at) => (&raw[..at], parse_payload(raw, &raw[at + 1..])?),
            None => (raw, Vec::new()),
        };
        if text.is_empty() {
            return Err(Error::corpus_data(format!("Empty term in '{raw}'")));
        }
        let kind = classify(text, &payload)?;
        Ok(Self {
            text: text.to_string(),
            payload,
            kind,
        })
    }

    /// Name part of an element, attribute, or relation term (prefix stripped).
    /// Returns the full text for plain and position terms.
    pub fn name(&self) -> &str {
        for prefix in [
            ELEMENT_PREFIX,
            ATTRIBUTE_PREFIX,
            REL_SOURCE_PREFIX,
            REL_TARGET_PREFIX,
        ] {
            if let Some(rest) = self.text.strip_prefix(prefix) {
                return rest;
            }
        }
        &self.text
    }
}

fn parse_payload(term: &str, mut rest: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    while !rest.is_empty() {
        let (width, tail) = if let Some(t) = rest.strip_prefix("<b>") {
            (1usize, t)
        } else if let Some(t) = rest.strip_prefix("<s>") {
            (2, t)
        } else if let Some(t) = rest.strip_prefix("<i>") {
            (4, t)
        } else {
            return Err(Error::corpus_data(format!(
                "Malformed payload in term '{term}' near '{rest}'"
            )));
        };
        let digits = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        if digits == 0 {
            return Err(Error::corpus_data(format!(
                "Payload field without value in term '{term}'"
            )));
        }
        let value: u64 = tail[..digits].parse().map_err(|_| {
            Error::corpus_data(format!("Payload value out of range in term '{term}'"))
        })?;
        let max = match width {
            1 => u8::MAX as u64,
            2 => u16::MAX as u64,
            _ => u32::MAX as u64,
        };
        if value > max {
            return Err(Error::corpus_data(format!(
                "Payload value {value} exceeds {width}-byte field in term '{term}'"
            )));
        }
        match width {
            1 => out.push(value as u8),
            2 => out.extend_from_slice(&(value as u16).to_le_bytes()),
            _ => out.extend_from_slice(&(value as u32).to_le_bytes()),
        }
        rest = &tail[digits..];
    }
    Ok(out)
}

fn classify(text: &str, payload: &[u8]) -> Result<TermKind> {
    if let Some(name) = text.strip_prefix(ELEMENT_PREFIX) {
        if name.is_empty() {
            return Err(Error::corpus_data("Element term with empty name".to_string()));
        }
        require_payload(text, payload, 13)?;
        return Ok(TermKind::Element(ElementPayload {
            char_start: read_u32(payload, 0),
            char_end: read_u32(payload, 4),
            end: read_u32(payload, 8),
            depth: payload[12],
        }));
    }
    if text.starts_with(REL_SOURCE_PREFIX) || text.starts_with(REL_TARGET_PREFIX) {
        require_payload(text, payload, 13)?;
        let decoded = RelationPayload {
            flags: payload[0],
            end: read_u32(payload, 1),
            counterpart_start: read_u32(payload, 5),
            counterpart_end: read_u32(payload, 9),
        };
        return Ok(if text.starts_with(REL_SOURCE_PREFIX) {
            TermKind::RelationSource(decoded)
        } else {
            TermKind::RelationTarget(decoded)
        });
    }
    if let Some(name) = text.strip_prefix(ATTRIBUTE_PREFIX) {
        if name.is_empty() {
            return Err(Error::corpus_data("Attribute term with empty name".to_string()));
        }
        let depth = if payload.is_empty() { 0 } else { payload[0] };
        return Ok(TermKind::Attribute { depth });
    }
    if let Some(digits) = text.strip_prefix(POSITION_PREFIX) {
        // Only `_` followed by a bare number is an offset term; anything
        // else starting with an underscore is an ordinary token term.
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            let token: u32 = digits.parse().map_err(|_| {
                Error::corpus_data(format!("Token index out of range in term '{text}'"))
            })?;
            require_payload(text, payload, 8)?;
            return Ok(TermKind::Position {
                token,
                char_start: read_u32(payload, 0),
                char_end: read_u32(payload, 4),
            });
        }
    }
    if !payload.is_empty() {
        return Err(Error::corpus_data(format!(
            "Unexpected payload on plain term '{text}'"
        )));
    }
    Ok(TermKind::Plain)
}

fn require_payload(text: &str, payload: &[u8], needed: usize) -> Result<()> {
    if payload.len() < needed {
        return Err(Error::corpus_data(format!(
            "Term '{text}' payload too short: need {needed} bytes, have {}",
            payload.len()
        )));
    }
    Ok(())
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
