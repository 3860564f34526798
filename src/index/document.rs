//! Input representation of an annotated document.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A document prepared for indexing: one bundle of annotation terms per
/// token position, in the term syntax described in [`crate::index::term`].
///
/// A typical position carries the surface form, normalized layers, the
/// offset carrier, and any markup opening there:
///
/// ```text
/// ["s:Fine", "i:fine", "_0$<i>0<i>4", "<>:s$<i>0<i>25<i>5<b>0"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    /// External identifier, stored and returned with matches.
    pub key: String,
    /// Raw document text, stored for display.
    #[serde(default)]
    pub text: String,
    /// Annotation term bundles, one per token position.
    #[serde(default)]
    pub tokens: Vec<Vec<String>>,
}

impl AnnotatedDocument {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: String::new(),
            tokens: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append one token position with its annotation terms.
    pub fn push_position<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens
            .push(terms.into_iter().map(Into::into).collect());
    }

    /// Build a document whose positions each carry a single term.
    pub fn from_words(key: impl Into<String>, words: &[&str]) -> Self {
        Self {
            key: key.into(),
            text: words.join(" "),
            tokens: words.iter().map(|w| vec![w.to_string()]).collect(),
        }
    }

    pub fn token_count(&self) -> u32 {
        self.tokens.len() as u32
    }

    /// Parse documents from JSON: a single object, an array, or JSONL.
    pub fn parse_json(input: &str) -> Result<Vec<Self>> {
        if let Ok(doc) = serde_json::from_str::<Self>(input) {
            return Ok(vec![doc]);
        }
        if let Ok(docs) = serde_json::from_str::<Vec<Self>>(input) {
            return Ok(docs);
        }
        let mut docs = Vec::new();
        for line in input.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let doc = serde_json::from_str(line)
                .map_err(|e| Error::corpus_data(format!("Invalid document JSON: {e}")))?;
            docs.push(doc);
        }
        Ok(docs)
    }
}
