//! Leaf cursor over one indexed term.

use crate::error::Result;
use crate::index::reader::{CorpusReader, PostingsDriver};
use crate::span::{unpositioned, SpanCursor};
use crate::types::{DocId, SpanMatch};

/// Emits one width-1 match per posting position of a term.
pub struct TermCursor {
    driver: PostingsDriver,
    positions: Vec<u32>,
    next_ix: usize,
    current: Option<SpanMatch>,
}

impl TermCursor {
    pub fn new(reader: &CorpusReader, term: &str) -> Result<Self> {
        Ok(Self {
            driver: reader.open_postings(term)?,
            positions: Vec::new(),
            next_ix: 0,
            current: None,
        })
    }

    fn load_doc(&mut self) {
        self.driver.positions(&mut self.positions);
        self.next_ix = 0;
    }

    /// Emit the next buffered position of the current document, or walk the
    /// driver forward until a document yields one.
    fn fill(&mut self) -> bool {
        loop {
            if let Some(doc) = self.driver.doc() {
                if self.next_ix < self.positions.len() {
                    let pos = self.positions[self.next_ix];
                    self.next_ix += 1;
                    self.current = Some(SpanMatch::new(doc, pos, pos + 1));
                    return true;
                }
            }
            if self.driver.advance().is_none() {
                self.current = None;
                return false;
            }
            self.load_doc();
        }
    }
}

impl SpanCursor for TermCursor {
    fn advance(&mut self) -> Result<bool> {
        if self.current.is_none() {
            // First call; the driver already sits on its first document.
            if self.driver.doc().is_none() {
                return Ok(false);
            }
            self.load_doc();
        }
        Ok(self.fill())
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        if self.driver.seek(target).is_none() {
            self.current = None;
            return Ok(false);
        }
        self.load_doc();
        Ok(self.fill())
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}
