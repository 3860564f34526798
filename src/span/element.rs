//! Leaf cursor over structural element spans.
//!
//! Documents are walked through the `<>:name` marker postings; the span
//! occurrences themselves come from the document's annotation block, which
//! stores them in emission order: start ascending, end ascending, deeper
//! registrations first on full ties. Nested occurrences sharing a start
//! are all reported, one match each, so containment and distance operators
//! can reason about every nesting level.

use std::collections::VecDeque;

use crate::error::Result;
use crate::index::reader::{CorpusReader, DocStore, PostingsDriver};
use crate::index::term::ELEMENT_PREFIX;
use crate::span::{unpositioned, SpanCursor};
use crate::types::{DocId, MatchPayload, SpanMatch};

pub struct ElementCursor {
    driver: PostingsDriver,
    store: DocStore,
    name: String,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
    started: bool,
}

impl ElementCursor {
    pub fn new(reader: &CorpusReader, name: &str) -> Result<Self> {
        Ok(Self {
            driver: reader.open_postings(&format!("{ELEMENT_PREFIX}{name}"))?,
            store: reader.doc_store()?,
            name: name.to_string(),
            pending: VecDeque::new(),
            current: None,
            started: false,
        })
    }

    /// Load the current driver document's occurrences into the queue.
    fn load_doc(&mut self) -> Result<()> {
        let Some(doc) = self.driver.doc() else {
            self.pending.clear();
            return Ok(());
        };
        let name = self.name.clone();
        let occs = self
            .store
            .with_sidecar(doc, |view| Ok(view.elements_named(&name)))?;
        self.pending = occs
            .into_iter()
            .map(|occ| {
                SpanMatch::with_payload(
                    doc,
                    occ.start,
                    occ.end,
                    MatchPayload::Element {
                        char_start: occ.char_start,
                        char_end: occ.char_end,
                        depth: occ.depth,
                    },
                )
            })
            .collect();
        Ok(())
    }

    /// Emit the next queued occurrence, walking the driver forward past
    /// documents whose occurrences were all clipped at indexing time.
    fn fill(&mut self) -> Result<bool> {
        loop {
            if let Some(m) = self.pending.pop_front() {
                self.current = Some(m);
                return Ok(true);
            }
            if self.driver.advance().is_none() {
                self.current = None;
                return Ok(false);
            }
            self.load_doc()?;
        }
    }
}

impl SpanCursor for ElementCursor {
    fn advance(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
            if self.driver.doc().is_none() {
                return Ok(false);
            }
            self.load_doc()?;
        }
        self.fill()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        self.started = true;
        if self.driver.seek(target).is_none() {
            self.pending.clear();
            self.current = None;
            return Ok(false);
        }
        self.load_doc()?;
        self.fill()
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}
