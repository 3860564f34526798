//! Context expansion.
//!
//! Grows each operand match by `min..=max` tokens to the left or right,
//! emitting one match per window length. Growth is clipped at the document
//! edges (a too-long window is truncated, not dropped) and halts at the
//! first occurrence of an optional stop token, which no emitted window may
//! cover. The grown region can be tagged with a class so downstream
//! operators can refer to it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::reader::{CorpusReader, DocStore, PostingsDriver};
use crate::span::window::into_run;
use crate::span::{unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{ClassAnnotation, DocId, SpanMatch};

/// Side of the match the expansion grows into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpandDirection {
    Left,
    Right,
}

/// Emits every allowed growth of the operand's matches.
pub struct ExpansionCursor {
    sub: Operand,
    direction: ExpandDirection,
    min: u32,
    max: u32,
    stop: Option<PostingsDriver>,
    class_id: Option<u8>,
    store: DocStore,
    /// Stop-token positions in the document being drained.
    stops: Vec<u32>,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
}

impl ExpansionCursor {
    pub fn new(
        reader: &CorpusReader,
        sub: BoxCursor,
        direction: ExpandDirection,
        min: u32,
        max: u32,
        stop_token: Option<&str>,
        class_id: Option<u8>,
    ) -> Result<Self> {
        if min > max {
            return Err(Error::invalid_query(format!(
                "maximum expansion {max} must not be lower than the minimum {min}"
            )));
        }
        let stop = match stop_token {
            Some(token) => Some(reader.open_postings(token)?),
            None => None,
        };
        Ok(Self {
            sub: Operand::new(sub),
            direction,
            min,
            max,
            stop,
            class_id,
            store: reader.doc_store()?,
            stops: Vec::new(),
            pending: VecDeque::new(),
            current: None,
        })
    }

    fn load_stops(&mut self, doc: DocId) {
        self.stops.clear();
        if let Some(driver) = &mut self.stop {
            if driver.seek(doc) == Some(doc) {
                driver.positions(&mut self.stops);
            }
        }
    }

    /// Tokens of growth before the nearest stop blocks the window, from the
    /// given match boundary outward.
    fn stop_limit(&self, m: &SpanMatch) -> u32 {
        match self.direction {
            ExpandDirection::Left => {
                let at = self.stops.partition_point(|&p| p < m.start);
                if at == 0 {
                    u32::MAX
                } else {
                    m.start - 1 - self.stops[at - 1]
                }
            }
            ExpandDirection::Right => {
                let at = self.stops.partition_point(|&p| p < m.end);
                if at == self.stops.len() {
                    u32::MAX
                } else {
                    self.stops[at] - m.end
                }
            }
        }
    }

    fn expand_into(&self, m: &SpanMatch, token_count: u32, buf: &mut Vec<SpanMatch>) {
        let limit = self.stop_limit(m);
        let room = match self.direction {
            ExpandDirection::Left => m.start,
            ExpandDirection::Right => token_count.saturating_sub(m.end),
        };
        for width in self.min..=self.max {
            if width > limit {
                break;
            }
            let actual = width.min(room);
            // Truncation repeats the widest window; emit it once.
            if actual < width && width > self.min {
                break;
            }
            if actual == 0 {
                buf.push(m.clone());
            } else {
                let (start, end, grown_start, grown_end) = match self.direction {
                    ExpandDirection::Left => (m.start - actual, m.end, m.start - actual, m.start),
                    ExpandDirection::Right => (m.start, m.end + actual, m.end, m.end + actual),
                };
                let mut grown = SpanMatch::new(m.doc, start, end);
                grown.classes = m.classes.clone();
                if let Some(id) = self.class_id {
                    grown.classes.push(ClassAnnotation::new(id, grown_start, grown_end));
                }
                buf.push(grown);
            }
            if actual < width {
                break;
            }
        }
    }

    fn fill(&mut self) -> Result<bool> {
        loop {
            self.sub.start()?;
            if !self.sub.live() {
                self.current = None;
                return Ok(false);
            }
            let doc = self.sub.doc()?;
            let matches = self.sub.take_doc()?;
            let token_count = self.store.with_sidecar(doc, |view| Ok(view.token_count()))?;
            self.load_stops(doc);
            let mut buf = Vec::new();
            for m in &matches {
                self.expand_into(m, token_count, &mut buf);
            }
            if !buf.is_empty() {
                self.pending = into_run(buf);
                self.current = self.pending.pop_front();
                return Ok(true);
            }
        }
    }
}

impl SpanCursor for ExpansionCursor {
    fn advance(&mut self) -> Result<bool> {
        if let Some(m) = self.pending.pop_front() {
            self.current = Some(m);
            return Ok(true);
        }
        self.fill()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        self.pending.clear();
        if !self.sub.skip_to(target)? {
            self.current = None;
            return Ok(false);
        }
        self.fill()
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}
