//! Containment and overlap joins.
//!
//! The sweep keeps a bounded window of outer candidates still in range of
//! the inner cursor's position: outers are pulled in as inner starts pass
//! them and evicted from the front once they end at or before the current
//! inner start, at which point no later inner occurrence can satisfy any
//! mode against them.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::span::window::{into_run, CandidateList};
use crate::span::{align_all, unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{DocId, SpanMatch};

/// How the inner span must sit relative to the outer span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithinMode {
    /// Inner contained in outer.
    Within,
    /// Inner contained and sharing the start position.
    StartsWith,
    /// Inner contained and sharing the end position.
    EndsWith,
    /// Identical spans.
    Matches,
    /// Any overlap between the two spans.
    Overlap,
}

impl WithinMode {
    fn pair_ok(self, outer: &SpanMatch, inner: &SpanMatch) -> bool {
        match self {
            WithinMode::Within => outer.start <= inner.start && inner.end <= outer.end,
            WithinMode::StartsWith => outer.start == inner.start && inner.end <= outer.end,
            WithinMode::EndsWith => outer.start <= inner.start && inner.end == outer.end,
            WithinMode::Matches => outer.start == inner.start && outer.end == inner.end,
            WithinMode::Overlap => outer.start < inner.end && inner.start < outer.end,
        }
    }

    /// Whether an outer starting where it does can still pair with the
    /// given inner. Used as the candidate pull bound.
    fn pull_ok(self, outer: &SpanMatch, inner: &SpanMatch) -> bool {
        match self {
            WithinMode::Overlap => outer.start < inner.end,
            _ => outer.start <= inner.start,
        }
    }
}

/// Reports the outer span for every (outer, inner) pair satisfying the
/// mode. Classes of both operands are carried; the outer's payload is
/// kept so element bases stay attribute-filterable.
pub struct WithinCursor {
    outer: Operand,
    inner: Operand,
    mode: WithinMode,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
}

impl WithinCursor {
    pub fn new(outer: BoxCursor, inner: BoxCursor, mode: WithinMode) -> Self {
        Self {
            outer: Operand::new(outer),
            inner: Operand::new(inner),
            mode,
            pending: VecDeque::new(),
            current: None,
        }
    }

    fn fill(&mut self) -> Result<bool> {
        loop {
            let Some(doc) = align_all(&mut [&mut self.outer, &mut self.inner])? else {
                self.current = None;
                return Ok(false);
            };
            let outers = self.outer.take_doc()?;
            let inners = self.inner.take_doc()?;

            let mut buf = Vec::new();
            let mut cands = CandidateList::new();
            let mut next_outer = 0;
            for inner in &inners {
                cands.evict_front(|o| o.end <= inner.start);
                while next_outer < outers.len() && self.mode.pull_ok(&outers[next_outer], inner) {
                    cands.push(outers[next_outer].clone());
                    next_outer += 1;
                }
                for outer in cands.iter() {
                    if self.mode.pair_ok(outer, inner) {
                        let mut m =
                            SpanMatch::with_payload(doc, outer.start, outer.end, outer.payload);
                        m.classes.extend_from_slice(&outer.classes);
                        m.classes.extend_from_slice(&inner.classes);
                        buf.push(m);
                    }
                }
            }
            if !buf.is_empty() {
                self.pending = into_run(buf);
                self.current = self.pending.pop_front();
                return Ok(true);
            }
        }
    }
}

impl SpanCursor for WithinCursor {
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
        self.outer.skip_to(target)?;
        self.inner.skip_to(target)?;
        self.fill()
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}
